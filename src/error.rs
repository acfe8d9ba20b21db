//! Error types for the gencache library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Outcome of a rejected cache operation (absent signature,
//!   pinned item, exhausted slots, malformed signature, ...).
//! - [`InsertError`]: A rejected insert; hands the context and payload back to
//!   the caller so nothing is lost.
//! - [`InvariantError`]: Returned when internal bookkeeping is inconsistent
//!   (see [`CacheCore::check_invariants`](crate::cache::CacheCore::check_invariants)).
//! - [`ConfigError`]: Returned when configuration parameters are invalid.
//!
//! ## Example Usage
//!
//! ```
//! use gencache::builder::CacheBuilder;
//! use gencache::error::ConfigError;
//!
//! let bad: Result<_, ConfigError> = CacheBuilder::new(0).build::<u32, ()>();
//! assert!(bad.unwrap_err().to_string().contains("signature size"));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Why a cache operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// No item with the given signature is resident.
    NotFound,
    /// The item is pinned (lock count > 0).
    Locked,
    /// The signature is already resident and overwrite was not requested.
    AlreadyPresent,
    /// Release on an item whose lock count is already zero.
    NotPinned,
    /// Every slot is allocated, `max_items` is reached and nothing is evictable.
    SlotsExhausted,
    /// The signature does not have the configured width.
    SignatureWidth { expected: usize, actual: usize },
    /// Internal bookkeeping disagreed with itself.
    Inconsistent(InvariantError),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound => f.write_str("signature not found"),
            CacheError::Locked => f.write_str("item is pinned"),
            CacheError::AlreadyPresent => f.write_str("signature already present"),
            CacheError::NotPinned => f.write_str("release without a matching acquire"),
            CacheError::SlotsExhausted => {
                f.write_str("no free slot: max items reached and every item is pinned")
            },
            CacheError::SignatureWidth { expected, actual } => {
                write!(f, "signature is {actual} bytes, expected {expected}")
            },
            CacheError::Inconsistent(err) => write!(f, "internal inconsistency: {err}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Inconsistent(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvariantError> for CacheError {
    fn from(err: InvariantError) -> Self {
        CacheError::Inconsistent(err)
    }
}

// ---------------------------------------------------------------------------
// InsertError
// ---------------------------------------------------------------------------

/// A rejected insert.
///
/// The cache never drops a payload it did not accept: the release context and
/// payload come back inside the error.
pub struct InsertError<C, V> {
    kind: CacheError,
    context: C,
    payload: V,
}

impl<C, V> InsertError<C, V> {
    pub(crate) fn new(kind: CacheError, context: C, payload: V) -> Self {
        Self {
            kind,
            context,
            payload,
        }
    }

    /// Why the insert was rejected.
    #[inline]
    pub fn kind(&self) -> &CacheError {
        &self.kind
    }

    /// Recovers the payload, dropping the context.
    #[inline]
    pub fn into_payload(self) -> V {
        self.payload
    }

    /// Recovers the release context and payload.
    #[inline]
    pub fn into_parts(self) -> (CacheError, C, V) {
        (self.kind, self.context, self.payload)
    }
}

impl<C, V> fmt::Debug for InsertError<C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<C, V> fmt::Display for InsertError<C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "insert rejected: {}", self.kind)
    }
}

impl<C, V> std::error::Error for InsertError<C, V> {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by [`check_invariants`](crate::cache::CacheCore::check_invariants)
/// and by consistency checks on the eviction path. Carries a human-readable
/// description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`CacheBuilder::build`](crate::builder::CacheBuilder::build)
/// and by `set_max_items` when asked to shrink below the allocated slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- CacheError -------------------------------------------------------

    #[test]
    fn cache_error_display() {
        assert_eq!(CacheError::NotFound.to_string(), "signature not found");
        assert_eq!(
            CacheError::SignatureWidth {
                expected: 4,
                actual: 3
            }
            .to_string(),
            "signature is 3 bytes, expected 4"
        );
    }

    #[test]
    fn inconsistent_exposes_source() {
        use std::error::Error;

        let err = CacheError::from(InvariantError::new("index size 3 != slots used 2"));
        assert!(err.to_string().contains("index size 3"));
        assert!(err.source().is_some());
        assert!(CacheError::Locked.source().is_none());
    }

    // -- InsertError ------------------------------------------------------

    #[test]
    fn insert_error_returns_ownership() {
        let err = InsertError::new(CacheError::AlreadyPresent, "ctx", vec![1u8, 2, 3]);
        assert_eq!(err.kind(), &CacheError::AlreadyPresent);
        let (kind, ctx, payload) = err.into_parts();
        assert_eq!(kind, CacheError::AlreadyPresent);
        assert_eq!(ctx, "ctx");
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[test]
    fn insert_error_debug_omits_payload() {
        struct Opaque;
        let err = InsertError::new(CacheError::Locked, (), Opaque);
        let dbg = format!("{:?}", err);
        assert!(dbg.contains("Locked"));
        assert_eq!(err.to_string(), "insert rejected: item is pinned");
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("slot 3 missing from index");
        assert_eq!(err.to_string(), "slot 3 missing from index");
        assert_eq!(err.message(), "slot 3 missing from index");
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("max items must be > 0");
        assert_eq!(err.to_string(), "max items must be > 0");
        assert_eq!(err.message(), "max items must be > 0");
    }

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<CacheError>();
        assert_error::<InsertError<(), String>>();
        assert_error::<InvariantError>();
        assert_error::<ConfigError>();
    }
}
