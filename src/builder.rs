//! Cache configuration and construction.
//!
//! Everything fixed for the lifetime of a cache (signature width, error
//! policy) is set here; the budgets can be adjusted later through the cache.
//!
//! ## Example
//!
//! ```rust
//! use gencache::builder::CacheBuilder;
//! use gencache::InsertOptions;
//!
//! let cache = CacheBuilder::new(4)
//!     .max_items(1024)
//!     .max_storage(1 << 20)
//!     .build::<String, ()>()
//!     .unwrap();
//!
//! cache
//!     .insert(b"sig0", (), "payload".to_string(), InsertOptions::new(7))
//!     .unwrap();
//! assert_eq!(cache.acquire(b"sig0").as_deref(), Some("payload"));
//! cache.release(b"sig0").unwrap();
//! ```

use crate::cache::CacheCore;
use crate::concurrent::SignatureCache;
use crate::ds::{Stamp, DEFAULT_WRAP_AT};
use crate::error::ConfigError;
use crate::release::{DropReleaser, Releaser};

/// Validated cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub signature_size: usize,
    pub max_items: usize,
    pub max_storage: u64,
    /// Raise an error when an overwrite hits a pinned item.
    pub error_on_overwrite_locked: bool,
    /// Turn raised errors into panics.
    pub crash_on_internal_error: bool,
    /// Run the sanity check after every slot grow.
    pub verify_on_grow: bool,
    pub clock_wrap_at: Stamp,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signature_size == 0 {
            return Err(ConfigError::new("signature size must be > 0"));
        }
        if self.max_items == 0 {
            return Err(ConfigError::new("max items must be > 0"));
        }
        if self.clock_wrap_at == 0 {
            return Err(ConfigError::new("clock wrap must be > 0"));
        }
        Ok(())
    }
}

/// Builder for [`SignatureCache`] and [`CacheCore`].
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Starts a builder for signatures of `signature_size` bytes.
    ///
    /// Defaults: 1024 items, unlimited storage, errors on overwriting pinned
    /// items, soft error reporting, no grow verification.
    pub fn new(signature_size: usize) -> Self {
        Self {
            config: CacheConfig {
                signature_size,
                max_items: 1024,
                max_storage: u64::MAX,
                error_on_overwrite_locked: true,
                crash_on_internal_error: false,
                verify_on_grow: false,
                clock_wrap_at: DEFAULT_WRAP_AT,
            },
        }
    }

    pub fn max_items(mut self, max_items: usize) -> Self {
        self.config.max_items = max_items;
        self
    }

    pub fn max_storage(mut self, max_storage: u64) -> Self {
        self.config.max_storage = max_storage;
        self
    }

    pub fn error_on_overwrite_locked(mut self, enabled: bool) -> Self {
        self.config.error_on_overwrite_locked = enabled;
        self
    }

    pub fn crash_on_internal_error(mut self, enabled: bool) -> Self {
        self.config.crash_on_internal_error = enabled;
        self
    }

    pub fn verify_on_grow(mut self, enabled: bool) -> Self {
        self.config.verify_on_grow = enabled;
        self
    }

    /// Clock value at which recency stamps wrap to zero.
    pub fn clock_wrap_at(mut self, wrap_at: Stamp) -> Self {
        self.config.clock_wrap_at = wrap_at;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Builds a thread-safe cache whose evicted payloads are simply dropped.
    pub fn build<V, C>(self) -> Result<SignatureCache<V, C, DropReleaser>, ConfigError> {
        self.build_with_releaser(DropReleaser)
    }

    /// Builds a thread-safe cache that hands evicted payloads to `releaser`.
    pub fn build_with_releaser<V, C, R>(
        self,
        releaser: R,
    ) -> Result<SignatureCache<V, C, R>, ConfigError>
    where
        R: Releaser<C, V>,
    {
        Ok(SignatureCache::from_core(self.build_core(releaser)?))
    }

    /// Builds the unsynchronized core for single-threaded use.
    pub fn build_core<V, C, R>(self, releaser: R) -> Result<CacheCore<V, C, R>, ConfigError>
    where
        R: Releaser<C, V>,
    {
        self.config.validate()?;
        Ok(CacheCore::new(self.config, releaser))
    }
}
