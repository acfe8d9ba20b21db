//! gencache: a signature-keyed eviction cache.
//!
//! Items are keyed by fixed-width byte signatures, carry caller-assigned
//! storage and generation costs, and can be pinned against eviction. When the
//! item or storage budget is exceeded, a batch of the least recently touched
//! unpinned items is evicted and handed back through a [`Releaser`].
//!
//! ```
//! use gencache::{CacheBuilder, InsertOptions};
//!
//! let cache = CacheBuilder::new(4)
//!     .max_items(4)
//!     .max_storage(100)
//!     .build::<&str, ()>()
//!     .unwrap();
//!
//! for sig in [b"AAAA", b"BBBB", b"CCCC", b"DDDD"] {
//!     cache.insert(sig, (), "data", InsertOptions::new(25)).unwrap();
//! }
//! cache.insert(b"EEEE", (), "data", InsertOptions::new(25)).unwrap();
//!
//! assert!(!cache.check_exists(b"AAAA", false));
//! assert!(cache.check_exists(b"EEEE", false));
//! assert_eq!(cache.total_storage(), 100);
//! ```

pub mod builder;
pub mod cache;
pub mod concurrent;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod release;
pub mod store;

pub use builder::{CacheBuilder, CacheConfig};
pub use cache::{CacheCore, InsertOptions};
pub use concurrent::SignatureCache;
pub use error::{CacheError, ConfigError, InsertError, InvariantError};
pub use metrics::CacheStats;
pub use release::{DropReleaser, Releaser};
