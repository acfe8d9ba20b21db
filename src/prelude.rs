pub use crate::builder::{CacheBuilder, CacheConfig};
pub use crate::cache::{CacheCore, InsertOptions};
pub use crate::concurrent::SignatureCache;
pub use crate::error::{CacheError, ConfigError, InsertError, InvariantError};
pub use crate::metrics::{CacheStats, MetricsExporter, MetricsSnapshotProvider};
pub use crate::release::{DropReleaser, Releaser};
pub use crate::store::{GenerationCost, StorageCost};
