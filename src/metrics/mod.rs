pub mod counters;
pub mod exporter;
pub mod snapshot;
pub mod traits;

pub use counters::CacheCounters;
pub use exporter::PrometheusTextExporter;
pub use snapshot::CacheStats;
pub use traits::{MetricsExporter, MetricsSnapshotProvider};
