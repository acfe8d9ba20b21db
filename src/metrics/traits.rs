//! Metrics consumption traits.
//!
//! Recording lives inside the cache (plain counters mutated under the cache
//! lock). These traits cover the read side: taking a snapshot, and exporting
//! one to a monitoring system.
//!
//! ```text
//!   CacheCore ──counters──► MetricsSnapshotProvider<CacheStats> ──► MetricsExporter<CacheStats>
//!                               (tests / dumps)                      (Prometheus text, ...)
//! ```

/// Produces a point-in-time snapshot.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Publishes a snapshot somewhere.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
