use std::fmt;

/// Point-in-time view of the cache's aggregates and counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_storage: u64,
    pub total_generation_time: u64,
    pub slots_used: usize,
    pub slot_capacity: usize,
    pub clock: u32,
    pub clock_wraps: u64,

    pub reads: u64,
    pub successful_reads: u64,
    pub inserts: u64,
    pub eviction_passes: u64,
    pub evicted_items: u64,

    // limits captured at snapshot time
    pub max_items: usize,
    pub max_storage: u64,
}

impl CacheStats {
    /// Column header matching the [`Display`](fmt::Display) row.
    pub fn header() -> String {
        format!(
            "{:>10} {:>10} {:>6} {:>10} {:>10} {:>10} {:>10}",
            "GenTime", "Storage", "Items", "Date", "TotRead", "TotInsert", "TotEvict"
        )
    }

    /// Fraction of touching lookups that hit, or `0.0` before any read.
    pub fn hit_ratio(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.successful_reads as f64 / self.reads as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10} {:>10} {:>6} {:>10} {:>10} {:>10} {:>10}",
            self.total_generation_time,
            self.total_storage,
            self.slots_used,
            self.clock,
            self.reads,
            self.inserts,
            self.eviction_passes
        )
    }
}
