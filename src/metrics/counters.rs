//! Event counters recorded by the cache.
//!
//! The cache holds these under its own lock, so they are plain integers.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheCounters {
    /// Touching lookups (acquire, touching existence checks).
    pub reads: u64,
    /// Touching lookups that found the signature.
    pub successful_reads: u64,
    /// Insert calls, accepted or not.
    pub inserts: u64,
    /// Eviction policy runs.
    pub eviction_passes: u64,
    /// Slots freed by eviction, remove, remove-all or overwrite.
    pub evicted_items: u64,
}

impl CacheCounters {
    #[inline]
    pub fn record_read(&mut self, found: bool) {
        self.reads += 1;
        if found {
            self.successful_reads += 1;
        }
    }

    #[inline]
    pub fn record_insert(&mut self) {
        self.inserts += 1;
    }

    #[inline]
    pub fn record_eviction_pass(&mut self) {
        self.eviction_passes += 1;
    }

    #[inline]
    pub fn record_evicted_item(&mut self) {
        self.evicted_items += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
