//! Cache Statistics Module
//!
//! Tracks how `process`, `get` and population calls were classified.

// == Cache Stats ==
/// Counters kept by the facade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups served from the store
    pub hits: u64,
    /// Number of lookups that found nothing stored
    pub misses: u64,
    /// Number of force-expire recomputations
    pub expires: u64,
    /// Number of populations not persisted (lock contended or store failure)
    pub skipped_writes: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expire(&mut self) {
        self.expires += 1;
    }

    pub fn record_skipped_write(&mut self) {
        self.skipped_writes += 1;
    }
}
