//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, loads, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from a live entry
    pub hits: u64,
    /// Lookups that found no live entry
    pub misses: u64,
    /// Fetches issued to the backing store
    pub loads: u64,
    /// Misses that joined a fetch already in flight
    pub coalesced: u64,
    /// Fetches that failed
    pub load_failures: u64,
    /// Entries evicted due to LRU policy
    pub evictions: u64,
    /// Expired entries discovered on access
    pub expirations: u64,
    /// Occupied slots, expired-but-undiscovered entries included
    pub total_entries: usize,
    /// Fetches currently in flight
    pub in_flight: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Load ==
    /// Increments the counter of fetches issued to the backing store.
    pub fn record_load(&mut self) {
        self.loads += 1;
    }

    // == Record Coalesced ==
    /// Increments the counter of misses that joined an in-flight fetch.
    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    // == Record Load Failure ==
    /// Increments the failed fetch counter.
    pub fn record_load_failure(&mut self) {
        self.load_failures += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Expiration ==
    /// Increments the counter of expired entries found on access.
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }
}
