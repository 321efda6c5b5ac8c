//! Cache Store Module
//!
//! Bounded entry table combining HashMap storage with LRU ordering and
//! lazily checked absolute expiry. The store is synchronous and owns no
//! lock; [`ReadThroughCache`](crate::cache::ReadThroughCache) serializes
//! access to it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruList};

// == Lookup ==
/// Outcome of a [`CacheStore::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A live entry; the inner value is None for a cached absent key
    Hit(Option<String>),
    /// No live entry for the key
    Miss,
}

// == Cache Store ==
/// Entry table with LRU eviction and TTL support.
///
/// Expired entries are never swept. They keep their slot until the key is
/// requested again or LRU pressure from other keys evicts them.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Recency order of the keys in `entries`
    lru: LruList,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Lifetime of every entry
    ttl: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity and entry TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            lru: LruList::new(),
            stats: CacheStats::new(),
            capacity,
            ttl,
        }
    }

    // == Get ==
    /// Looks up a key at `now`.
    ///
    /// A live entry is marked most recently used and counted as a hit. An
    /// expired entry is dropped at this point and reported as a miss.
    pub fn get(&mut self, key: &str, now: Instant) -> Lookup {
        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return Lookup::Miss;
        };

        if entry.is_expired(now) {
            debug!(key, "cache entry expired");
            self.remove(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            return Lookup::Miss;
        }

        debug!(key, ttl_remaining = ?entry.ttl_remaining(now), "cache hit");
        let (value, node) = (entry.value.clone(), entry.node);
        self.lru.touch(node);
        self.stats.record_hit();
        Lookup::Hit(value)
    }

    // == Insert ==
    /// Stores a freshly loaded value as the most recently used entry.
    ///
    /// Replaces any existing entry for the key. When the table is full the
    /// least recently used entry is evicted first. Returns the evicted key.
    pub fn insert(&mut self, key: String, value: Option<String>, now: Instant) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }

        self.remove(&key);

        let mut evicted = None;
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.lru.pop_back() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.record_eviction();
            debug!(key = %oldest, "evicted least recently used entry");
            evicted = Some(oldest);
        }

        let node = self.lru.push_front(key.clone());
        self.entries
            .insert(key, CacheEntry::new(value, now, self.ttl, node));

        evicted
    }

    // == Clear ==
    /// Removes every entry. Statistics counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Peek ==
    /// Returns the entry for a key without touching recency or stats,
    /// expired or not.
    #[cfg(test)]
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    /// Occupied slots, including expired entries not yet discovered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.lru.remove(entry.node);
        }
    }
}
