//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with absolute expiry.

use std::time::{Duration, Instant};

use crate::cache::lru::NodeId;

// == Cache Entry ==
/// One cached lookup result.
///
/// `value` is `None` when the backing store had no value for the key; that
/// answer is cached like any other. Entries are never mutated in place, a
/// reload replaces them wholesale.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The loaded value, or None for a key absent from the backing store
    pub value: Option<String>,
    /// When the load completed
    pub inserted_at: Instant,
    /// `inserted_at + ttl`
    pub expires_at: Instant,
    /// Position in the recency list
    pub(crate) node: NodeId,
}

impl CacheEntry {
    // == Constructor ==
    pub(crate) fn new(
        value: Option<String>,
        inserted_at: Instant,
        ttl: Duration,
        node: NodeId,
    ) -> Self {
        Self {
            value,
            inserted_at,
            expires_at: inserted_at.checked_add(ttl).unwrap_or_else(|| far_future(inserted_at)),
            node,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is live strictly before `expires_at` and expired from that
    /// instant on.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the time left before expiry, zero once expired.
    pub fn ttl_remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

// TTLs too large for Instant arithmetic are treated as a century.
fn far_future(from: Instant) -> Instant {
    from + Duration::from_secs(100 * 365 * 24 * 60 * 60)
}
