//! Cache Module
//!
//! Read-through caching with TTL expiration, LRU eviction, and coalesced
//! loads.

mod clock;
mod entry;
mod loader;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use loader::ReadThroughCache;
pub use lru::{LruList, NodeId};
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup};
