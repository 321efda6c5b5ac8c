//! Redis Proxy - A read-through HTTP cache in front of Redis
//!
//! Serves values from a bounded local cache with TTL expiration and LRU
//! eviction, loading misses from Redis with one fetch per key at a time.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::ReadThroughCache;
pub use config::Config;
