//! Backing Store Module
//!
//! The key-value store the proxy reads through to on a cache miss.
//!
//! # Implementations
//! - [`RedisBackend`]: production client over a managed Redis connection
//! - [`InMemoryBackend`]: map-backed store for tests and local runs

mod memory;
mod redis_store;

use async_trait::async_trait;

use crate::error::BackendError;

pub use self::memory::InMemoryBackend;
pub use self::redis_store::RedisBackend;

// == Backing Store ==
/// Read-only view of the backing key-value store.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetches the current value for `key`.
    ///
    /// `Ok(None)` means the store has no value for the key; that is a normal
    /// answer, not an error.
    async fn fetch(&self, key: &str) -> Result<Option<String>, BackendError>;
}
