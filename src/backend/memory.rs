//! In-Memory Backing Store
//!
//! HashMap-backed store that records how often each key was fetched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::BackingStore;
use crate::error::BackendError;

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, String>,
    fetches: HashMap<String, u64>,
}

// == In-Memory Backend ==
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state
            .lock()
            .await
            .values
            .insert(key.into(), value.into());
    }

    pub async fn remove(&self, key: &str) {
        self.state.lock().await.values.remove(key);
    }

    /// While unavailable, every fetch fails with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of fetches issued for `key`, failed ones included.
    pub async fn fetch_count(&self, key: &str) -> u64 {
        self.state
            .lock()
            .await
            .fetches
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub async fn total_fetches(&self) -> u64 {
        self.state.lock().await.fetches.values().sum()
    }
}

#[async_trait]
impl BackingStore for InMemoryBackend {
    async fn fetch(&self, key: &str) -> Result<Option<String>, BackendError> {
        *self
            .state
            .lock()
            .await
            .fetches
            .entry(key.to_string())
            .or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Connection(
                "in-memory backend marked unavailable".to_string(),
            ));
        }

        Ok(self.state.lock().await.values.get(key).cloned())
    }
}
