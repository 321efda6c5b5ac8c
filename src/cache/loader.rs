//! Read-Through Cache Module
//!
//! Concurrent front for [`CacheStore`] that loads misses from a
//! [`BackingStore`] and shares each in-flight load between every caller
//! asking for the same key.
//!
//! All table state (entries, recency, in-flight registry) sits behind one
//! mutex. The mutex is only held to look up, register, and complete loads;
//! the backing store is called without it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::BackingStore;
use crate::cache::{CacheStats, CacheStore, Clock, Lookup, SystemClock};
use crate::error::BackendError;

type LoadResult = Result<Option<String>, BackendError>;

/// Completion handle shared by every caller waiting on one fetch.
type InFlightLoad = Shared<BoxFuture<'static, LoadResult>>;

struct CacheState {
    store: CacheStore,
    in_flight: HashMap<String, InFlightLoad>,
}

struct Inner {
    state: Mutex<CacheState>,
    backend: Arc<dyn BackingStore>,
    clock: Arc<dyn Clock>,
}

// == Read-Through Cache ==
/// Bounded, expiring, read-through cache.
///
/// Cloning is cheap and every clone shares the same table.
#[derive(Clone)]
pub struct ReadThroughCache {
    inner: Arc<Inner>,
}

impl ReadThroughCache {
    // == Constructors ==
    /// Creates a cache that reads the system clock.
    pub fn new(capacity: usize, ttl: Duration, backend: Arc<dyn BackingStore>) -> Self {
        Self::with_clock(capacity, ttl, backend, Arc::new(SystemClock))
    }

    /// Creates a cache that takes time from `clock`.
    pub fn with_clock(
        capacity: usize,
        ttl: Duration,
        backend: Arc<dyn BackingStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState {
                    store: CacheStore::new(capacity, ttl),
                    in_flight: HashMap::new(),
                }),
                backend,
                clock,
            }),
        }
    }

    // == Get ==
    /// Returns the value for `key`, loading it from the backing store on a
    /// miss.
    ///
    /// `Ok(None)` means the backing store has no value for the key. That
    /// answer is cached like a value. A failed load is returned to every
    /// caller that waited on it and leaves nothing cached, so the next call
    /// fetches again.
    pub async fn get(&self, key: &str) -> LoadResult {
        let load = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;

            if let Lookup::Hit(value) = state.store.get(key, self.inner.clock.now()) {
                return Ok(value);
            }

            match state.in_flight.get(key) {
                Some(load) => {
                    debug!(key, "joining in-flight load");
                    state.store.stats_mut().record_coalesced();
                    load.clone()
                }
                None => {
                    debug!(key, "cache miss, loading from backing store");
                    let load = self.spawn_load(key);
                    state.in_flight.insert(key.to_string(), load.clone());
                    state.store.stats_mut().record_load();
                    load
                }
            }
        };

        load.await
    }

    // == Invalidate All ==
    /// Drops every cached entry.
    ///
    /// Loads already in flight are left alone: they finish and cache their
    /// result as usual.
    pub async fn invalidate_all(&self) {
        let mut state = self.inner.state.lock().await;
        let cleared = state.store.len();
        state.store.clear();
        info!(cleared, "cache cleared");
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock().await;
        let mut stats = state.store.stats();
        stats.in_flight = state.in_flight.len();
        stats
    }

    /// Occupied slots, including expired entries not yet discovered.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cached keys from most to least recently used.
    pub async fn keys_by_recency(&self) -> Vec<String> {
        self.inner.state.lock().await.store.keys_by_recency()
    }

    /// Starts the fetch on its own task so it runs to completion even if
    /// every waiting caller goes away.
    fn spawn_load(&self, key: &str) -> InFlightLoad {
        let inner = Arc::clone(&self.inner);
        let key = key.to_string();

        let task = {
            let inner = Arc::clone(&inner);
            let key = key.clone();
            tokio::spawn(async move {
                let result = inner.backend.fetch(&key).await;
                inner.complete(key, &result).await;
                result
            })
        };

        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    warn!(key = %key, error = %err, "load task did not finish");
                    inner.abandon(&key).await;
                    Err(BackendError::LoadAborted(err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    /// Stores a finished load and retires its in-flight marker in one step.
    async fn complete(&self, key: String, result: &LoadResult) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state.in_flight.remove(&key);
        match result {
            Ok(value) => {
                let now = self.clock.now();
                state.store.insert(key, value.clone(), now);
            }
            Err(err) => {
                state.store.stats_mut().record_load_failure();
                warn!(key = %key, error = %err, "load failed, nothing cached");
            }
        }
    }

    /// Retires the marker of a load whose task died before completing.
    async fn abandon(&self, key: &str) {
        let mut state = self.state.lock().await;
        if state.in_flight.remove(key).is_some() {
            state.store.stats_mut().record_load_failure();
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::cache::ManualClock;
    use tokio_test::{assert_err, assert_ok};

    const CAPACITY: usize = 3;
    const EXPIRY: Duration = Duration::from_secs(4);

    struct Fixture {
        cache: ReadThroughCache,
        backend: Arc<InMemoryBackend>,
        clock: Arc<ManualClock>,
    }

    fn fixture_with(capacity: usize, backend: InMemoryBackend) -> Fixture {
        let backend = Arc::new(backend);
        let clock = Arc::new(ManualClock::new());
        let cache = ReadThroughCache::with_clock(capacity, EXPIRY, backend.clone(), clock.clone());
        Fixture {
            cache,
            backend,
            clock,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(CAPACITY, InMemoryBackend::new())
    }

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[tokio::test]
    async fn test_get_loads_missing_key_as_absent() {
        let f = fixture();

        assert_eq!(assert_ok!(f.cache.get("missingKey").await), None);
        assert_eq!(assert_ok!(f.cache.get("missingKey").await), None);

        // The absent answer is cached
        assert_eq!(f.backend.fetch_count("missingKey").await, 1);
    }

    #[tokio::test]
    async fn test_get_returns_backing_values() {
        let f = fixture();
        f.backend.set("a", "1").await;
        f.backend.set("b", "2").await;

        assert_eq!(f.cache.get("a").await, Ok(some("1")));
        assert_eq!(f.cache.get("b").await, Ok(some("2")));
        assert_eq!(f.cache.get("c").await, Ok(None));
    }

    #[tokio::test]
    async fn test_get_fetches_once_before_expiry() {
        let f = fixture();
        f.backend.set("key", "value").await;

        f.cache.get("key").await.unwrap();
        f.clock.advance(EXPIRY - Duration::from_secs(1));
        f.backend.set("key", "newValue").await;

        assert_eq!(f.cache.get("key").await, Ok(some("value")));
        assert_eq!(f.backend.fetch_count("key").await, 1);
    }

    #[tokio::test]
    async fn test_get_fetches_again_after_expiry() {
        let f = fixture();
        f.backend.set("key", "value").await;

        f.cache.get("key").await.unwrap();
        f.clock.advance(EXPIRY + Duration::from_secs(1));
        f.backend.set("key", "newValue").await;

        assert_eq!(f.cache.get("key").await, Ok(some("newValue")));
        assert_eq!(f.backend.fetch_count("key").await, 2);
        assert_eq!(f.cache.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn test_hits_do_not_extend_expiry() {
        let f = fixture();
        f.backend.set("key", "value").await;

        f.cache.get("key").await.unwrap();
        f.clock.advance(Duration::from_secs(3));
        f.cache.get("key").await.unwrap();
        f.clock.advance(Duration::from_secs(2));
        f.cache.get("key").await.unwrap();

        assert_eq!(f.backend.fetch_count("key").await, 2);
    }

    #[tokio::test]
    async fn test_get_evicts_least_recently_used() {
        let f = fixture();
        for (key, value) in [("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")] {
            f.backend.set(key, value).await;
        }

        f.cache.get("a").await.unwrap(); // fetch, cache = a
        f.cache.get("b").await.unwrap(); // fetch, cache = b,a
        f.cache.get("c").await.unwrap(); // fetch, cache = c,b,a
        f.cache.get("d").await.unwrap(); // fetch, a evicted, cache = d,c,b
        f.cache.get("b").await.unwrap(); // cache = b,d,c
        f.cache.get("c").await.unwrap(); // cache = c,b,d
        f.cache.get("d").await.unwrap(); // cache = d,c,b
        f.cache.get("a").await.unwrap(); // fetch, b evicted, cache = a,d,c

        assert_eq!(f.backend.fetch_count("a").await, 2);
        assert_eq!(f.backend.fetch_count("b").await, 1);
        assert_eq!(f.backend.fetch_count("c").await, 1);
        assert_eq!(f.backend.fetch_count("d").await, 1);
        assert_eq!(f.cache.keys_by_recency().await, vec!["a", "d", "c"]);
        assert_eq!(f.cache.stats().await.evictions, 2);
    }

    #[tokio::test]
    async fn test_touching_protects_from_eviction() {
        let f = fixture_with(2, InMemoryBackend::new());

        f.cache.get("k1").await.unwrap();
        f.cache.get("k2").await.unwrap();
        f.cache.get("k3").await.unwrap(); // evicts k1
        f.cache.get("k2").await.unwrap(); // k2 most recent
        f.cache.get("k4").await.unwrap(); // evicts k3, not k2

        assert_eq!(f.cache.keys_by_recency().await, vec!["k4", "k2"]);
        assert_eq!(f.backend.fetch_count("k2").await, 1);
    }

    #[tokio::test]
    async fn test_capacity_scenario_with_changed_backing_values() {
        let f = fixture_with(2, InMemoryBackend::new());
        f.backend.set("a", "1").await;
        f.backend.set("b", "2").await;
        f.backend.set("c", "3").await;

        assert_eq!(f.cache.get("a").await, Ok(some("1")));
        assert_eq!(f.cache.get("b").await, Ok(some("2")));
        assert_eq!(f.cache.get("c").await, Ok(some("3"))); // evicts a

        f.backend.set("a", "10").await;
        f.backend.set("b", "20").await;
        f.backend.set("c", "30").await;

        assert_eq!(f.cache.get("c").await, Ok(some("3")));
        assert_eq!(f.cache.get("b").await, Ok(some("2")));
        assert_eq!(f.cache.get("a").await, Ok(some("10")));
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_load() {
        let f = fixture_with(
            CAPACITY,
            InMemoryBackend::new().with_latency(Duration::from_millis(50)),
        );
        f.backend.set("key", "value").await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = f.cache.clone();
                tokio::spawn(async move { cache.get("key").await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(some("value")));
        }

        assert_eq!(f.backend.fetch_count("key").await, 1);
        let stats = f.cache.stats().await;
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.coalesced + stats.hits, 15);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_loads_for_different_keys_are_not_coalesced() {
        let f = fixture_with(
            CAPACITY,
            InMemoryBackend::new().with_latency(Duration::from_millis(20)),
        );

        let (a, b) = tokio::join!(f.cache.get("a"), f.cache.get("b"));
        assert_eq!(a, Ok(None));
        assert_eq!(b, Ok(None));
        assert_eq!(f.cache.stats().await.loads, 2);
        assert_eq!(f.cache.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_load_does_not_block_hits_on_other_keys() {
        let f = fixture_with(
            CAPACITY,
            InMemoryBackend::new().with_latency(Duration::from_millis(300)),
        );
        f.backend.set("a", "1").await;
        f.backend.set("b", "2").await;
        f.cache.get("b").await.unwrap();

        let slow = {
            let cache = f.cache.clone();
            tokio::spawn(async move { cache.get("a").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.cache.stats().await.in_flight, 1);

        let hit = tokio::time::timeout(Duration::from_millis(50), f.cache.get("b")).await;
        assert_eq!(assert_ok!(hit), Ok(some("2")));
        assert!(!slow.is_finished());

        assert_eq!(slow.await.unwrap(), Ok(some("1")));
    }

    #[derive(Default)]
    struct PanicsOnFirstFetch {
        panicked: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl BackingStore for PanicsOnFirstFetch {
        async fn fetch(&self, _key: &str) -> LoadResult {
            if !self.panicked.swap(true, std::sync::atomic::Ordering::SeqCst) {
                panic!("boom");
            }
            Ok(Some("ok".to_string()))
        }
    }

    #[tokio::test]
    async fn test_dead_load_task_clears_marker_and_is_retried() {
        let cache = ReadThroughCache::new(
            CAPACITY,
            EXPIRY,
            Arc::new(PanicsOnFirstFetch::default()),
        );

        let first = cache.get("key").await;
        assert!(matches!(first, Err(BackendError::LoadAborted(_))));

        let stats = cache.stats().await;
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.load_failures, 1);
        assert!(cache.is_empty().await);

        assert_eq!(cache.get("key").await, Ok(some("ok")));
        assert_eq!(cache.stats().await.loads, 2);
    }

    #[tokio::test]
    async fn test_failed_load_reaches_every_waiter_and_is_not_cached() {
        let f = fixture_with(
            CAPACITY,
            InMemoryBackend::new().with_latency(Duration::from_millis(50)),
        );
        f.backend.set("key", "value").await;
        f.backend.set_unavailable(true);

        let (first, second) = tokio::join!(f.cache.get("key"), f.cache.get("key"));
        assert!(matches!(first, Err(BackendError::Connection(_))));
        assert_eq!(first, second);
        assert_eq!(f.backend.fetch_count("key").await, 1);
        assert!(f.cache.is_empty().await);

        f.backend.set_unavailable(false);
        assert_eq!(f.cache.get("key").await, Ok(some("value")));
        assert_eq!(f.backend.fetch_count("key").await, 2);

        let stats = f.cache.stats().await;
        assert_eq!(stats.load_failures, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried_on_next_call() {
        let f = fixture();
        f.backend.set_unavailable(true);

        assert_err!(f.cache.get("key").await);
        assert_err!(f.cache.get("key").await);
        assert_eq!(f.backend.fetch_count("key").await, 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_fresh_fetches() {
        let f = fixture();
        f.backend.set("a", "1").await;
        f.backend.set("b", "2").await;

        f.cache.get("a").await.unwrap();
        f.cache.get("b").await.unwrap();
        f.cache.get("missing").await.unwrap();

        f.cache.invalidate_all().await;
        assert!(f.cache.is_empty().await);
        f.backend.set("a", "10").await;

        assert_eq!(f.cache.get("a").await, Ok(some("10")));
        assert_eq!(f.cache.get("b").await, Ok(some("2")));
        assert_eq!(f.cache.get("missing").await, Ok(None));
        assert_eq!(f.backend.total_fetches().await, 6);
    }

    #[tokio::test]
    async fn test_invalidate_all_is_idempotent() {
        let f = fixture();
        f.cache.invalidate_all().await;
        f.cache.invalidate_all().await;
        assert!(f.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_in_flight_during_clear_is_cached() {
        let f = fixture_with(
            CAPACITY,
            InMemoryBackend::new().with_latency(Duration::from_millis(100)),
        );
        f.backend.set("key", "value").await;

        let pending = {
            let cache = f.cache.clone();
            tokio::spawn(async move { cache.get("key").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        f.cache.invalidate_all().await;

        assert_eq!(pending.await.unwrap(), Ok(some("value")));
        assert_eq!(f.cache.get("key").await, Ok(some("value")));
        assert_eq!(f.backend.fetch_count("key").await, 1);
    }

    #[tokio::test]
    async fn test_load_completes_when_caller_goes_away() {
        let f = fixture_with(
            CAPACITY,
            InMemoryBackend::new().with_latency(Duration::from_millis(50)),
        );
        f.backend.set("key", "value").await;

        let caller = {
            let cache = f.cache.clone();
            tokio::spawn(async move { cache.get("key").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        caller.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(f.cache.stats().await.in_flight, 0);
        assert_eq!(f.cache.get("key").await, Ok(some("value")));
        assert_eq!(f.backend.fetch_count("key").await, 1);
    }
}
