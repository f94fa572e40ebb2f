//! Typed load-or-compute cache over any [`CacheStore`].
//!
//! [`ResponseCache`] is what adapters and the stats recorder hold. It is a
//! cheap `Clone` handle around an `Arc<dyn CacheStore>`, so one store can
//! back every namespace in the process.
//!
//! # Failure semantics
//!
//! - A store error on load, or a cached payload that no longer decodes as
//!   the requested type, is logged at `warn` and treated as a miss.
//! - A store error on save is logged; the freshly computed value is still
//!   returned to the caller.
//! - A failed compute is returned as-is and never written to the store, so
//!   the next call retries upstream.
//!
//! Hits and misses are counted per key namespace
//! ([`CACHE_HITS_TOTAL`](crate::telemetry::CACHE_HITS_TOTAL),
//! [`CACHE_MISSES_TOTAL`](crate::telemetry::CACHE_MISSES_TOTAL)).

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{CacheConfig, CacheKey, CacheStore, MemoryCacheStore, Ttl};
use crate::error::Result;
use crate::telemetry;

/// Typed cache handle. See module docs for failure semantics.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Convenience: a fresh in-memory store with default capacity.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new(&CacheConfig::default())))
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Look up a cached value. `None` on miss, expiry, or store failure.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let namespace = key.namespace().to_string();
        let raw = match self.store.load(key.as_str()).await {
            Ok(raw) => raw,
            Err(e) => {
                self.store_error("load", key, &e);
                None
            }
        };

        let value = raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                None
            }
        });

        if value.is_some() {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "namespace" => namespace).increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "namespace" => namespace)
                .increment(1);
        }
        value
    }

    /// Store a value for `ttl`. Failures are logged, never returned.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Ttl) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "value not serializable, not cached");
                return;
            }
        };
        if let Err(e) = self.store.save(key.as_str(), raw, ttl.duration()).await {
            self.store_error("save", key, &e);
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.store.remove(key.as_str()).await {
            self.store_error("remove", key, &e);
        }
    }

    /// Drop every entry in the backing store.
    pub async fn clear(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!(store = self.store.name(), error = %e, "cache clear failed");
            metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "store" => self.store.name().to_string())
                .increment(1);
        }
    }

    /// Return the cached value for `key`, or run `compute`, cache its
    /// success for `ttl`, and return it.
    ///
    /// Errors from `compute` propagate untouched and are not cached.
    pub async fn load_or_compute<T, F, Fut>(&self, key: &CacheKey, ttl: Ttl, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get(key).await {
            tracing::debug!(key = %key, "cache hit");
            return Ok(hit);
        }
        let value = compute().await?;
        self.put(key, &value, ttl).await;
        Ok(value)
    }

    fn store_error(&self, op: &str, key: &CacheKey, err: &crate::HuginnError) {
        tracing::warn!(
            store = self.store.name(),
            op,
            key = %key,
            error = %err,
            "cache store unavailable, degrading to miss"
        );
        metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "store" => self.store.name().to_string())
            .increment(1);
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("store", &self.store.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::HuginnError;

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }
        async fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(HuginnError::Storage("disk on fire".into()))
        }
        async fn save(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
            Err(HuginnError::Storage("disk on fire".into()))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(HuginnError::Storage("disk on fire".into()))
        }
        async fn clear(&self) -> Result<()> {
            Err(HuginnError::Storage("disk on fire".into()))
        }
    }

    fn key() -> CacheKey {
        CacheKey::builder("test", "op").param("q", "x").build()
    }

    #[tokio::test]
    async fn computes_once_within_ttl() {
        let cache = ResponseCache::in_memory();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v: Vec<u32> = cache
                .load_or_compute(&key(), Ttl::Hourly, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(v, vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_compute_is_not_cached() {
        let cache = ResponseCache::in_memory();

        let err = cache
            .load_or_compute::<String, _, _>(&key(), Ttl::Hourly, || async {
                Err(HuginnError::Http {
                    status: 503,
                    message: "down".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HuginnError::Http { status: 503, .. }));
        assert_eq!(cache.get::<String>(&key()).await, None);

        let v: String = cache
            .load_or_compute(&key(), Ttl::Hourly, || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(v, "fresh");
    }

    #[tokio::test]
    async fn broken_store_degrades_to_always_compute() {
        let cache = ResponseCache::new(Arc::new(BrokenStore));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let v: u32 = cache
                .load_or_compute(&key(), Ttl::Live, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(v, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.invalidate(&key()).await;
        cache.clear().await;
    }

    #[tokio::test]
    async fn type_mismatch_reads_as_miss() {
        let cache = ResponseCache::in_memory();
        cache.put(&key(), &"not a number", Ttl::Live).await;
        assert_eq!(cache.get::<u32>(&key()).await, None);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let cache = ResponseCache::in_memory();
        cache.put(&key(), &1u32, Ttl::Live).await;
        assert_eq!(cache.get::<u32>(&key()).await, Some(1));
        cache.invalidate(&key()).await;
        assert_eq!(cache.get::<u32>(&key()).await, None);
    }
}
