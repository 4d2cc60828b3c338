//! Read-through cache.
//!
//! Cache-aside reads over the [`CacheBackend`] seam: a hit returns the
//! cached value without touching the store, a miss invokes the loader and
//! populates the cache before returning. Empty results are never cached, so
//! "not found" cannot be pinned for a whole TTL window.
//!
//! The cache is an optimization, never a dependency: any backend error or
//! timeout turns the call into a plain loader invocation, and a failed
//! populate still returns the loaded value. There is no single-flight
//! deduplication: concurrent callers on a cold key may each invoke the
//! loader, which is idempotent and side-effect-free by contract.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::repos::RepoError;

use super::backend::{CacheBackend, CacheError};
use super::config::CacheConfig;

pub struct ReadThroughCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl ReadThroughCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    /// Serve a single-entity read through the cache.
    ///
    /// `None` from the loader is passed through uncached.
    pub async fn get_with<T, L, Fut>(
        &self,
        namespace: &'static str,
        key: String,
        ttl: Duration,
        loader: L,
    ) -> Result<Option<T>, RepoError>
    where
        T: Serialize + DeserializeOwned,
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, RepoError>>,
    {
        if let Some(value) = self.lookup::<T>(namespace, &key).await {
            return Ok(Some(value));
        }

        let loaded = loader().await?;
        if let Some(value) = loaded.as_ref() {
            self.populate(namespace, &key, value, ttl).await;
        }
        Ok(loaded)
    }

    /// Serve a collection read through the cache.
    ///
    /// An empty list is a valid result but is never cached.
    pub async fn get_list_with<T, L, Fut>(
        &self,
        namespace: &'static str,
        key: String,
        ttl: Duration,
        loader: L,
    ) -> Result<Vec<T>, RepoError>
    where
        T: Serialize + DeserializeOwned,
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, RepoError>>,
    {
        if let Some(values) = self.lookup::<Vec<T>>(namespace, &key).await {
            return Ok(values);
        }

        let loaded = loader().await?;
        if !loaded.is_empty() {
            self.populate(namespace, &key, &loaded, ttl).await;
        }
        Ok(loaded)
    }

    /// Evict every key under `namespace`.
    ///
    /// Mutating operations call this synchronously before completing. A
    /// backend failure here is logged and absorbed: while the backend is
    /// unreachable reads bypass it anyway, and TTLs bound any entry that
    /// survives an outage.
    pub async fn invalidate(&self, namespace: &'static str) {
        if !self.config.enabled {
            return;
        }

        let result = tokio::time::timeout(
            self.config.backend_timeout(),
            self.backend.delete_namespace(namespace),
        )
        .await
        .unwrap_or(Err(CacheError::Timeout));

        match result {
            Ok(()) => {
                counter!("studyhall_cache_evict_total").increment(1);
                debug!(namespace, "cache namespace evicted");
            }
            Err(err) => warn!(namespace, error = %err, "cache evict failed"),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        if !self.config.enabled {
            return None;
        }

        let raw = match tokio::time::timeout(
            self.config.backend_timeout(),
            self.backend.get(namespace, key),
        )
        .await
        .unwrap_or(Err(CacheError::Timeout))
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!(namespace, key, error = %err, "cache get failed, degrading to store");
                None
            }
        };

        let Some(raw) = raw else {
            counter!("studyhall_cache_miss_total", "namespace" => namespace.to_string())
                .increment(1);
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!("studyhall_cache_hit_total", "namespace" => namespace.to_string())
                    .increment(1);
                Some(value)
            }
            Err(err) => {
                // A corrupt payload counts as a miss and will be overwritten
                // by the populate that follows.
                let err = CacheError::serialization(err.to_string());
                warn!(namespace, key, error = %err, "discarding undecodable cache entry");
                counter!("studyhall_cache_miss_total", "namespace" => namespace.to_string())
                    .increment(1);
                None
            }
        }
    }

    async fn populate<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl: Duration,
    ) {
        if !self.config.enabled {
            return;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                let err = CacheError::serialization(err.to_string());
                warn!(namespace, key, error = %err, "cache payload not serializable");
                return;
            }
        };

        let result = tokio::time::timeout(
            self.config.backend_timeout(),
            self.backend.set(namespace, key, raw, ttl),
        )
        .await
        .unwrap_or(Err(CacheError::Timeout));

        if let Err(err) = result {
            warn!(namespace, key, error = %err, "cache populate failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::memory::MemoryBackend;

    fn cache() -> ReadThroughCache {
        ReadThroughCache::new(Arc::new(MemoryBackend::new()), CacheConfig::default())
    }

    #[tokio::test]
    async fn hit_suppresses_second_load() {
        let cache = cache();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_with("kp", "detail:1".into(), Duration::from_secs(60), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Some("hello".to_string()))
                })
                .await
                .expect("get");
            assert_eq!(value.as_deref(), Some("hello"));
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_result_is_not_cached() {
        let cache = cache();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Option<String> = cache
                .get_with("kp", "detail:404".into(), Duration::from_secs(60), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .expect("get");
            assert!(value.is_none());
        }

        // Every call re-invoked the loader: "not found" is never pinned.
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_list_is_not_cached() {
        let cache = cache();
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            let values: Vec<String> = cache
                .get_list_with("kp", "category:9".into(), Duration::from_secs(60), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Vec::new())
                })
                .await
                .expect("get");
            assert!(values.is_empty());
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache = cache();
        let loads = AtomicUsize::new(0);

        let load = || async {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(Some("v".to_string()))
        };

        cache
            .get_with("kp", "detail:1".into(), Duration::from_secs(60), load)
            .await
            .expect("get");
        cache.invalidate("kp").await;
        cache
            .get_with("kp", "detail:1".into(), Duration::from_secs(60), load)
            .await
            .expect("get");

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let cache = ReadThroughCache::new(Arc::new(MemoryBackend::new()), config);
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_with("kp", "detail:1".into(), Duration::from_secs(60), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(1_i64))
                })
                .await
                .expect("get");
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_backend_times_out_and_degrades_to_the_loader() {
        struct SlowBackend;

        #[async_trait::async_trait]
        impl CacheBackend for SlowBackend {
            async fn get(&self, _: &str, _: &str) -> Result<Option<String>, CacheError> {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(None)
            }
            async fn set(
                &self,
                _: &str,
                _: &str,
                _: String,
                _: Duration,
            ) -> Result<(), CacheError> {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(())
            }
            async fn delete_namespace(&self, _: &str) -> Result<(), CacheError> {
                Ok(())
            }
            async fn increment_score(&self, _: &str, _: &str, _: f64) -> Result<f64, CacheError> {
                Ok(0.0)
            }
            async fn range_by_score_desc(
                &self,
                _: &str,
                _: usize,
                _: usize,
            ) -> Result<Vec<String>, CacheError> {
                Ok(Vec::new())
            }
            async fn remove_member(&self, _: &str, _: &str) -> Result<(), CacheError> {
                Ok(())
            }
        }

        let config = CacheConfig {
            backend_timeout_ms: 5,
            ..Default::default()
        };
        let cache = ReadThroughCache::new(Arc::new(SlowBackend), config);
        let loads = AtomicUsize::new(0);

        // Both the get and the populate exceed the timeout; every call falls
        // through to the loader and still succeeds.
        for _ in 0..2 {
            let value = cache
                .get_with("kp", "detail:1".into(), Duration::from_secs(60), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(7_i64))
                })
                .await
                .expect("get");
            assert_eq!(value, Some(7));
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn undecodable_entry_is_treated_as_miss() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set("kp", "detail:1", "{not json".into(), Duration::from_secs(60))
            .await
            .expect("set");
        let cache = ReadThroughCache::new(backend, CacheConfig::default());

        let value: Option<i64> = cache
            .get_with("kp", "detail:1".into(), Duration::from_secs(60), || async {
                Ok(Some(5))
            })
            .await
            .expect("get");

        assert_eq!(value, Some(5));
    }
}
