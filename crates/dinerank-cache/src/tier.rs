use crate::error::CacheError;
use crate::key::Fingerprint;
use crate::metrics;
use crate::store::CacheStore;
use dinerank_core::{CoreError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Cache-aside wrapper around a [`CacheStore`].
///
/// Values are stored as MessagePack maps so types that skip absent fields
/// still decode. Concurrent misses on one fingerprint may both compute; the
/// last write wins.
///
/// Every invalidation bumps an epoch. A miss whose compute overlapped an
/// invalidation does not keep its value in the store, so a fill that read
/// pre-write state cannot outlive the write's invalidation. The epoch is per
/// process; fills racing a write on another instance age out with their
/// window.
pub struct CacheTier {
    store: Arc<dyn CacheStore>,
    compute_timeout: Duration,
    store_timeout: Duration,
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    degraded: AtomicU64,
}

/// Counters since startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0 before the first lookup.
    pub hit_ratio: f64,
    /// Store calls that failed and were answered without the cache.
    pub degraded: u64,
    pub mode: &'static str,
}

impl CacheTier {
    pub fn new(store: Arc<dyn CacheStore>, compute_timeout: Duration) -> Self {
        Self {
            store,
            compute_timeout,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            epoch: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
        }
    }

    /// Bound on a single store call. A call that takes longer counts as a
    /// store failure.
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn compute_timeout(&self) -> Duration {
        self.compute_timeout
    }

    /// Return the cached value for `fingerprint`, or run `compute` and cache
    /// its result for `window`.
    ///
    /// Only errors from `compute` reach the caller, plus `ComputeTimeout`
    /// when it runs longer than the configured bound. Store failures are
    /// logged and the value is computed as on a miss.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        window: Duration,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = fingerprint.as_str();
        let class = fingerprint.class();
        let epoch = self.epoch.load(Ordering::Acquire);

        if let Some(value) = self.lookup::<T>(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_hit(class);
            debug!(key = %key, "cache hit");
            return Ok(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_miss(class);
        debug!(key = %key, "cache miss");

        let value = match tokio::time::timeout(self.compute_timeout, compute()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(key = %key, timeout_ms = self.timeout_ms(), "compute timed out");
                return Err(CoreError::compute_timeout(self.timeout_ms()));
            }
        };

        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(key = %key, "invalidated during compute, not caching");
            return Ok(value);
        }
        match rmp_serde::to_vec_named(&value) {
            Ok(bytes) => {
                if let Err(e) = self.bounded(self.store.set(key, bytes, window)).await {
                    self.degrade("set", key, &e);
                } else if self.epoch.load(Ordering::Acquire) != epoch {
                    // an invalidation ran while the set was in flight
                    if let Err(e) = self.bounded(self.store.delete(key)).await {
                        self.degrade("delete", key, &e);
                    }
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to serialize value for cache");
            }
        }
        Ok(value)
    }

    /// Remove every entry matching a `*`-wildcard glob.
    ///
    /// Unlike reads, a store failure is returned so the caller can report
    /// it. Entries that survive still expire with their class window.
    pub async fn invalidate(&self, pattern: &str) -> std::result::Result<usize, CacheError> {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        match self.bounded(self.store.invalidate_pattern(pattern)).await {
            Ok(removed) => {
                metrics::record_invalidation();
                debug!(pattern = %pattern, removed, "cache invalidated");
                Ok(removed)
            }
            Err(e) => {
                self.degrade("invalidate", pattern, &e);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_ratio: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            degraded: self.degraded.load(Ordering::Relaxed),
            mode: self.store.mode(),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.bounded(self.store.get(key)).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                self.degrade("get", key, &e);
                return None;
            }
        };
        match rmp_serde::from_slice::<T>(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to deserialize cached value");
                if let Err(e) = self.bounded(self.store.delete(key)).await {
                    self.degrade("delete", key, &e);
                }
                None
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, CacheError>>,
    ) -> std::result::Result<T, CacheError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::unavailable(format!(
                "store call exceeded {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }

    fn degrade(&self, operation: &'static str, key: &str, error: &CacheError) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
        metrics::record_degraded(operation);
        warn!(key = %key, operation, error = %error, "cache store call failed, continuing without cache");
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.compute_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::QueryClass;
    use crate::store::LocalStore;

    fn tier() -> CacheTier {
        CacheTier::new(Arc::new(LocalStore::new()), Duration::from_secs(1))
    }

    fn fp(op: &'static str) -> Fingerprint {
        Fingerprint::builder("test", QueryClass::Listing, op).build()
    }

    #[tokio::test]
    async fn stats_start_empty() {
        let stats = tier().stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hit_ratio, 0.0);
        assert_eq!(stats.mode, "local");
    }

    #[tokio::test]
    async fn compute_errors_are_not_cached() {
        let tier = tier();
        let key = fp("failing");
        let err = tier
            .get_or_compute::<u32, _, _>(&key, Duration::from_secs(60), || async {
                Err(CoreError::invalid_argument("bad k"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));

        let value = tier
            .get_or_compute(&key, Duration::from_secs(60), || async { Ok(7u32) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(tier.stats().misses, 2);
    }

    #[tokio::test]
    async fn undecodable_entry_is_treated_as_miss() {
        let tier = tier();
        let key = fp("corrupt");
        tier.store()
            .set(key.as_str(), vec![0xc1], Duration::from_secs(60))
            .await
            .unwrap();

        let value = tier
            .get_or_compute(&key, Duration::from_secs(60), || async {
                Ok(String::from("fresh"))
            })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
        assert_eq!(tier.stats().hits, 0);
    }
}
