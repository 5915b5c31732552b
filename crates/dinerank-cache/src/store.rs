//! Byte-level cache stores.
//!
//! ## Store Modes
//!
//! - **Local**: `DashMap` per instance, expiry checked lazily on read and
//!   swept by [`LocalStore::purge_expired`]
//! - **Redis**: shared across instances, expiry enforced by Redis (`SET EX`)
//!
//! [`create_cache_store`] picks Redis when it is enabled and reachable at
//! startup and falls back to the local store otherwise.

use crate::error::CacheError;
use crate::key::glob_to_regex;
use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Storage behind the cache tier. Values are opaque bytes with a TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name reported in stats and logs.
    fn mode(&self) -> &'static str;

    /// Unexpired value under `key`.
    async fn get(&self, key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key matching a `*`-wildcard glob. Returns how many were
    /// removed.
    async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CacheError>;

    /// Whether the store can currently serve requests (for readiness checks).
    async fn is_available(&self) -> bool {
        true
    }

    /// Drop expired entries. A no-op for stores with native expiry.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// A cached value with TTL support.
///
/// The data is wrapped in `Arc` so a hit hands out the bytes without
/// copying them.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Single-instance store on a `DashMap`.
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: DashMap<String, CachedEntry>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for LocalStore {
    fn mode(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(Some(Arc::clone(&entry.data)));
            }
            drop(entry);
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let matcher = glob_to_regex(pattern)?;
        let mut removed = 0;
        self.entries.retain(|key, _| {
            if matcher.is_match(key) {
                removed += 1;
                false
            } else {
                true
            }
        });
        tracing::debug!(pattern = %pattern, removed, "cache invalidated (local)");
        Ok(removed)
    }

    fn purge_expired(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

/// Multi-instance store on a deadpool-redis pool.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn mode(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
        let mut conn = self.pool.get().await?;
        let data: Option<Vec<u8>> = conn.get(key).await?;
        Ok(data.map(Arc::new))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        // EX takes whole seconds; sub-second windows round up
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value.as_slice(), ttl_secs)
            .await?;
        tracing::debug!(key = %key, ttl_secs, "cache set (redis)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let mut conn = self.pool.get().await?;
        let keys: Vec<String> = {
            let mut iter: redis::AsyncIter<'_, String> = conn.scan_match(pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: usize = conn.del(&keys).await?;
        tracing::debug!(pattern = %pattern, removed, "cache invalidated (redis)");
        Ok(removed)
    }

    async fn is_available(&self) -> bool {
        self.pool.get().await.is_ok()
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (degrades to the local store without it).
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Pool wait/create/recycle timeout in milliseconds.
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Create the cache store for this instance.
///
/// Never fails: a disabled, misconfigured or unreachable Redis yields a
/// [`LocalStore`].
pub async fn create_cache_store(config: &RedisConfig) -> Arc<dyn CacheStore> {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache store");
        return Arc::new(LocalStore::new());
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Some(Duration::from_millis(config.timeout_ms));
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache store."
            );
            return Arc::new(LocalStore::new());
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            Arc::new(RedisStore::new(pool))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Redis unreachable. Falling back to local cache store."
            );
            Arc::new(LocalStore::new())
        }
    }
}
