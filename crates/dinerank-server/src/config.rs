use dinerank_cache::{FreshnessPolicy, RedisConfig};
use dinerank_core::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Startup data
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(CoreError::configuration("server.port must be > 0"));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(CoreError::configuration("server.body_limit_bytes must be > 0"));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(CoreError::configuration(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        if self.ranking.default_k == 0 {
            return Err(CoreError::configuration("ranking.default_k must be > 0"));
        }
        if self.cache.entity_ttl_secs == 0
            || self.cache.listing_ttl_secs == 0
            || self.cache.search_ttl_secs == 0
        {
            return Err(CoreError::configuration("cache freshness windows must be > 0"));
        }
        if self.cache.compute_timeout_ms == 0 {
            return Err(CoreError::configuration("cache.compute_timeout_ms must be > 0"));
        }
        if self.cache.store_timeout_ms == 0 {
            return Err(CoreError::configuration("cache.store_timeout_ms must be > 0"));
        }
        if self.cache.key_prefix.trim().is_empty() {
            return Err(CoreError::configuration("cache.key_prefix must not be empty"));
        }
        // Redis SCAN MATCH treats these as glob syntax, the local store does not.
        if self.cache.key_prefix.contains(['*', '?', '[', ']', '\\']) {
            return Err(CoreError::configuration(
                "cache.key_prefix must not contain glob characters (* ? [ ] \\)",
            ));
        }
        if self.redis.enabled {
            if self.redis.url.trim().is_empty() {
                return Err(CoreError::configuration("redis.enabled=true requires redis.url"));
            }
            if self.redis.pool_size == 0 {
                return Err(CoreError::configuration("redis.pool_size must be > 0"));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// K used by top-K when the request does not give one.
    #[serde(default = "default_k")]
    pub default_k: usize,
    /// Whether top-K skips inactive restaurants by default.
    #[serde(default)]
    pub active_only: bool,
}

fn default_k() -> usize {
    5
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            active_only: false,
        }
    }
}

/// Cache tier settings. Each query class has its own freshness window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_entity_ttl")]
    pub entity_ttl_secs: u64,
    #[serde(default = "default_listing_ttl")]
    pub listing_ttl_secs: u64,
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,
    /// Upper bound on one engine call made on a cache miss.
    #[serde(default = "default_compute_timeout_ms")]
    pub compute_timeout_ms: u64,
    /// Upper bound on one cache store call; slower calls count as failures.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Invalidate listing and search entries after every write. When off,
    /// entries only leave the cache by expiring.
    #[serde(default = "default_invalidate_on_write")]
    pub invalidate_on_write: bool,
}

fn default_entity_ttl() -> u64 {
    3600
}

fn default_listing_ttl() -> u64 {
    default_entity_ttl() / 2
}

fn default_search_ttl() -> u64 {
    default_entity_ttl() / 4
}

fn default_compute_timeout_ms() -> u64 {
    2000
}

fn default_store_timeout_ms() -> u64 {
    250
}

fn default_key_prefix() -> String {
    "dinerank".to_string()
}

fn default_invalidate_on_write() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entity_ttl_secs: default_entity_ttl(),
            listing_ttl_secs: default_listing_ttl(),
            search_ttl_secs: default_search_ttl(),
            compute_timeout_ms: default_compute_timeout_ms(),
            store_timeout_ms: default_store_timeout_ms(),
            key_prefix: default_key_prefix(),
            invalidate_on_write: default_invalidate_on_write(),
        }
    }
}

impl CacheConfig {
    pub fn freshness(&self) -> FreshnessPolicy {
        FreshnessPolicy::from_secs(
            self.entity_ttl_secs,
            self.listing_ttl_secs,
            self.search_ttl_secs,
        )
    }

    pub fn compute_timeout(&self) -> Duration {
        Duration::from_millis(self.compute_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    /// Load the sample restaurants at startup.
    #[serde(default)]
    pub seed_sample_data: bool,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use dinerank_core::{CoreError, Result};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("dinerank.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., DINERANK__CACHE__LISTING_TTL_SECS=60
        builder = builder.add_source(
            Environment::with_prefix("DINERANK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| CoreError::configuration(format!("config build error: {e}")))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| CoreError::configuration(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}
