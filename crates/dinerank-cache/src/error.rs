use thiserror::Error;

/// Failures of the cache store. Absorbed by [`crate::CacheTier`] on reads;
/// surfaced by `invalidate` so callers can log them.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("cache serialization failed: {0}")]
    Serialization(String),

    #[error("invalid cache key pattern '{0}'")]
    InvalidPattern(String),
}

impl CacheError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::DependencyUnavailable(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::DependencyUnavailable(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::DependencyUnavailable(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for CacheError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for CacheError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
