use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::entry::CacheEntry;
use crate::config::CacheBackendKind;

/// Failure of a cache backend call.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command.
    #[error("cache backend unavailable: {message}")]
    Unavailable { message: String },

    /// A stored value could not be encoded or decoded.
    #[error("cache codec error: {message}")]
    Codec { message: String },
}

impl CacheError {
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::unavailable(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::unavailable(err.to_string())
    }
}

/// Uniform key-value contract over the local and networked cache tiers.
///
/// Keys are rendered [`super::CacheKey`]s. Patterns passed to
/// [`CacheTier::keys`] use Redis glob syntax (`*`, `?`, `[...]`, `\` escapes).
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Returns the live entry under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError>;

    /// Stores `entry` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`; returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every key starting with `prefix`; returns how many were removed.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Lists keys matching a glob `pattern`.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    fn backend(&self) -> CacheBackendKind;

    /// Releases backend connections. The local tier has none to release.
    async fn close(&self) {}
}
