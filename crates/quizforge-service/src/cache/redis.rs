use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use super::entry::CacheEntry;
use super::tier::{CacheError, CacheTier};
use crate::config::CacheBackendKind;

/// Redis-backed cache tier.
///
/// Entries are stored as named MessagePack under `SET key value EX ttl`, so
/// expiry is enforced by the server. There is no local L1 in front of it:
/// every read goes to Redis and observes invalidations from other processes.
#[derive(Clone)]
pub struct RedisTier {
    pool: Pool,
}

impl RedisTier {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl CacheTier for RedisTier {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        let mut conn = self.pool.get().await?;
        let Some(bytes) = conn.get::<_, Option<Vec<u8>>>(key).await? else {
            return Ok(None);
        };
        match CacheEntry::decode(&bytes) {
            Ok(entry) => Ok(Some(Arc::new(entry))),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "dropping undecodable cache entry");
                if let Err(e) = conn.del::<_, ()>(key).await {
                    tracing::warn!(key = %key, error = %e, "Redis DEL error");
                }
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        let bytes = entry.encode()?;
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key, bytes, ttl.as_secs().max(1))
            .await?;
        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set (redis)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.pool.get().await?;
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("{}*", escape_pattern(prefix));
        let keys: Vec<String> = conn.keys(&pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = conn.del(&keys).await?;
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.pool.get().await?;
        let mut keys: Vec<String> = conn.keys(pattern).await?;
        keys.sort();
        Ok(keys)
    }

    fn backend(&self) -> CacheBackendKind {
        CacheBackendKind::Redis
    }

    async fn close(&self) {
        self.pool.close();
        tracing::info!("Redis cache pool closed");
    }
}

/// Escapes glob metacharacters so `value` matches itself literally.
pub fn escape_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
