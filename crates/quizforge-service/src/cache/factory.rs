use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::{Pool, PoolConfig, Runtime};

use super::local::LocalTier;
use super::redis::RedisTier;
use super::tier::{CacheError, CacheTier};
use crate::analytics::{AnalyticsRecorder, LocalAnalytics, RedisAnalytics};
use crate::config::{CacheBackendKind, CacheConfig, RedisConfig};

/// A cache tier and the analytics recorder that lives next to it.
#[derive(Clone)]
pub struct CacheComponents {
    pub tier: Arc<dyn CacheTier>,
    pub analytics: Arc<dyn AnalyticsRecorder>,
}

impl CacheComponents {
    pub fn local(key_stats_ttl: Duration) -> Self {
        Self {
            tier: Arc::new(LocalTier::new()),
            analytics: Arc::new(LocalAnalytics::new(key_stats_ttl)),
        }
    }
}

/// Builds a Redis pool sized and bounded by `config`.
pub fn create_redis_pool(config: &RedisConfig) -> Result<Pool, CacheError> {
    let timeout = Some(Duration::from_millis(config.timeout_ms));
    let mut pool_config = PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(pool_config);
    redis_config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| CacheError::unavailable(e.to_string()))
}

/// Selects the cache tier once at startup.
///
/// With `backend = "redis"` the pool is created and probed with one
/// connection; if either step fails the local tier is used instead.
pub async fn create_cache(cache: &CacheConfig, redis: &RedisConfig) -> CacheComponents {
    if cache.backend == CacheBackendKind::Local {
        tracing::info!("using local cache tier");
        return CacheComponents::local(cache.key_stats_ttl());
    }

    tracing::info!(url = %redis.url, "Connecting to Redis");

    let pool = match create_redis_pool(redis) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheComponents::local(cache.key_stats_ttl());
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            CacheComponents {
                tier: Arc::new(RedisTier::new(pool.clone())),
                analytics: Arc::new(RedisAnalytics::new(pool, cache.key_stats_ttl())),
            }
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            CacheComponents::local(cache.key_stats_ttl())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_backend_builds_local_tier() {
        let components = create_cache(&CacheConfig::default(), &RedisConfig::default()).await;
        assert_eq!(components.tier.backend(), CacheBackendKind::Local);
    }

    #[tokio::test]
    async fn unreachable_redis_falls_back_to_local() {
        let cache = CacheConfig {
            backend: CacheBackendKind::Redis,
            ..CacheConfig::default()
        };
        let redis = RedisConfig {
            url: "redis://127.0.0.1:1".into(),
            pool_size: 1,
            timeout_ms: 200,
        };
        let components = create_cache(&cache, &redis).await;
        assert_eq!(components.tier.backend(), CacheBackendKind::Local);
    }
}
