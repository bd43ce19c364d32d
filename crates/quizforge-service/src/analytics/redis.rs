use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use quizforge_core::now_utc;
use redis::AsyncCommands;

use super::{AnalyticsRecorder, AnalyticsSnapshot, KeyStats};
use crate::cache::{CacheError, escape_pattern};

/// Hash holding the global `hits`, `misses` and `operations:{op}` fields.
pub const ANALYTICS_KEY: &str = "cache:analytics";

/// Prefix of the per-key stats hashes (`hits`, `misses`, `lastAccessed`).
pub const KEY_STATS_PREFIX: &str = "cache:keyStats:";

const OPERATION_FIELD_PREFIX: &str = "operations:";

/// Analytics stored in Redis hashes, shared by every process using the tier.
pub struct RedisAnalytics {
    pool: Pool,
    key_ttl: Duration,
}

impl RedisAnalytics {
    pub fn new(pool: Pool, key_ttl: Duration) -> Self {
        Self { pool, key_ttl }
    }

    async fn record_access(&self, key: &str, field: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let stats_key = format!("{KEY_STATS_PREFIX}{key}");
        let ttl_secs = i64::try_from(self.key_ttl.as_secs()).unwrap_or(i64::MAX);
        let _: () = redis::pipe()
            .atomic()
            .hincr(ANALYTICS_KEY, field, 1)
            .ignore()
            .hincr(&stats_key, field, 1)
            .ignore()
            .hset(&stats_key, "lastAccessed", now_utc().to_string())
            .ignore()
            .expire(&stats_key, ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn try_record_operation(&self, operation: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.hincr::<_, _, _, ()>(
            ANALYTICS_KEY,
            format!("{OPERATION_FIELD_PREFIX}{operation}"),
            1,
        )
        .await?;
        Ok(())
    }

    async fn try_snapshot(&self) -> Result<AnalyticsSnapshot, CacheError> {
        let mut conn = self.pool.get().await?;
        let global: HashMap<String, u64> = conn.hgetall(ANALYTICS_KEY).await?;

        let mut snapshot = AnalyticsSnapshot::default();
        for (field, value) in global {
            match field.as_str() {
                "hits" => snapshot.hits = value,
                "misses" => snapshot.misses = value,
                other => {
                    if let Some(op) = other.strip_prefix(OPERATION_FIELD_PREFIX) {
                        snapshot.operations.insert(op.to_string(), value);
                    }
                }
            }
        }

        let pattern = format!("{}*", escape_pattern(KEY_STATS_PREFIX));
        let stats_keys: Vec<String> = conn.keys(&pattern).await?;
        for stats_key in stats_keys {
            let fields: HashMap<String, String> = conn.hgetall(&stats_key).await?;
            let Some(key) = stats_key.strip_prefix(KEY_STATS_PREFIX) else {
                continue;
            };
            snapshot.per_key.insert(key.to_string(), parse_key_stats(&fields));
        }
        Ok(snapshot.with_hit_rate())
    }

    async fn try_reset(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("{}*", escape_pattern(KEY_STATS_PREFIX));
        let mut keys: Vec<String> = conn.keys(&pattern).await?;
        keys.push(ANALYTICS_KEY.to_string());
        conn.del::<_, ()>(&keys).await?;
        Ok(())
    }
}

fn parse_key_stats(fields: &HashMap<String, String>) -> KeyStats {
    let count = |name: &str| {
        fields
            .get(name)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
    };
    KeyStats {
        hits: count("hits"),
        misses: count("misses"),
        last_accessed: fields.get("lastAccessed").and_then(|v| v.parse().ok()),
    }
}

#[async_trait]
impl AnalyticsRecorder for RedisAnalytics {
    async fn record_hit(&self, key: &str) {
        if let Err(e) = self.record_access(key, "hits").await {
            tracing::warn!(key = %key, error = %e, "failed to record cache hit");
        }
    }

    async fn record_miss(&self, key: &str) {
        if let Err(e) = self.record_access(key, "misses").await {
            tracing::warn!(key = %key, error = %e, "failed to record cache miss");
        }
    }

    async fn record_operation(&self, operation: &str) {
        if let Err(e) = self.try_record_operation(operation).await {
            tracing::warn!(operation, error = %e, "failed to record cache operation");
        }
    }

    async fn snapshot(&self) -> AnalyticsSnapshot {
        match self.try_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cache analytics");
                AnalyticsSnapshot::default()
            }
        }
    }

    async fn reset(&self) {
        if let Err(e) = self.try_reset().await {
            tracing::warn!(error = %e, "failed to reset cache analytics");
        }
    }
}
