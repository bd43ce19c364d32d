//! Cache access analytics and operation latency samples.
//!
//! Recording never fails the read path: recorders log backend errors and
//! carry on.

mod local;
mod perf;
mod redis;

use std::collections::BTreeMap;

use async_trait::async_trait;
use quizforge_core::Timestamp;
use serde::Serialize;

pub use local::LocalAnalytics;
pub use perf::{
    OperationSummary, OperationTimer, PerformanceLog, PerformanceSample, SampleFilter,
};
pub use redis::{ANALYTICS_KEY, KEY_STATS_PREFIX, RedisAnalytics};

/// Access counters of one cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyStats {
    pub hits: u64,
    pub misses: u64,
    pub last_accessed: Option<Timestamp>,
}

/// Point-in-time view of the recorded counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before the first access.
    pub hit_rate: f64,
    pub per_key: BTreeMap<String, KeyStats>,
    /// Counters of non-read operations such as `set` and `invalidate`.
    pub operations: BTreeMap<String, u64>,
}

impl AnalyticsSnapshot {
    pub(crate) fn with_hit_rate(mut self) -> Self {
        let total = self.hits + self.misses;
        self.hit_rate = if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        };
        self
    }
}

/// Sink for cache access counters.
#[async_trait]
pub trait AnalyticsRecorder: Send + Sync {
    async fn record_hit(&self, key: &str);

    async fn record_miss(&self, key: &str);

    async fn record_operation(&self, operation: &str);

    async fn snapshot(&self) -> AnalyticsSnapshot;

    /// Drops every counter.
    async fn reset(&self);
}
