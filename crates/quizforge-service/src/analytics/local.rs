use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use quizforge_core::{Timestamp, now_utc};

use super::{AnalyticsRecorder, AnalyticsSnapshot, KeyStats};

#[derive(Debug)]
struct KeyCounter {
    hits: u64,
    misses: u64,
    last_accessed: Timestamp,
    touched: Instant,
}

/// In-process analytics used alongside the local tier.
///
/// Per-key counters idle for longer than `key_ttl` are pruned when a
/// snapshot is taken.
pub struct LocalAnalytics {
    hits: AtomicU64,
    misses: AtomicU64,
    per_key: DashMap<String, KeyCounter>,
    operations: DashMap<String, u64>,
    key_ttl: Duration,
}

impl LocalAnalytics {
    pub fn new(key_ttl: Duration) -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            per_key: DashMap::new(),
            operations: DashMap::new(),
            key_ttl,
        }
    }

    fn touch(&self, key: &str, hit: bool) {
        let mut counter = self
            .per_key
            .entry(key.to_string())
            .or_insert_with(|| KeyCounter {
                hits: 0,
                misses: 0,
                last_accessed: now_utc(),
                touched: Instant::now(),
            });
        if hit {
            counter.hits += 1;
        } else {
            counter.misses += 1;
        }
        counter.last_accessed = now_utc();
        counter.touched = Instant::now();
    }
}

#[async_trait]
impl AnalyticsRecorder for LocalAnalytics {
    async fn record_hit(&self, key: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.touch(key, true);
    }

    async fn record_miss(&self, key: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.touch(key, false);
    }

    async fn record_operation(&self, operation: &str) {
        *self.operations.entry(operation.to_string()).or_insert(0) += 1;
    }

    async fn snapshot(&self) -> AnalyticsSnapshot {
        let key_ttl = self.key_ttl;
        self.per_key
            .retain(|_, counter| counter.touched.elapsed() <= key_ttl);

        AnalyticsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            hit_rate: 0.0,
            per_key: self
                .per_key
                .iter()
                .map(|item| {
                    let counter = item.value();
                    (
                        item.key().clone(),
                        KeyStats {
                            hits: counter.hits,
                            misses: counter.misses,
                            last_accessed: Some(counter.last_accessed),
                        },
                    )
                })
                .collect(),
            operations: self
                .operations
                .iter()
                .map(|item| (item.key().clone(), *item.value()))
                .collect(),
        }
        .with_hit_rate()
    }

    async fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.per_key.clear();
        self.operations.clear();
    }
}
