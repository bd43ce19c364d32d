use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use quizforge_core::{Timestamp, now_utc};
use serde::Serialize;

use crate::metrics;

/// One timed service operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSample {
    pub operation: String,
    pub duration_ms: f64,
    pub success: bool,
    /// `None` for operations that do not read through the cache.
    pub cache_hit: Option<bool>,
    pub metadata: BTreeMap<String, String>,
    pub recorded_at: Timestamp,
}

/// Selects samples returned by [`PerformanceLog::samples`].
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    pub operation: Option<String>,
    pub min_duration_ms: Option<f64>,
}

impl SampleFilter {
    fn matches(&self, sample: &PerformanceSample) -> bool {
        self.operation
            .as_deref()
            .is_none_or(|op| op == sample.operation)
            && self
                .min_duration_ms
                .is_none_or(|min| sample.duration_ms >= min)
    }
}

/// Aggregates over the samples of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub count: usize,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Percentage of successful samples.
    pub success_rate: f64,
    /// Percentage of cache-reading samples that hit.
    pub cache_hit_rate: f64,
}

/// Bounded ring buffer of recent operation timings.
pub struct PerformanceLog {
    samples: Mutex<VecDeque<PerformanceSample>>,
    capacity: usize,
    slow_threshold: Duration,
}

impl PerformanceLog {
    pub fn new(capacity: usize, slow_threshold: Duration) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            slow_threshold,
        }
    }

    /// Starts timing `operation`; the sample is recorded by
    /// [`OperationTimer::finish`].
    pub fn start(self: &Arc<Self>, operation: &str) -> OperationTimer {
        OperationTimer {
            log: Arc::clone(self),
            operation: operation.to_string(),
            started: Instant::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn record(&self, sample: PerformanceSample) {
        if sample.duration_ms >= self.slow_threshold.as_secs_f64() * 1000.0 {
            tracing::warn!(
                operation = %sample.operation,
                duration_ms = sample.duration_ms,
                threshold_ms = self.slow_threshold.as_millis() as u64,
                "slow operation"
            );
        }
        let mut samples = self.samples.lock();
        while samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Samples matching `filter`, oldest first.
    pub fn samples(&self, filter: &SampleFilter) -> Vec<PerformanceSample> {
        self.samples
            .lock()
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> BTreeMap<String, OperationSummary> {
        let samples = self.samples.lock();
        let mut grouped: BTreeMap<&str, Vec<&PerformanceSample>> = BTreeMap::new();
        for sample in samples.iter() {
            grouped.entry(sample.operation.as_str()).or_default().push(sample);
        }
        grouped
            .into_iter()
            .map(|(operation, group)| (operation.to_string(), summarize(&group)))
            .collect()
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

fn summarize(group: &[&PerformanceSample]) -> OperationSummary {
    let count = group.len();
    let total: f64 = group.iter().map(|s| s.duration_ms).sum();
    let min_ms = group.iter().map(|s| s.duration_ms).fold(f64::INFINITY, f64::min);
    let max_ms = group.iter().map(|s| s.duration_ms).fold(0.0, f64::max);
    let successes = group.iter().filter(|s| s.success).count();
    let cache_reads: Vec<bool> = group.iter().filter_map(|s| s.cache_hit).collect();
    let cache_hits = cache_reads.iter().filter(|hit| **hit).count();

    let percent = |part: usize, whole: usize| {
        if whole == 0 {
            0.0
        } else {
            part as f64 * 100.0 / whole as f64
        }
    };

    OperationSummary {
        count,
        avg_ms: if count == 0 { 0.0 } else { total / count as f64 },
        min_ms: if count == 0 { 0.0 } else { min_ms },
        max_ms,
        success_rate: percent(successes, count),
        cache_hit_rate: percent(cache_hits, cache_reads.len()),
    }
}

/// Running timer for one operation.
pub struct OperationTimer {
    log: Arc<PerformanceLog>,
    operation: String,
    started: Instant,
    metadata: BTreeMap<String, String>,
}

impl OperationTimer {
    #[must_use]
    pub fn meta(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Records the sample and the duration histogram.
    pub fn finish(self, success: bool, cache_hit: Option<bool>) -> Duration {
        let elapsed = self.started.elapsed();
        metrics::record_operation_duration(&self.operation, success, elapsed);
        self.log.record(PerformanceSample {
            operation: self.operation,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            success,
            cache_hit,
            metadata: self.metadata,
            recorded_at: now_utc(),
        });
        elapsed
    }
}
