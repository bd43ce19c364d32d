//! Prometheus metrics for the quiz pipeline and its cache.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`init_metrics`] installs the Prometheus recorder.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "quizforge_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "quizforge_cache_misses_total";
    pub const CACHE_STALE_TOTAL: &str = "quizforge_cache_stale_total";
    pub const CACHE_ERRORS_TOTAL: &str = "quizforge_cache_errors_total";
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "quizforge_cache_invalidations_total";
    pub const CACHE_ENTRIES: &str = "quizforge_cache_entries";

    pub const ENRICHMENT_DROPPED_TOTAL: &str = "quizforge_enrichment_dropped_total";
    pub const STORAGE_ERRORS_TOTAL: &str = "quizforge_storage_errors_total";
    pub const OPERATION_DURATION_SECONDS: &str = "quizforge_operation_duration_seconds";
}

/// Initialize the Prometheus recorder.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::debug!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

pub fn record_cache_hit(tier: &str) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier.to_string()).increment(1);
}

pub fn record_cache_miss(tier: &str) {
    counter!(names::CACHE_MISSES_TOTAL, "tier" => tier.to_string()).increment(1);
}

/// A TTL-valid entry was rejected because its version fell behind.
pub fn record_cache_stale(tier: &str) {
    counter!(names::CACHE_STALE_TOTAL, "tier" => tier.to_string()).increment(1);
}

pub fn record_cache_error(tier: &str, operation: &'static str) {
    counter!(
        names::CACHE_ERRORS_TOTAL,
        "tier" => tier.to_string(),
        "operation" => operation
    )
    .increment(1);
}

pub fn record_invalidation(scope: &'static str, removed: u64) {
    counter!(names::CACHE_INVALIDATIONS_TOTAL, "scope" => scope).increment(removed);
}

pub fn set_cache_entries(tier: &str, count: usize) {
    gauge!(names::CACHE_ENTRIES, "tier" => tier.to_string()).set(count as f64);
}

pub fn record_enrichment_dropped(question_type: &'static str) {
    counter!(names::ENRICHMENT_DROPPED_TOTAL, "question_type" => question_type).increment(1);
}

pub fn record_storage_error(category: String) {
    counter!(names::STORAGE_ERRORS_TOTAL, "category" => category).increment(1);
}

pub fn record_operation_duration(operation: &str, success: bool, duration: Duration) {
    histogram!(
        names::OPERATION_DURATION_SECONDS,
        "operation" => operation.to_string(),
        "success" => if success { "true" } else { "false" }
    )
    .record(duration.as_secs_f64());
}
