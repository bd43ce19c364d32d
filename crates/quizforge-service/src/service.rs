//! The quiz service facade.
//!
//! [`QuizService`] owns the source, the aggregate loader and the versioned
//! cache. It is constructed once at startup and cloned into callers.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use quizforge_core::{Quiz, TypeFilter};
use quizforge_storage::{DynQuizSource, TimedSource};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::analytics::{
    AnalyticsSnapshot, OperationSummary, PerformanceLog, PerformanceSample, SampleFilter,
};
use crate::cache::{
    CacheComponents, CacheKey, CacheOutcome, CacheRead, Invalidator, NAMESPACE, VersionedCache,
    create_cache,
};
use crate::config::AppConfig;
use crate::error::QuizError;
use crate::metrics;
use crate::pipeline::{AggregateLoader, StrategyRegistry};
use crate::progressive::ProgressiveLoad;

/// Snapshot returned by [`QuizService::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub cache_backend: String,
    pub source_backend: String,
    pub cached_entries: usize,
    pub analytics: AnalyticsSnapshot,
    /// Latency summary per operation, from the performance buffer.
    pub operations: BTreeMap<String, OperationSummary>,
}

struct ServiceInner {
    source: DynQuizSource,
    loader: AggregateLoader,
    cache: Arc<VersionedCache>,
    invalidator: Invalidator,
    perf: Arc<PerformanceLog>,
    prefetch_limit: usize,
}

/// Aggregation pipeline behind a versioned read-through cache.
#[derive(Clone)]
pub struct QuizService {
    inner: Arc<ServiceInner>,
}

impl QuizService {
    /// Builds the service from configuration, selecting the cache tier and
    /// bounding every source call with `storage.timeout_ms`.
    pub async fn open(config: &AppConfig, source: DynQuizSource) -> Self {
        let components = create_cache(&config.cache, &config.redis).await;
        Self::builder(source)
            .cache(components)
            .ttl(config.cache.ttl())
            .single_flight(config.cache.single_flight)
            .performance_buffer(config.cache.perf_buffer_size, config.cache.slow_operation())
            .storage_timeout(config.storage.timeout())
            .prefetch_limit(config.cache.prefetch_limit)
            .build()
    }

    pub fn builder(source: DynQuizSource) -> QuizServiceBuilder {
        QuizServiceBuilder::new(source)
    }

    pub fn cache(&self) -> &VersionedCache {
        &self.inner.cache
    }

    pub fn loader(&self) -> &AggregateLoader {
        &self.inner.loader
    }

    /// Returns the aggregate of `quiz_id` restricted to `filter`.
    ///
    /// With `use_cache` the read goes through the versioned cache; otherwise
    /// the source is queried directly and nothing is cached.
    pub async fn get_aggregate(
        &self,
        quiz_id: &str,
        filter: TypeFilter,
        use_cache: bool,
    ) -> Result<Quiz, QuizError> {
        self.read_aggregate(quiz_id, filter, use_cache)
            .await
            .map(|read| read.quiz)
    }

    /// Like [`Self::get_aggregate`], also reporting how the read was served.
    pub async fn read_aggregate(
        &self,
        quiz_id: &str,
        filter: TypeFilter,
        use_cache: bool,
    ) -> Result<CacheRead, QuizError> {
        let timer = self
            .inner
            .perf
            .start("get_aggregate")
            .meta("quiz_id", quiz_id)
            .meta("filter", filter);
        let loader = &self.inner.loader;

        let result = if use_cache {
            let key = CacheKey::new(quiz_id, filter);
            self.inner
                .cache
                .get_or_load(&key, self.inner.source.as_ref(), || {
                    loader.load(quiz_id, filter)
                })
                .await
        } else {
            loader.load(quiz_id, filter).await.map(|quiz| CacheRead {
                quiz,
                outcome: CacheOutcome::Bypass,
            })
        };

        match &result {
            Ok(read) => {
                timer.finish(true, use_cache.then(|| read.outcome.is_hit()));
            }
            Err(e) => {
                self.observe_error("get_aggregate", quiz_id, e);
                timer.finish(false, None);
            }
        }
        result
    }

    /// Removes cached aggregates of `quiz_id`, or of every quiz.
    pub async fn invalidate(&self, quiz_id: Option<&str>) -> Result<u64, QuizError> {
        let timer = self
            .inner
            .perf
            .start("invalidate")
            .meta("quiz_id", quiz_id.unwrap_or("*"));
        let result = self.inner.invalidator.clear(quiz_id).await;
        timer.finish(result.is_ok(), None);
        Ok(result?)
    }

    /// Invalidates `quiz_id` and reloads its full aggregate into the cache.
    pub async fn refresh(&self, quiz_id: &str) -> Result<Quiz, QuizError> {
        self.invalidate(Some(quiz_id)).await?;
        self.get_aggregate(quiz_id, TypeFilter::All, true).await
    }

    pub async fn stats(&self) -> ServiceStats {
        let tier = self.inner.cache.tier();
        let cached_entries = match tier.keys(&format!("{NAMESPACE}*")).await {
            Ok(keys) => keys.len(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to count cached entries");
                0
            }
        };
        metrics::set_cache_entries(tier.backend().as_str(), cached_entries);

        ServiceStats {
            cache_backend: tier.backend().to_string(),
            source_backend: self.inner.source.backend_name().to_string(),
            cached_entries,
            analytics: self.inner.cache.analytics().snapshot().await,
            operations: self.inner.perf.summary(),
        }
    }

    /// Reads the metadata of `quiz_id` and returns a pending full load.
    pub async fn load_progressive(&self, quiz_id: &str) -> Result<ProgressiveLoad, QuizError> {
        let timer = self
            .inner
            .perf
            .start("load_progressive")
            .meta("quiz_id", quiz_id);
        let metadata = match self.inner.source.quiz_metadata(quiz_id).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                timer.finish(false, None);
                return Err(QuizError::not_found(quiz_id));
            }
            Err(e) => {
                let err = QuizError::from(e);
                self.observe_error("load_progressive", quiz_id, &err);
                timer.finish(false, None);
                return Err(err);
            }
        };
        timer.finish(true, None);
        Ok(ProgressiveLoad::new(
            metadata,
            self.inner.loader.clone(),
            Arc::clone(&self.inner.cache),
        ))
    }

    /// Resolves several quizzes concurrently, in first-seen order.
    ///
    /// Duplicate ids are resolved once. Missing quizzes map to `None`; any
    /// other failure fails the whole call after every read has finished.
    pub async fn get_many<S: AsRef<str>>(
        &self,
        quiz_ids: &[S],
        use_cache: bool,
    ) -> Result<Vec<(String, Option<Quiz>)>, QuizError> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = quiz_ids
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| seen.insert(*id))
            .collect();

        join_all(unique.into_iter().map(|id| async move {
            match self.get_aggregate(id, TypeFilter::All, use_cache).await {
                Ok(quiz) => Ok((id.to_string(), Some(quiz))),
                Err(e) if e.is_not_found() => Ok((id.to_string(), None)),
                Err(e) => Err(e),
            }
        }))
        .await
        .into_iter()
        .collect()
    }

    /// Warms the cache with up to `limit` quizzes sharing the topic of
    /// `quiz_id`. Failures are logged; returns how many were loaded.
    pub async fn prefetch_related(&self, quiz_id: &str, limit: usize) -> usize {
        let source = &self.inner.source;
        let topic = match source.quiz_metadata(quiz_id).await {
            Ok(Some(metadata)) => metadata.topic,
            Ok(None) => {
                tracing::debug!(quiz_id = %quiz_id, "prefetch skipped: quiz not found");
                return 0;
            }
            Err(e) => {
                tracing::warn!(quiz_id = %quiz_id, operation = "prefetch", error = %e, "prefetch failed");
                return 0;
            }
        };
        let related = match source.related_quiz_ids(&topic, quiz_id, limit).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(quiz_id = %quiz_id, operation = "prefetch", error = %e, "prefetch failed");
                return 0;
            }
        };

        let results = join_all(
            related
                .iter()
                .map(|id| self.get_aggregate(id, TypeFilter::All, true)),
        )
        .await;
        let mut warmed = 0;
        for (id, result) in related.iter().zip(results) {
            match result {
                Ok(_) => warmed += 1,
                Err(e) => {
                    tracing::warn!(quiz_id = %id, operation = "prefetch", error = %e, "related quiz not prefetched");
                }
            }
        }
        tracing::debug!(quiz_id = %quiz_id, topic = %topic, warmed, "prefetched related quizzes");
        warmed
    }

    /// Runs [`Self::prefetch_related`] in the background with the configured
    /// limit.
    pub fn spawn_prefetch(&self, quiz_id: &str) -> JoinHandle<usize> {
        let service = self.clone();
        let quiz_id = quiz_id.to_string();
        let limit = self.inner.prefetch_limit;
        tokio::spawn(async move { service.prefetch_related(&quiz_id, limit).await })
    }

    pub fn performance_samples(&self, filter: &SampleFilter) -> Vec<PerformanceSample> {
        self.inner.perf.samples(filter)
    }

    pub fn clear_performance_samples(&self) {
        self.inner.perf.clear();
    }

    /// Releases the cache tier's connections.
    pub async fn close(&self) {
        self.inner.cache.tier().close().await;
        tracing::info!("quiz service closed");
    }

    fn observe_error(&self, operation: &'static str, quiz_id: &str, error: &QuizError) {
        match error {
            QuizError::NotFound { .. } => {
                tracing::debug!(quiz_id = %quiz_id, operation, "quiz not found");
            }
            QuizError::Storage(e) => {
                metrics::record_storage_error(e.category().to_string());
                tracing::warn!(quiz_id = %quiz_id, operation, error = %e, "storage failure");
            }
            QuizError::CacheUnavailable(e) => {
                tracing::warn!(quiz_id = %quiz_id, operation, error = %e, "cache failure");
            }
        }
    }
}

/// Assembles a [`QuizService`]; defaults match [`crate::config::CacheConfig`].
pub struct QuizServiceBuilder {
    source: DynQuizSource,
    components: Option<CacheComponents>,
    registry: StrategyRegistry,
    ttl: Duration,
    key_stats_ttl: Duration,
    single_flight: bool,
    perf_capacity: usize,
    slow_threshold: Duration,
    storage_timeout: Option<Duration>,
    prefetch_limit: usize,
}

impl QuizServiceBuilder {
    fn new(source: DynQuizSource) -> Self {
        let defaults = crate::config::CacheConfig::default();
        Self {
            source,
            components: None,
            registry: StrategyRegistry::with_defaults(),
            ttl: defaults.ttl(),
            key_stats_ttl: defaults.key_stats_ttl(),
            single_flight: defaults.single_flight,
            perf_capacity: defaults.perf_buffer_size,
            slow_threshold: defaults.slow_operation(),
            storage_timeout: None,
            prefetch_limit: defaults.prefetch_limit,
        }
    }

    pub fn cache(mut self, components: CacheComponents) -> Self {
        self.components = Some(components);
        self
    }

    pub fn registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn performance_buffer(mut self, capacity: usize, slow_threshold: Duration) -> Self {
        self.perf_capacity = capacity;
        self.slow_threshold = slow_threshold;
        self
    }

    /// Wraps the source in a [`TimedSource`] with this deadline.
    pub fn storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = Some(timeout);
        self
    }

    pub fn prefetch_limit(mut self, limit: usize) -> Self {
        self.prefetch_limit = limit;
        self
    }

    pub fn build(self) -> QuizService {
        let source: DynQuizSource = match self.storage_timeout {
            Some(timeout) => Arc::new(TimedSource::new(self.source, timeout)),
            None => self.source,
        };
        let components = self
            .components
            .unwrap_or_else(|| CacheComponents::local(self.key_stats_ttl));
        let cache = Arc::new(
            VersionedCache::new(
                Arc::clone(&components.tier),
                Arc::clone(&components.analytics),
                self.ttl,
            )
            .with_single_flight(self.single_flight),
        );
        let invalidator = cache.invalidator();

        tracing::info!(
            cache_backend = %components.tier.backend(),
            source_backend = source.backend_name(),
            ttl_secs = self.ttl.as_secs(),
            single_flight = self.single_flight,
            "quiz service ready"
        );

        QuizService {
            inner: Arc::new(ServiceInner {
                loader: AggregateLoader::new(Arc::clone(&source), Arc::new(self.registry)),
                source,
                cache,
                invalidator,
                perf: Arc::new(PerformanceLog::new(self.perf_capacity, self.slow_threshold)),
                prefetch_limit: self.prefetch_limit,
            }),
        }
    }
}
