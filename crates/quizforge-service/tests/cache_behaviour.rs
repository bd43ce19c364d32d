//! Read-through caching, invalidation and version watermarks through the
//! service facade.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{catalog_service, ids};
use quizforge_core::{QuestionType, TypeFilter};
use quizforge_db_memory::fixtures::{QuizBuilder, base_time};
use quizforge_db_memory::source::{OP_BASE_QUESTIONS, OP_QUIZ_METADATA, OP_QUIZ_VERSION};
use quizforge_service::analytics::LocalAnalytics;
use quizforge_service::cache::{CacheComponents, CacheEntry, CacheError};
use quizforge_service::{
    AppConfig, CacheBackendKind, CacheOutcome, CacheTier, QuizService, SampleFilter,
    SourceBackend,
};
use tokio_test::assert_ok;

const AWS_BASICS_KEY: &str = "quiz:aws-basics:type:all";

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let (source, service) = catalog_service();

    let first = service
        .read_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();
    source.reset_counts();
    let second = service
        .read_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();

    assert_eq!(first.outcome, CacheOutcome::Miss);
    assert_eq!(second.outcome, CacheOutcome::Hit);
    assert_eq!(first.quiz, second.quiz);
    assert_eq!(source.query_count(OP_BASE_QUESTIONS), 0);
    assert_eq!(source.total_supplemental_queries(), 0);
    assert_eq!(source.query_count(OP_QUIZ_VERSION), 1);

    let stats = service.stats().await;
    assert_eq!(stats.analytics.hits, 1);
    assert_eq!(stats.analytics.misses, 1);
    assert!((stats.analytics.hit_rate - 0.5).abs() < f64::EPSILON);
    let key_stats = &stats.analytics.per_key[AWS_BASICS_KEY];
    assert_eq!((key_stats.hits, key_stats.misses), (1, 1));
    assert!(key_stats.last_accessed.is_some());
    assert_eq!(stats.analytics.operations.get("set"), Some(&1));
    assert_eq!(stats.cached_entries, 1);
    assert_eq!(stats.cache_backend, "local");
    assert_eq!(stats.source_backend, "memory");
}

#[tokio::test]
async fn invalidation_forces_a_reload() {
    let (source, service) = catalog_service();
    service
        .get_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();

    // Same watermark: the cached entry keeps winning.
    QuizBuilder::new(&source, "aws-advanced")
        .topic("aws")
        .yes_no("adv02", Some(true))
        .install()
        .unwrap();
    let cached = service
        .read_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(cached.outcome, CacheOutcome::Hit);
    assert_eq!(ids(&cached.quiz.questions), vec!["adv01"]);

    let removed = assert_ok!(service.invalidate(Some("aws-advanced")).await);
    assert_eq!(removed, 1);

    let reloaded = service
        .read_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(reloaded.outcome, CacheOutcome::Miss);
    assert_eq!(ids(&reloaded.quiz.questions), vec!["adv01", "adv02"]);
    let stats = service.stats().await;
    assert_eq!(stats.analytics.operations.get("invalidate"), Some(&1));
}

#[tokio::test]
async fn invalidation_of_one_quiz_keeps_the_others() {
    let (_, service) = catalog_service();
    service
        .get_aggregate("aws-basics", TypeFilter::Only(QuestionType::Order), true)
        .await
        .unwrap();
    for quiz_id in ["aws-basics", "aws-advanced", "gcp-basics"] {
        service
            .get_aggregate(quiz_id, TypeFilter::All, true)
            .await
            .unwrap();
    }
    assert_eq!(service.stats().await.cached_entries, 4);

    assert_eq!(service.invalidate(Some("aws-basics")).await.unwrap(), 2);
    assert_eq!(service.stats().await.cached_entries, 2);

    let hit = service
        .read_aggregate("gcp-basics", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(hit.outcome, CacheOutcome::Hit);

    assert_eq!(service.invalidate(None).await.unwrap(), 2);
    assert_eq!(service.stats().await.cached_entries, 0);
}

#[tokio::test]
async fn invalidation_during_a_load_discards_its_result() {
    let (source, service) = catalog_service();
    source.delay_operation(OP_BASE_QUESTIONS, Duration::from_millis(200));

    let loading = tokio::spawn({
        let service = service.clone();
        async move {
            service
                .read_aggregate("aws-basics", TypeFilter::All, true)
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_ok!(service.invalidate(Some("aws-basics")).await);

    let overlapped = loading.await.unwrap().unwrap();
    assert_eq!(overlapped.outcome, CacheOutcome::Miss);
    assert_eq!(service.stats().await.cached_entries, 0);

    source.clear_faults();
    let after = service
        .read_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(after.outcome, CacheOutcome::Miss);
    let cached = service
        .read_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(cached.outcome, CacheOutcome::Hit);
}

#[tokio::test]
async fn invalidation_ignores_ids_sharing_a_prefix() {
    let (source, service) = catalog_service();
    QuizBuilder::new(&source, "aws-basics:type:yes_no")
        .yes_no("x1", Some(true))
        .install()
        .unwrap();
    for quiz_id in ["aws-basics", "aws-basics:type:yes_no"] {
        service
            .get_aggregate(quiz_id, TypeFilter::All, true)
            .await
            .unwrap();
    }

    assert_eq!(service.invalidate(Some("aws-basics")).await.unwrap(), 1);
    let kept = service
        .read_aggregate("aws-basics:type:yes_no", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(kept.outcome, CacheOutcome::Hit);
}

#[tokio::test]
async fn newer_watermark_replaces_the_entry() {
    let (source, service) = catalog_service();
    service
        .get_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();

    QuizBuilder::new(&source, "aws-advanced")
        .topic("aws")
        .updated_at(base_time().plus_seconds(60))
        .yes_no("adv02", Some(false))
        .install()
        .unwrap();

    let stale = service
        .read_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(stale.outcome, CacheOutcome::Stale);
    assert_eq!(ids(&stale.quiz.questions), vec!["adv01", "adv02"]);
    assert_eq!(stale.quiz.updated_at, base_time().plus_seconds(60));

    let fresh = service
        .read_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(fresh.outcome, CacheOutcome::Hit);
    assert_eq!(fresh.quiz, stale.quiz);
}

#[tokio::test]
async fn touching_the_quiz_alone_invalidates_the_entry() {
    let (source, service) = catalog_service();
    service
        .get_aggregate("gcp-basics", TypeFilter::All, true)
        .await
        .unwrap();

    assert!(source.touch_quiz("gcp-basics", base_time().plus_seconds(1)));

    let read = service
        .read_aggregate("gcp-basics", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(read.outcome, CacheOutcome::Stale);
    assert_eq!(read.quiz.version(), base_time().plus_seconds(1).to_string());
}

#[tokio::test]
async fn failed_version_probe_serves_the_cached_entry() {
    let (source, service) = catalog_service();
    let cold = service
        .get_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();

    source.fail_operation(OP_QUIZ_VERSION, "connection reset");
    source.touch_quiz("aws-basics", base_time().plus_seconds(30));

    let read = service
        .read_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(read.outcome, CacheOutcome::Hit);
    assert_eq!(read.quiz, cold);
}

#[tokio::test]
async fn deleted_quiz_is_not_served_from_cache() {
    let (source, service) = catalog_service();
    service
        .get_aggregate("gcp-basics", TypeFilter::All, true)
        .await
        .unwrap();

    source.remove_quiz("gcp-basics");

    let err = service
        .get_aggregate("gcp-basics", TypeFilter::All, true)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(service.stats().await.cached_entries, 0);
}

#[tokio::test]
async fn bypass_neither_reads_nor_writes_the_cache() {
    let (_, service) = catalog_service();

    let read = service
        .read_aggregate("aws-basics", TypeFilter::All, false)
        .await
        .unwrap();

    assert_eq!(read.outcome, CacheOutcome::Bypass);
    let stats = service.stats().await;
    assert_eq!(stats.cached_entries, 0);
    assert_eq!(stats.analytics.hits + stats.analytics.misses, 0);
}

#[tokio::test]
async fn filtered_read_reuses_the_full_entry() {
    let (source, service) = catalog_service();
    service
        .get_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();
    source.reset_counts();

    let read = service
        .read_aggregate("aws-basics", TypeFilter::Only(QuestionType::MultiChoice), true)
        .await
        .unwrap();

    assert_eq!(read.outcome, CacheOutcome::Hit);
    assert_eq!(ids(&read.quiz.questions), vec!["q02"]);
    assert_eq!(source.query_count(OP_BASE_QUESTIONS), 0);
}

#[tokio::test]
async fn concurrent_cold_reads_load_once_with_single_flight() {
    let (source, _) = catalog_service();
    let service = QuizService::builder(source.clone())
        .single_flight(true)
        .build();
    source.delay_operation(OP_BASE_QUESTIONS, Duration::from_millis(20));

    let reads = futures_util::future::join_all(
        (0..8).map(|_| service.read_aggregate("aws-basics", TypeFilter::All, true)),
    )
    .await;

    let misses = reads
        .iter()
        .filter(|r| r.as_ref().unwrap().outcome == CacheOutcome::Miss)
        .count();
    assert_eq!(misses, 1);
    assert_eq!(source.query_count(OP_BASE_QUESTIONS), 1);
}

#[tokio::test]
async fn get_many_resolves_each_distinct_id_once() {
    let (source, service) = catalog_service();

    let results = service
        .get_many(&["aws-basics", "missing", "gcp-basics", "aws-basics"], true)
        .await
        .unwrap();

    let resolved: Vec<_> = results
        .iter()
        .map(|(id, quiz)| (id.as_str(), quiz.is_some()))
        .collect();
    assert_eq!(
        resolved,
        vec![("aws-basics", true), ("missing", false), ("gcp-basics", true)]
    );
    assert_eq!(source.query_count(OP_QUIZ_METADATA), 3);
}

#[tokio::test]
async fn get_many_fails_on_storage_errors() {
    let (source, service) = catalog_service();
    source.fail_operation(OP_BASE_QUESTIONS, "disk full");

    let err = service
        .get_many(&["aws-basics", "gcp-basics"], false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage");
}

#[tokio::test]
async fn prefetch_warms_quizzes_on_the_same_topic() {
    let (source, service) = catalog_service();

    let warmed = service.prefetch_related("aws-basics", 3).await;
    assert_eq!(warmed, 1);

    source.reset_counts();
    let read = service
        .read_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(read.outcome, CacheOutcome::Hit);
    assert_eq!(source.query_count(OP_BASE_QUESTIONS), 0);

    assert_eq!(service.prefetch_related("missing", 3).await, 0);
    assert_eq!(service.spawn_prefetch("gcp-basics").await.unwrap(), 0);
}

#[tokio::test]
async fn refresh_reloads_the_full_aggregate() {
    let (source, service) = catalog_service();
    service
        .get_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();
    QuizBuilder::new(&source, "aws-advanced")
        .topic("aws")
        .yes_no("adv02", None)
        .yes_no("adv03", Some(true))
        .install()
        .unwrap();

    let refreshed = service.refresh("aws-advanced").await.unwrap();
    assert_eq!(ids(&refreshed.questions), vec!["adv01", "adv03"]);

    let read = service
        .read_aggregate("aws-advanced", TypeFilter::All, true)
        .await
        .unwrap();
    assert_eq!(read.outcome, CacheOutcome::Hit);
    assert_eq!(read.quiz, refreshed);
}

#[tokio::test]
async fn reads_are_sampled_for_latency() {
    let (_, service) = catalog_service();
    service
        .get_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();
    service
        .get_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();
    let _ = service
        .get_aggregate("missing", TypeFilter::All, true)
        .await;

    let samples = service.performance_samples(&SampleFilter {
        operation: Some("get_aggregate".into()),
        ..SampleFilter::default()
    });
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].cache_hit, Some(false));
    assert_eq!(samples[1].cache_hit, Some(true));
    assert!(!samples[2].success);
    assert_eq!(samples[0].metadata["quiz_id"], "aws-basics");

    let stats = service.stats().await;
    let summary = &stats.operations["get_aggregate"];
    assert_eq!(summary.count, 3);
    assert!((summary.cache_hit_rate - 50.0).abs() < 1e-9);

    service.clear_performance_samples();
    assert!(service.performance_samples(&SampleFilter::default()).is_empty());
}

/// A tier whose every call fails.
struct BrokenTier;

#[async_trait]
impl CacheTier for BrokenTier {
    async fn get(&self, _key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _entry: &CacheEntry, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete_by_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    fn backend(&self) -> CacheBackendKind {
        CacheBackendKind::Redis
    }
}

#[tokio::test]
async fn unavailable_cache_degrades_to_source_reads() {
    let (source, _) = catalog_service();
    let service = QuizService::builder(source.clone())
        .cache(CacheComponents {
            tier: Arc::new(BrokenTier),
            analytics: Arc::new(LocalAnalytics::new(Duration::from_secs(60))),
        })
        .build();

    for _ in 0..2 {
        let read = service
            .read_aggregate("aws-basics", TypeFilter::All, true)
            .await
            .unwrap();
        assert_eq!(read.outcome, CacheOutcome::Miss);
        assert_eq!(read.quiz.questions.len(), 7);
    }
    assert_eq!(source.query_count(OP_BASE_QUESTIONS), 2);

    let err = service.invalidate(Some("aws-basics")).await.unwrap_err();
    assert_eq!(err.kind(), "cache_unavailable");
    assert_eq!(service.stats().await.cached_entries, 0);
}

#[tokio::test]
async fn unreachable_redis_falls_back_to_the_local_tier() {
    let (source, _) = catalog_service();
    let mut config = AppConfig::default();
    config.storage.backend = SourceBackend::Memory;
    config.cache.backend = CacheBackendKind::Redis;
    config.redis.url = "redis://127.0.0.1:1".into();
    config.redis.timeout_ms = 200;

    let service = QuizService::open(&config, source.clone()).await;
    service
        .get_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .unwrap();

    let stats = service.stats().await;
    assert_eq!(stats.cache_backend, "local");
    assert_eq!(stats.cached_entries, 1);
}
