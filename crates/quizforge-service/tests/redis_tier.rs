//! Integration tests for the Redis cache tier and analytics.
//!
//! These tests use testcontainers to spin up a real Redis instance and are
//! ignored by default; run them with `--ignored` where Docker is available.
//! Each test uses its own logical database so they can share one container.

use std::sync::Arc;
use std::time::Duration;

use quizforge_core::{Quiz, TypeFilter};
use quizforge_db_memory::InMemoryQuizSource;
use quizforge_db_memory::fixtures::{quiz_metadata, seed_sample_catalog};
use quizforge_service::analytics::{AnalyticsRecorder, RedisAnalytics};
use quizforge_service::cache::{CacheEntry, CacheKey, CacheTier, RedisTier, create_redis_pool};
use quizforge_service::config::RedisConfig;
use quizforge_service::{AppConfig, CacheBackendKind, CacheOutcome, QuizService, SourceBackend};
use redis::AsyncCommands;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

/// Get or create the shared Redis container
async fn get_redis_url(database: u8) -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    format!("{url}/{database}")
}

fn redis_config(url: String) -> RedisConfig {
    RedisConfig {
        url,
        ..RedisConfig::default()
    }
}

fn entry(quiz_id: &str) -> CacheEntry {
    CacheEntry::new(Quiz::stub(quiz_metadata(quiz_id, "aws")))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_tier_get_set_delete() {
    let pool = create_redis_pool(&redis_config(get_redis_url(1).await)).expect("pool");
    let tier = RedisTier::new(pool);
    let key = CacheKey::canonical("alpha").to_string();

    tier.set(&key, &entry("alpha"), Duration::from_secs(60))
        .await
        .expect("set");

    let cached = tier.get(&key).await.expect("get").expect("entry present");
    assert_eq!(cached.data.id, "alpha");
    assert!(cached.is_current(&cached.data.version()));
    assert_eq!(tier.keys("quiz:*").await.expect("keys"), vec![key.clone()]);

    assert!(tier.delete(&key).await.expect("delete"));
    assert!(!tier.delete(&key).await.expect("delete again"));
    assert!(tier.get(&key).await.expect("get").is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_tier_delete_by_prefix() {
    let pool = create_redis_pool(&redis_config(get_redis_url(2).await)).expect("pool");
    let tier = RedisTier::new(pool);
    let ttl = Duration::from_secs(60);

    for (quiz_id, filter) in [
        ("a", TypeFilter::All),
        ("a", TypeFilter::parse("multi").unwrap()),
        ("ab", TypeFilter::All),
        ("a*", TypeFilter::All),
    ] {
        let key = CacheKey::new(quiz_id, filter).to_string();
        tier.set(&key, &entry(quiz_id), ttl).await.expect("set");
    }

    let removed = tier
        .delete_by_prefix("quiz:a:type:")
        .await
        .expect("delete by prefix");
    assert_eq!(removed, 2);

    let removed = tier
        .delete_by_prefix("quiz:a*:type:")
        .await
        .expect("delete by prefix");
    assert_eq!(removed, 1);
    assert_eq!(
        tier.keys("quiz:*").await.expect("keys"),
        vec!["quiz:ab:type:all".to_string()]
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_tier_drops_undecodable_values() {
    let pool = create_redis_pool(&redis_config(get_redis_url(3).await)).expect("pool");
    let tier = RedisTier::new(pool.clone());
    let key = CacheKey::canonical("broken").to_string();

    let mut conn = pool.get().await.expect("conn");
    let _: () = conn
        .set(&key, b"not msgpack".as_slice())
        .await
        .expect("raw set");

    assert!(tier.get(&key).await.expect("get").is_none());
    let exists: bool = conn.exists(&key).await.expect("exists");
    assert!(!exists);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_tier_ttl_expiration() {
    let pool = create_redis_pool(&redis_config(get_redis_url(4).await)).expect("pool");
    let tier = RedisTier::new(pool);
    let key = CacheKey::canonical("short").to_string();

    tier.set(&key, &entry("short"), Duration::from_secs(1))
        .await
        .expect("set");
    assert!(tier.get(&key).await.expect("get").is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(tier.get(&key).await.expect("get").is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_analytics_counters() {
    let pool = create_redis_pool(&redis_config(get_redis_url(5).await)).expect("pool");
    let analytics = RedisAnalytics::new(pool, Duration::from_secs(60));
    analytics.reset().await;

    analytics.record_miss("quiz:a:type:all").await;
    analytics.record_hit("quiz:a:type:all").await;
    analytics.record_hit("quiz:a:type:all").await;
    analytics.record_hit("quiz:b:type:all").await;
    analytics.record_operation("set").await;

    let snapshot = analytics.snapshot().await;
    assert_eq!(snapshot.hits, 3);
    assert_eq!(snapshot.misses, 1);
    assert!((snapshot.hit_rate - 0.75).abs() < f64::EPSILON);
    let a = &snapshot.per_key["quiz:a:type:all"];
    assert_eq!((a.hits, a.misses), (2, 1));
    assert!(a.last_accessed.is_some());
    assert_eq!(snapshot.per_key["quiz:b:type:all"].hits, 1);
    assert_eq!(snapshot.operations.get("set"), Some(&1));

    analytics.reset().await;
    let cleared = analytics.snapshot().await;
    assert_eq!(cleared.hits + cleared.misses, 0);
    assert!(cleared.per_key.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_services_share_the_redis_tier() {
    let source = Arc::new(InMemoryQuizSource::new());
    seed_sample_catalog(&source).expect("seed");

    let mut config = AppConfig::default();
    config.storage.backend = SourceBackend::Memory;
    config.cache.backend = CacheBackendKind::Redis;
    config.redis.url = get_redis_url(6).await;

    let first = QuizService::open(&config, source.clone()).await;
    let second = QuizService::open(&config, source.clone()).await;
    first.invalidate(None).await.expect("clean slate");

    let cold = first
        .read_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .expect("cold read");
    assert_eq!(cold.outcome, CacheOutcome::Miss);

    let warm = second
        .read_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .expect("warm read");
    assert_eq!(warm.outcome, CacheOutcome::Hit);
    assert_eq!(warm.quiz, cold.quiz);

    assert_eq!(second.invalidate(Some("aws-basics")).await.expect("invalidate"), 1);
    let reread = first
        .read_aggregate("aws-basics", TypeFilter::All, true)
        .await
        .expect("reread");
    assert_eq!(reread.outcome, CacheOutcome::Miss);

    let stats = first.stats().await;
    assert_eq!(stats.cache_backend, "redis");
    assert_eq!(stats.cached_entries, 1);

    first.close().await;
    second.close().await;
}
