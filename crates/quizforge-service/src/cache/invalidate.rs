use std::sync::Arc;

use futures_util::future::join_all;

use super::generation::Generations;
use super::key::{CacheKey, NAMESPACE};
use super::tier::{CacheError, CacheTier};
use crate::analytics::AnalyticsRecorder;
use crate::metrics;

/// Explicit purge of cached aggregates.
///
/// A read that started before a clear may still return the entry it already
/// fetched; reads that start afterwards miss. Loads in flight during a clear
/// do not store their result.
#[derive(Clone)]
pub struct Invalidator {
    tier: Arc<dyn CacheTier>,
    analytics: Arc<dyn AnalyticsRecorder>,
    generations: Arc<Generations>,
}

impl Invalidator {
    pub fn new(
        tier: Arc<dyn CacheTier>,
        analytics: Arc<dyn AnalyticsRecorder>,
        generations: Arc<Generations>,
    ) -> Self {
        Self {
            tier,
            analytics,
            generations,
        }
    }

    /// Removes every filter variant of `quiz_id`, or the whole namespace when
    /// `quiz_id` is `None`. Returns the number of removed entries.
    pub async fn clear(&self, quiz_id: Option<&str>) -> Result<u64, CacheError> {
        // Bump before deleting so a load finishing in between sees the change.
        self.generations.bump(quiz_id);
        let (scope, result) = match quiz_id {
            Some(id) => ("quiz", self.clear_quiz(id).await),
            None => ("all", self.tier.delete_by_prefix(NAMESPACE).await),
        };
        let removed = result.inspect_err(|e| {
            tracing::warn!(quiz_id = ?quiz_id, operation = "invalidate", error = %e, "invalidation failed");
            metrics::record_cache_error(self.tier.backend().as_str(), "invalidate");
        })?;
        self.analytics.record_operation("invalidate").await;
        metrics::record_invalidation(scope, removed);
        tracing::info!(quiz_id = ?quiz_id, removed, "cache invalidated");
        Ok(removed)
    }

    /// Deletes the exact key of each filter variant, so ids sharing a prefix
    /// with `quiz_id` are left alone.
    async fn clear_quiz(&self, quiz_id: &str) -> Result<u64, CacheError> {
        let keys: Vec<String> = CacheKey::variants(quiz_id)
            .map(|key| key.to_string())
            .collect();
        let results = join_all(keys.iter().map(|key| self.tier.delete(key))).await;
        let mut removed = 0;
        for result in results {
            if result? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::LocalAnalytics;
    use crate::cache::{CacheEntry, LocalTier};
    use quizforge_core::{Difficulty, Quiz, QuizMetadata, Timestamp};
    use std::time::Duration;

    async fn seeded() -> (Invalidator, Arc<dyn CacheTier>, Arc<LocalAnalytics>) {
        let tier: Arc<dyn CacheTier> = Arc::new(LocalTier::new());
        let analytics = Arc::new(LocalAnalytics::new(Duration::from_secs(60)));
        let ts: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
        let entry = CacheEntry::new(Quiz::stub(QuizMetadata {
            id: "x".into(),
            title: "x".into(),
            description: None,
            topic: "t".into(),
            difficulty: Difficulty::Medium,
            quiz_type: None,
            author: None,
            settings: None,
            created_at: ts,
            updated_at: ts,
        }));
        for key in [
            "quiz:a:type:all",
            "quiz:a:type:multi",
            "quiz:a-2:type:all",
            "quiz:a:type:b:type:all",
            "other:key",
        ] {
            tier.set(key, &entry, Duration::from_secs(60)).await.unwrap();
        }
        let invalidator = Invalidator::new(
            Arc::clone(&tier),
            analytics.clone(),
            Arc::new(Generations::new()),
        );
        (invalidator, tier, analytics)
    }

    #[tokio::test]
    async fn clears_every_variant_of_one_quiz() {
        let (invalidator, tier, analytics) = seeded().await;
        assert_eq!(invalidator.clear(Some("a")).await.unwrap(), 2);
        assert_eq!(
            tier.keys("*").await.unwrap(),
            vec![
                "other:key".to_string(),
                "quiz:a-2:type:all".to_string(),
                "quiz:a:type:b:type:all".to_string(),
            ]
        );
        let snapshot = analytics.snapshot().await;
        assert_eq!(snapshot.operations.get("invalidate"), Some(&1));
    }

    #[tokio::test]
    async fn ids_containing_the_type_segment_are_cleared_on_their_own() {
        let (invalidator, tier, _) = seeded().await;
        assert_eq!(invalidator.clear(Some("a:type:b")).await.unwrap(), 1);
        assert!(tier.get("quiz:a:type:all").await.unwrap().is_some());
        assert!(tier.get("quiz:a:type:b:type:all").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_advances_generation_of_its_scope() {
        let (invalidator, _, _) = seeded().await;
        let generations = Arc::clone(&invalidator.generations);
        let a = generations.current("a");
        let other = generations.current("other");
        invalidator.clear(Some("a")).await.unwrap();
        assert!(!generations.is_current("a", a));
        assert!(generations.is_current("other", other));
    }

    #[tokio::test]
    async fn global_clear_keeps_foreign_keys() {
        let (invalidator, tier, _) = seeded().await;
        assert_eq!(invalidator.clear(None).await.unwrap(), 4);
        assert_eq!(tier.keys("*").await.unwrap(), vec!["other:key".to_string()]);
    }
}
