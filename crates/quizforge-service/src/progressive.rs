//! Progressive loading: metadata first, questions later.
//!
//! [`ProgressiveLoad::stub`] is available as soon as the metadata row has
//! been read. [`ProgressiveLoad::complete`] then enriches the questions,
//! reporting progress per type group, and caches the result like any other
//! read.

use std::sync::Arc;

use quizforge_core::{Quiz, QuizMetadata};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::cache::{CacheKey, CacheOutcome, VersionedCache};
use crate::error::QuizError;
use crate::pipeline::AggregateLoader;

/// Base rows processed so far out of the quiz total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(LoadProgress) + Send + Sync>;

/// A quiz whose metadata is known and whose questions are still pending.
pub struct ProgressiveLoad {
    metadata: QuizMetadata,
    stub: Quiz,
    loader: AggregateLoader,
    cache: Arc<VersionedCache>,
}

impl ProgressiveLoad {
    pub(crate) fn new(
        metadata: QuizMetadata,
        loader: AggregateLoader,
        cache: Arc<VersionedCache>,
    ) -> Self {
        Self {
            stub: Quiz::stub(metadata.clone()),
            metadata,
            loader,
            cache,
        }
    }

    /// The quiz with `questions` empty.
    pub fn stub(&self) -> &Quiz {
        &self.stub
    }

    pub fn quiz_id(&self) -> &str {
        &self.metadata.id
    }

    /// Loads the full aggregate through the cache.
    ///
    /// On a cache hit the callback fires once with `loaded == total`.
    pub async fn complete(self, progress: Option<ProgressCallback>) -> Result<Quiz, QuizError> {
        let Self {
            metadata,
            loader,
            cache,
            ..
        } = self;
        let quiz_id = metadata.id.clone();
        let key = CacheKey::canonical(quiz_id.clone());
        let probe = Arc::clone(loader.source());
        let source = Arc::clone(&probe);

        let load_progress = progress.clone();
        let read = cache
            .get_or_load(&key, probe.as_ref(), || async move {
                let rows = source.base_questions(&metadata.id, None).await?;
                let report = loader
                    .enrich_rows(metadata, rows, load_progress.as_ref())
                    .await?;
                Ok::<_, QuizError>(report.quiz)
            })
            .await
            .inspect_err(|e| {
                tracing::warn!(quiz_id = %quiz_id, operation = "load_progressive", error = %e, "progressive load failed");
            })?;

        if read.outcome == CacheOutcome::Hit
            && let Some(callback) = progress
        {
            let total = read.quiz.questions.len();
            callback(LoadProgress {
                loaded: total,
                total,
            });
        }
        Ok(read.quiz)
    }

    /// Runs [`Self::complete`] on a background task.
    pub fn spawn(self, progress: Option<ProgressCallback>) -> JoinHandle<Result<Quiz, QuizError>> {
        tokio::spawn(self.complete(progress))
    }
}
