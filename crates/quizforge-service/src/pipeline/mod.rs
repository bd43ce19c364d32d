//! Aggregate loading: fetch, group, enrich and assemble.
//!
//! ```text
//! fetch_base ──► group_by_type ──► enrich_groups (one task per type) ──► assemble
//! ```

pub mod assemble;
pub mod enrich;
pub mod fetch;
pub mod group;

use std::sync::Arc;

use quizforge_core::{QuestionRecord, QuestionRow, Quiz, QuizMetadata, TypeFilter};
use quizforge_storage::DynQuizSource;

use crate::error::QuizError;
use crate::metrics;
use crate::progressive::{LoadProgress, ProgressCallback};

pub use assemble::assemble;
pub use enrich::{
    DroppedRow, EnrichStrategy, IndexedRecord, StrategyOutput, StrategyRegistry, enrich_groups,
    enrich_one,
};
pub use fetch::fetch_base;
pub use group::{IndexedRow, TypeGroups, group_by_type};

/// An aggregate plus the rows left out of it.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub quiz: Quiz,
    pub dropped: Vec<DroppedRow>,
}

/// Builds aggregates straight from the source, without caching.
#[derive(Clone)]
pub struct AggregateLoader {
    source: DynQuizSource,
    registry: Arc<StrategyRegistry>,
}

impl AggregateLoader {
    pub fn new(source: DynQuizSource, registry: Arc<StrategyRegistry>) -> Self {
        Self { source, registry }
    }

    pub fn source(&self) -> &DynQuizSource {
        &self.source
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub async fn load(&self, quiz_id: &str, filter: TypeFilter) -> Result<Quiz, QuizError> {
        Ok(self.load_with_report(quiz_id, filter, None).await?.quiz)
    }

    pub async fn load_with_report(
        &self,
        quiz_id: &str,
        filter: TypeFilter,
        progress: Option<&ProgressCallback>,
    ) -> Result<LoadReport, QuizError> {
        let (metadata, rows) = fetch_base(self.source.as_ref(), quiz_id, filter).await?;
        self.enrich_rows(metadata, rows, progress).await
    }

    /// Groups, enriches and reassembles `rows` under `metadata`.
    ///
    /// `progress` receives the running count of processed base rows after
    /// each type group completes.
    pub async fn enrich_rows(
        &self,
        metadata: QuizMetadata,
        rows: Vec<QuestionRow>,
        progress: Option<&ProgressCallback>,
    ) -> Result<LoadReport, QuizError> {
        let total = rows.len();
        if total == 0
            && let Some(callback) = progress
        {
            callback(LoadProgress { loaded: 0, total });
        }

        let mut loaded = 0;
        let output = enrich_groups(
            &self.registry,
            self.source.as_ref(),
            group_by_type(rows),
            |_, count| {
                loaded += count;
                if let Some(callback) = progress {
                    callback(LoadProgress { loaded, total });
                }
            },
        )
        .await?;

        for dropped in &output.dropped {
            tracing::warn!(
                quiz_id = %metadata.id,
                question_id = %dropped.question_id,
                question_type = %dropped.question_type,
                reason = dropped.reason,
                "question dropped: required supplemental data missing"
            );
            metrics::record_enrichment_dropped(dropped.question_type.as_str());
        }

        let questions = assemble(output.records);
        tracing::debug!(
            quiz_id = %metadata.id,
            questions = questions.len(),
            dropped = output.dropped.len(),
            "aggregate assembled"
        );
        Ok(LoadReport {
            quiz: Quiz::from_parts(metadata, questions),
            dropped: output.dropped,
        })
    }

    /// Enriches one row on its own, through the same strategy as a batch.
    pub async fn enrich_single(&self, row: QuestionRow) -> Result<Option<QuestionRecord>, QuizError> {
        Ok(enrich_one(&self.registry, self.source.as_ref(), row).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use quizforge_db_memory::InMemoryQuizSource;
    use quizforge_db_memory::fixtures::{QuizBuilder, seed_sample_catalog};

    fn loader(source: Arc<InMemoryQuizSource>) -> AggregateLoader {
        AggregateLoader::new(source, Arc::new(StrategyRegistry::with_defaults()))
    }

    #[tokio::test]
    async fn assembles_in_source_order() {
        let source = Arc::new(InMemoryQuizSource::new());
        seed_sample_catalog(&source).unwrap();
        let quiz = loader(source).load("aws-basics", TypeFilter::All).await.unwrap();
        let ids: Vec<&str> = quiz.questions.iter().map(|q| q.id()).collect();
        assert_eq!(ids, vec!["q01", "q02", "q03", "q04", "q05", "q06", "q07"]);
        assert_eq!(quiz.topic, "aws");
    }

    #[tokio::test]
    async fn progress_counts_rows_per_group() {
        let source = Arc::new(InMemoryQuizSource::new());
        QuizBuilder::new(&source, "q")
            .yes_no("a", Some(true))
            .yes_no("b", Some(true))
            .multi("c", &[("1", "x")], &["1"])
            .install()
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |p: LoadProgress| sink.lock().push(p));
        let report = loader(source)
            .load_with_report("q", TypeFilter::All, Some(&callback))
            .await
            .unwrap();
        assert!(report.dropped.is_empty());

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.last(), Some(&LoadProgress { loaded: 3, total: 3 }));
        assert!(seen.windows(2).all(|w| w[0].loaded < w[1].loaded));
    }

    #[tokio::test]
    async fn dropped_rows_are_reported() {
        let source = Arc::new(InMemoryQuizSource::new());
        QuizBuilder::new(&source, "q")
            .yes_no("a", None)
            .yes_no("b", Some(true))
            .install()
            .unwrap();
        let report = loader(source)
            .load_with_report("q", TypeFilter::All, None)
            .await
            .unwrap();
        assert_eq!(report.quiz.questions.len(), 1);
        assert_eq!(report.dropped[0].question_id, "a");
    }
}
