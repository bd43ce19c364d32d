use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use quizforge_core::{QuestionRow, QuestionType, QuizMetadata, Timestamp};
use quizforge_storage::{QuizSource, StorageError, SupplementalRows, SupplementalTable};
use tracing::debug;

pub const OP_QUIZ_METADATA: &str = "quiz_metadata";
pub const OP_BASE_QUESTIONS: &str = "base_questions";
pub const OP_QUIZ_VERSION: &str = "quiz_version";
pub const OP_RELATED_QUIZ_IDS: &str = "related_quiz_ids";

/// In-memory quiz source.
///
/// Operations are identified by name for counting and fault injection:
/// `quiz_metadata`, `base_questions`, `quiz_version`, `related_quiz_ids`, and
/// the table name for supplemental queries (e.g. `multi_correct_answers`).
#[derive(Debug, Default)]
pub struct InMemoryQuizSource {
    quizzes: DashMap<String, QuizMetadata>,
    /// Question id -> row.
    questions: DashMap<String, QuestionRow>,
    supplemental: DashMap<SupplementalTable, SupplementalRows>,
    query_counts: DashMap<String, u64>,
    failures: DashMap<String, String>,
    delays: DashMap<String, Duration>,
}

impl InMemoryQuizSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_quiz(&self, metadata: QuizMetadata) {
        self.quizzes.insert(metadata.id.clone(), metadata);
    }

    pub fn remove_quiz(&self, quiz_id: &str) -> Option<QuizMetadata> {
        self.quizzes.remove(quiz_id).map(|(_, meta)| meta)
    }

    /// Moves `updated_at` of a quiz to `updated_at`, advancing its version.
    pub fn touch_quiz(&self, quiz_id: &str, updated_at: Timestamp) -> bool {
        match self.quizzes.get_mut(quiz_id) {
            Some(mut meta) => {
                meta.updated_at = updated_at;
                true
            }
            None => false,
        }
    }

    pub fn insert_question(&self, row: QuestionRow) {
        self.questions.insert(row.base.id.clone(), row);
    }

    pub fn remove_question(&self, question_id: &str) -> Option<QuestionRow> {
        self.questions.remove(question_id).map(|(_, row)| row)
    }

    /// Appends supplemental rows to `table`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidData` if `rows` has a shape `table`
    /// does not produce.
    pub fn insert_rows(
        &self,
        table: SupplementalTable,
        rows: SupplementalRows,
    ) -> Result<(), StorageError> {
        if !table.accepts(&rows) {
            return Err(StorageError::invalid_data(format!(
                "{} rows do not belong in {table}",
                rows.kind()
            )));
        }
        self.supplemental
            .entry(table)
            .or_insert_with(|| table.empty_rows())
            .extend(rows)
    }

    /// Deletes every row of `table` that belongs to `question_id`.
    pub fn delete_rows(&self, table: SupplementalTable, question_id: &str) {
        if let Some(mut rows) = self.supplemental.get_mut(&table) {
            rows.retain_by(|id| id != question_id);
        }
    }

    /// Makes every future call of `operation` fail with a query error.
    pub fn fail_operation(&self, operation: impl Into<String>, message: impl Into<String>) {
        self.failures.insert(operation.into(), message.into());
    }

    pub fn fail_table(&self, table: SupplementalTable, message: impl Into<String>) {
        self.fail_operation(table.table_name(), message);
    }

    /// Delays every future call of `operation` by `delay`.
    pub fn delay_operation(&self, operation: impl Into<String>, delay: Duration) {
        self.delays.insert(operation.into(), delay);
    }

    pub fn clear_faults(&self) {
        self.failures.clear();
        self.delays.clear();
    }

    pub fn query_count(&self, operation: &str) -> u64 {
        self.query_counts
            .get(operation)
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn supplemental_query_count(&self, table: SupplementalTable) -> u64 {
        self.query_count(table.table_name())
    }

    pub fn total_supplemental_queries(&self) -> u64 {
        SupplementalTable::ALL
            .iter()
            .map(|t| self.supplemental_query_count(*t))
            .sum()
    }

    pub fn reset_counts(&self) {
        self.query_counts.clear();
    }

    async fn enter(&self, operation: &str) -> Result<(), StorageError> {
        *self.query_counts.entry(operation.to_string()).or_insert(0) += 1;

        let delay = self.delays.get(operation).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.get(operation) {
            Some(message) => Err(StorageError::query(message.value().clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QuizSource for InMemoryQuizSource {
    async fn quiz_metadata(&self, quiz_id: &str) -> Result<Option<QuizMetadata>, StorageError> {
        self.enter(OP_QUIZ_METADATA).await?;
        Ok(self.quizzes.get(quiz_id).map(|meta| meta.clone()))
    }

    async fn base_questions(
        &self,
        quiz_id: &str,
        question_type: Option<QuestionType>,
    ) -> Result<Vec<QuestionRow>, StorageError> {
        self.enter(OP_BASE_QUESTIONS).await?;

        let mut rows: Vec<QuestionRow> = self
            .questions
            .iter()
            .filter(|row| row.base.quiz_tag == quiz_id)
            .filter(|row| question_type.is_none_or(|t| row.question_type == t))
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by(|a, b| a.base.id.cmp(&b.base.id));

        debug!(quiz_id, count = rows.len(), "in-memory base rows");
        Ok(rows)
    }

    async fn supplemental(
        &self,
        table: SupplementalTable,
        question_ids: &[String],
    ) -> Result<SupplementalRows, StorageError> {
        self.enter(table.table_name()).await?;

        let wanted: HashSet<&str> = question_ids.iter().map(String::as_str).collect();
        let mut rows = self
            .supplemental
            .get(&table)
            .map(|rows| rows.clone())
            .unwrap_or_else(|| table.empty_rows());
        rows.retain_questions(&wanted);
        Ok(rows)
    }

    async fn quiz_version(&self, quiz_id: &str) -> Result<Option<Timestamp>, StorageError> {
        self.enter(OP_QUIZ_VERSION).await?;
        Ok(self.quizzes.get(quiz_id).map(|meta| meta.updated_at))
    }

    async fn related_quiz_ids(
        &self,
        topic: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        self.enter(OP_RELATED_QUIZ_IDS).await?;

        let mut ids: Vec<String> = self
            .quizzes
            .iter()
            .filter(|meta| meta.topic == topic && meta.id != exclude_id)
            .map(|meta| meta.id.clone())
            .collect();
        ids.sort();
        ids.truncate(limit);
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{QuizBuilder, base_time};

    fn seeded() -> InMemoryQuizSource {
        let source = InMemoryQuizSource::new();
        QuizBuilder::new(&source, "quiz-a")
            .topic("networking")
            .yes_no("b2", Some(true))
            .order("b1", &[("i1", "one")], &[("i1", 1)])
            .install()
            .unwrap();
        QuizBuilder::new(&source, "quiz-b")
            .topic("networking")
            .yes_no("c1", Some(false))
            .install()
            .unwrap();
        source
    }

    #[tokio::test]
    async fn base_questions_are_ordered_and_filtered() {
        let source = seeded();

        let rows = source.base_questions("quiz-a", None).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["b1", "b2"]);

        let rows = source
            .base_questions("quiz-a", Some(QuestionType::YesNo))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), "b2");
    }

    #[tokio::test]
    async fn supplemental_is_restricted_to_requested_ids() {
        let source = seeded();

        let rows = source
            .supplemental(
                SupplementalTable::YesNoAnswer,
                &["b2".to_string(), "missing".to_string()],
            )
            .await
            .unwrap()
            .into_yes_no_answers()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].question_id, "b2");
        assert_eq!(source.supplemental_query_count(SupplementalTable::YesNoAnswer), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_query_errors() {
        let source = seeded();
        source.fail_table(SupplementalTable::OrderItems, "disk on fire");

        let err = source
            .supplemental(SupplementalTable::OrderItems, &["b1".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Query error: disk on fire");

        source.clear_faults();
        assert!(
            source
                .supplemental(SupplementalTable::OrderItems, &["b1".to_string()])
                .await
                .is_ok()
        );
        assert_eq!(source.query_count("order_items"), 2);
    }

    #[tokio::test]
    async fn version_follows_touch() {
        let source = seeded();
        assert_eq!(
            source.quiz_version("quiz-a").await.unwrap(),
            Some(base_time())
        );

        let later = base_time().plus_seconds(30);
        assert!(source.touch_quiz("quiz-a", later));
        assert_eq!(source.quiz_version("quiz-a").await.unwrap(), Some(later));
        assert_eq!(source.quiz_version("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn related_excludes_self_and_respects_limit() {
        let source = seeded();
        let related = source
            .related_quiz_ids("networking", "quiz-a", 3)
            .await
            .unwrap();
        assert_eq!(related, vec!["quiz-b".to_string()]);

        let related = source
            .related_quiz_ids("networking", "other", 1)
            .await
            .unwrap();
        assert_eq!(related, vec!["quiz-a".to_string()]);
    }

    #[test]
    fn insert_rows_rejects_wrong_shape() {
        let source = InMemoryQuizSource::new();
        let err = source
            .insert_rows(
                SupplementalTable::YesNoAnswer,
                SupplementalRows::Statements(Vec::new()),
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidData { .. }));
    }

    #[tokio::test]
    async fn delete_rows_removes_only_that_question() {
        let source = seeded();
        source.delete_rows(SupplementalTable::YesNoAnswer, "b2");

        let rows = source
            .supplemental(
                SupplementalTable::YesNoAnswer,
                &["b2".to_string(), "c1".to_string()],
            )
            .await
            .unwrap()
            .into_yes_no_answers()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].question_id, "c1");
    }
}
