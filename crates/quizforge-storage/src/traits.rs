//! The query capability consumed by the aggregation pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use quizforge_core::{QuestionRow, QuestionType, QuizMetadata, Timestamp};

use crate::error::StorageError;
use crate::supplemental::{SupplementalRows, SupplementalTable};

/// Read access to quizzes, their base question rows and the supplemental
/// per-type tables.
///
/// All lookups are keyed by id or id list. Implementations must be
/// thread-safe (`Send + Sync`); the pipeline issues calls concurrently.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// Reads the `quizzes` row for `quiz_id`.
    ///
    /// Returns `None` if the quiz does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing quizzes.
    async fn quiz_metadata(&self, quiz_id: &str) -> Result<Option<QuizMetadata>, StorageError>;

    /// Reads the base question rows of a quiz, ordered by question id.
    ///
    /// When `question_type` is given only rows with that discriminant are
    /// returned. Rows whose discriminant is not a known [`QuestionType`] are
    /// skipped by the implementation.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn base_questions(
        &self,
        quiz_id: &str,
        question_type: Option<QuestionType>,
    ) -> Result<Vec<QuestionRow>, StorageError>;

    /// Reads every row of `table` whose `question_id` is in `question_ids`.
    ///
    /// The returned rows always have the shape `table` produces, even when
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn supplemental(
        &self,
        table: SupplementalTable,
        question_ids: &[String],
    ) -> Result<SupplementalRows, StorageError>;

    /// Reads only `quizzes.updated_at`, the cache version watermark.
    ///
    /// Returns `None` if the quiz does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn quiz_version(&self, quiz_id: &str) -> Result<Option<Timestamp>, StorageError>;

    /// Lists up to `limit` quiz ids sharing `topic`, excluding `exclude_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn related_quiz_ids(
        &self,
        topic: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError>;

    /// Short backend name for logs and stats.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<S> QuizSource for Arc<S>
where
    S: QuizSource + ?Sized,
{
    async fn quiz_metadata(&self, quiz_id: &str) -> Result<Option<QuizMetadata>, StorageError> {
        (**self).quiz_metadata(quiz_id).await
    }

    async fn base_questions(
        &self,
        quiz_id: &str,
        question_type: Option<QuestionType>,
    ) -> Result<Vec<QuestionRow>, StorageError> {
        (**self).base_questions(quiz_id, question_type).await
    }

    async fn supplemental(
        &self,
        table: SupplementalTable,
        question_ids: &[String],
    ) -> Result<SupplementalRows, StorageError> {
        (**self).supplemental(table, question_ids).await
    }

    async fn quiz_version(&self, quiz_id: &str) -> Result<Option<Timestamp>, StorageError> {
        (**self).quiz_version(quiz_id).await
    }

    async fn related_quiz_ids(
        &self,
        topic: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        (**self).related_quiz_ids(topic, exclude_id, limit).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
