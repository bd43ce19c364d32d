//! TimedSource - a source wrapper that bounds every call with a deadline.
//!
//! Each call is delegated to the inner source inside `tokio::time::timeout`;
//! an elapsed deadline becomes [`StorageError::Timeout`] so callers treat it
//! like any other relational failure.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use quizforge_storage::TimedSource;
//!
//! let source = TimedSource::new(postgres_source, Duration::from_secs(5));
//! let quiz = source.quiz_metadata("aws-basics").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use quizforge_core::{QuestionRow, QuestionType, QuizMetadata, Timestamp};
use tracing::warn;

use crate::error::StorageError;
use crate::supplemental::{SupplementalRows, SupplementalTable};
use crate::traits::QuizSource;

/// A source wrapper that applies a per-call timeout.
pub struct TimedSource<S: QuizSource> {
    inner: S,
    timeout: Duration,
}

impl<S: QuizSource> TimedSource<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    operation,
                    timeout_ms,
                    backend = self.inner.backend_name(),
                    "storage call timed out"
                );
                Err(StorageError::timeout(operation, timeout_ms))
            }
        }
    }
}

#[async_trait]
impl<S: QuizSource> QuizSource for TimedSource<S> {
    async fn quiz_metadata(&self, quiz_id: &str) -> Result<Option<QuizMetadata>, StorageError> {
        self.bounded("quiz_metadata", self.inner.quiz_metadata(quiz_id))
            .await
    }

    async fn base_questions(
        &self,
        quiz_id: &str,
        question_type: Option<QuestionType>,
    ) -> Result<Vec<QuestionRow>, StorageError> {
        self.bounded(
            "base_questions",
            self.inner.base_questions(quiz_id, question_type),
        )
        .await
    }

    async fn supplemental(
        &self,
        table: SupplementalTable,
        question_ids: &[String],
    ) -> Result<SupplementalRows, StorageError> {
        self.bounded(
            table.table_name(),
            self.inner.supplemental(table, question_ids),
        )
        .await
    }

    async fn quiz_version(&self, quiz_id: &str) -> Result<Option<Timestamp>, StorageError> {
        self.bounded("quiz_version", self.inner.quiz_version(quiz_id))
            .await
    }

    async fn related_quiz_ids(
        &self,
        topic: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        self.bounded(
            "related_quiz_ids",
            self.inner.related_quiz_ids(topic, exclude_id, limit),
        )
        .await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl QuizSource for SlowSource {
        async fn quiz_metadata(&self, _: &str) -> Result<Option<QuizMetadata>, StorageError> {
            tokio::time::sleep(self.delay).await;
            Ok(None)
        }

        async fn base_questions(
            &self,
            _: &str,
            _: Option<QuestionType>,
        ) -> Result<Vec<QuestionRow>, StorageError> {
            Ok(Vec::new())
        }

        async fn supplemental(
            &self,
            table: SupplementalTable,
            _: &[String],
        ) -> Result<SupplementalRows, StorageError> {
            tokio::time::sleep(self.delay).await;
            Ok(table.empty_rows())
        }

        async fn quiz_version(&self, _: &str) -> Result<Option<Timestamp>, StorageError> {
            Err(StorageError::connection_error("refused"))
        }

        async fn related_quiz_ids(
            &self,
            _: &str,
            _: &str,
            _: usize,
        ) -> Result<Vec<String>, StorageError> {
            Ok(Vec::new())
        }

        fn backend_name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn elapsed_deadline_maps_to_timeout() {
        let source = TimedSource::new(
            SlowSource {
                delay: Duration::from_millis(200),
            },
            Duration::from_millis(20),
        );

        let err = source.quiz_metadata("q1").await.unwrap_err();
        assert!(err.is_timeout());

        let err = source
            .supplemental(SupplementalTable::OrderItems, &["q1".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Timed out after 20ms: order_items");
    }

    #[tokio::test]
    async fn fast_calls_and_inner_errors_pass_through() {
        let source = TimedSource::new(
            SlowSource {
                delay: Duration::ZERO,
            },
            Duration::from_millis(200),
        );

        assert!(source.base_questions("q1", None).await.unwrap().is_empty());
        let err = source.quiz_version("q1").await.unwrap_err();
        assert!(matches!(err, StorageError::ConnectionError { .. }));
        assert_eq!(source.backend_name(), "slow");
    }
}
