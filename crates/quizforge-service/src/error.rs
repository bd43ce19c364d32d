//! Errors surfaced by the quiz service.

use quizforge_storage::StorageError;

use crate::cache::CacheError;

/// Failure of a service operation.
///
/// Dropped questions are not an error: they shrink `questions` and are
/// logged. A cache failure only reaches callers from explicit cache
/// operations such as invalidation; reads fall back to the source.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// The quiz has no metadata row.
    #[error("Quiz not found: {quiz_id}")]
    NotFound { quiz_id: String },

    /// The relational source failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The cache backend could not be reached.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),
}

impl QuizError {
    #[must_use]
    pub fn not_found(quiz_id: impl Into<String>) -> Self {
        Self::NotFound {
            quiz_id: quiz_id.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "storage",
            Self::CacheUnavailable(_) => "cache_unavailable",
        }
    }
}
