use thiserror::Error;

/// Core error types for QuizForge domain parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown question type: {0}")]
    UnknownQuestionType(String),

    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new UnknownQuestionType error
    pub fn unknown_question_type(value: impl Into<String>) -> Self {
        Self::UnknownQuestionType(value.into())
    }

    /// Create a new UnknownDifficulty error
    pub fn unknown_difficulty(value: impl Into<String>) -> Self {
        Self::UnknownDifficulty(value.into())
    }

    /// Create a new InvalidTimestamp error
    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp(value.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
