//! # quizforge-storage
//!
//! Relational query abstraction for the quiz aggregation pipeline.
//!
//! This crate defines the [`QuizSource`] trait that every backend implements,
//! the catalogue of supplemental tables queried during enrichment, and the
//! storage error type. Implementations live in separate crates.
//!
//! ## Example
//!
//! ```ignore
//! use quizforge_storage::{QuizSource, StorageError, SupplementalTable};
//!
//! async fn correct_answers(
//!     source: &dyn QuizSource,
//!     ids: &[String],
//! ) -> Result<usize, StorageError> {
//!     let rows = source
//!         .supplemental(SupplementalTable::MultiCorrectAnswers, ids)
//!         .await?
//!         .into_correct_options()?;
//!     Ok(rows.len())
//! }
//! ```

mod error;
mod supplemental;
pub mod timed;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use supplemental::{
    CorrectOptionRow, DropdownOptionRow, OptionRow, OrderItemRow, OrderPositionRow, PairRow,
    PlaceholderRow, StatementAnswerRow, StatementRow, SupplementalRow, SupplementalRows,
    SupplementalTable, TargetRow, YesNoAnswerRow,
};
pub use timed::TimedSource;
pub use traits::QuizSource;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared source trait object.
pub type DynQuizSource = std::sync::Arc<dyn QuizSource>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        DynQuizSource, QuizSource, StorageError, StorageResult, SupplementalRows,
        SupplementalTable,
    };
}
