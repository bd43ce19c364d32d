//! In-memory quiz source for QuizForge.
//!
//! This crate provides an implementation of the `QuizSource` trait from
//! `quizforge-storage` backed by `DashMap`s. Besides serving data it counts
//! every query per operation and supplemental table, and can be told to fail
//! or slow down specific calls, which makes it the backend of choice for
//! pipeline and cache tests.
//!
//! # Example
//!
//! ```ignore
//! use quizforge_db_memory::{InMemoryQuizSource, fixtures::QuizBuilder};
//!
//! let source = InMemoryQuizSource::new();
//! QuizBuilder::new(&source, "aws-basics")
//!     .yes_no("q1", Some(true))
//!     .install();
//! let rows = source.base_questions("aws-basics", None).await?;
//! ```

pub mod fixtures;
pub mod source;

pub use quizforge_storage::{QuizSource, StorageError};
pub use source::InMemoryQuizSource;

/// Creates a new shared in-memory source.
pub fn create_memory_source() -> std::sync::Arc<InMemoryQuizSource> {
    std::sync::Arc::new(InMemoryQuizSource::new())
}
