//! Core domain types shared by every QuizForge crate.
//!
//! The central type is [`Quiz`], the fully denormalized aggregate handed to
//! clients. Its questions are [`QuestionRecord`]s: base fields common to every
//! question plus a [`QuestionPayload`] tagged by [`QuestionType`].

pub mod error;
pub mod filter;
pub mod question;
pub mod quiz;
pub mod time;

pub use error::{CoreError, Result};
pub use filter::TypeFilter;
pub use question::{
    CorrectPair, DragTarget, DropdownOption, OrderItem, PlaceholderTarget, QuestionBase,
    QuestionPayload, QuestionRecord, QuestionRow, QuestionType, SelectionOption, Statement,
};
pub use quiz::{Difficulty, Quiz, QuizMetadata};
pub use time::{Timestamp, now_utc};
