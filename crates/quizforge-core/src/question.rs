//! Question model: the discriminant, the base row read from storage and the
//! enriched record served to clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::quiz::Difficulty;
use crate::time::Timestamp;

/// Question type discriminant.
///
/// Each variant selects one enrichment strategy and one payload shape. The
/// declaration order is the order groups are visited in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "single_selection")]
    SingleSelection,
    #[serde(rename = "multi")]
    MultiChoice,
    #[serde(rename = "drag_and_drop")]
    DragAndDrop,
    #[serde(rename = "dropdown_selection")]
    DropdownSelection,
    #[serde(rename = "order")]
    Order,
    #[serde(rename = "yes_no")]
    YesNo,
    #[serde(rename = "yesno_multi")]
    YesNoMulti,
}

impl QuestionType {
    pub const ALL: [QuestionType; 7] = [
        QuestionType::SingleSelection,
        QuestionType::MultiChoice,
        QuestionType::DragAndDrop,
        QuestionType::DropdownSelection,
        QuestionType::Order,
        QuestionType::YesNo,
        QuestionType::YesNoMulti,
    ];

    /// Wire form of the discriminant as stored in `questions.type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleSelection => "single_selection",
            QuestionType::MultiChoice => "multi",
            QuestionType::DragAndDrop => "drag_and_drop",
            QuestionType::DropdownSelection => "dropdown_selection",
            QuestionType::Order => "order",
            QuestionType::YesNo => "yes_no",
            QuestionType::YesNoMulti => "yesno_multi",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::unknown_question_type(s))
    }
}

/// Fields shared by every question regardless of type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBase {
    pub id: String,
    pub question: String,
    pub points: i32,
    /// Id of the owning quiz.
    pub quiz_tag: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_correct: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_incorrect: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A base question row before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRow {
    pub question_type: QuestionType,
    pub base: QuestionBase,
}

impl QuestionRow {
    pub fn new(question_type: QuestionType, base: QuestionBase) -> Self {
        Self {
            question_type,
            base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOption {
    pub option_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragTarget {
    pub target_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectPair {
    pub option_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub option_id: String,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderTarget {
    pub key: String,
    #[serde(rename = "correctOptionText")]
    pub correct_option_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub statement_id: String,
    pub text: String,
}

/// Type-specific part of a question, tagged by the wire discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum QuestionPayload {
    #[serde(rename = "single_selection")]
    SingleSelection {
        options: Vec<SelectionOption>,
        correct_answer_option_id: String,
    },
    #[serde(rename = "multi")]
    MultiChoice {
        options: Vec<SelectionOption>,
        correct_answer_option_ids: Vec<String>,
    },
    #[serde(rename = "drag_and_drop")]
    DragAndDrop {
        targets: Vec<DragTarget>,
        options: Vec<SelectionOption>,
        correct_pairs: Vec<CorrectPair>,
    },
    #[serde(rename = "dropdown_selection")]
    DropdownSelection {
        options: Vec<DropdownOption>,
        placeholder_targets: BTreeMap<String, PlaceholderTarget>,
    },
    #[serde(rename = "order")]
    Order {
        items: Vec<OrderItem>,
        /// Item ids in their correct sequence.
        correct_order: Vec<String>,
    },
    #[serde(rename = "yes_no")]
    YesNo { correct_answer: bool },
    #[serde(rename = "yesno_multi")]
    YesNoMulti {
        statements: Vec<Statement>,
        /// Aligned index-for-index with `statements`.
        correct_answers: Vec<bool>,
    },
}

impl QuestionPayload {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionPayload::SingleSelection { .. } => QuestionType::SingleSelection,
            QuestionPayload::MultiChoice { .. } => QuestionType::MultiChoice,
            QuestionPayload::DragAndDrop { .. } => QuestionType::DragAndDrop,
            QuestionPayload::DropdownSelection { .. } => QuestionType::DropdownSelection,
            QuestionPayload::Order { .. } => QuestionType::Order,
            QuestionPayload::YesNo { .. } => QuestionType::YesNo,
            QuestionPayload::YesNoMulti { .. } => QuestionType::YesNoMulti,
        }
    }
}

/// A fully enriched question as served inside a [`crate::Quiz`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(flatten)]
    pub base: QuestionBase,
    #[serde(flatten)]
    pub payload: QuestionPayload,
}

impl QuestionRecord {
    pub fn new(base: QuestionBase, payload: QuestionPayload) -> Self {
        Self { base, payload }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn question_type(&self) -> QuestionType {
        self.payload.question_type()
    }
}
