//! Supplemental tables joined onto base question rows during enrichment.
//!
//! Every table is keyed by `question_id`; the enricher asks for all rows of
//! one table whose `question_id` is in a set, then joins them back in memory.

use std::collections::HashSet;
use std::fmt;

use quizforge_core::QuestionType;

use crate::error::StorageError;

/// Every supplemental table the enrichment strategies read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SupplementalTable {
    SingleSelectionOptions,
    SingleSelectionCorrectAnswer,
    MultiOptions,
    MultiCorrectAnswers,
    DragAndDropTargets,
    DragAndDropOptions,
    DragAndDropCorrectPairs,
    DropdownSelectionOptions,
    DropdownSelectionTargets,
    OrderItems,
    OrderCorrectOrder,
    YesNoAnswer,
    YesNoMultiStatements,
    YesNoMultiCorrectAnswers,
}

impl SupplementalTable {
    pub const ALL: [SupplementalTable; 14] = [
        SupplementalTable::SingleSelectionOptions,
        SupplementalTable::SingleSelectionCorrectAnswer,
        SupplementalTable::MultiOptions,
        SupplementalTable::MultiCorrectAnswers,
        SupplementalTable::DragAndDropTargets,
        SupplementalTable::DragAndDropOptions,
        SupplementalTable::DragAndDropCorrectPairs,
        SupplementalTable::DropdownSelectionOptions,
        SupplementalTable::DropdownSelectionTargets,
        SupplementalTable::OrderItems,
        SupplementalTable::OrderCorrectOrder,
        SupplementalTable::YesNoAnswer,
        SupplementalTable::YesNoMultiStatements,
        SupplementalTable::YesNoMultiCorrectAnswers,
    ];

    /// Name of the relational table.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::SingleSelectionOptions => "single_selection_options",
            Self::SingleSelectionCorrectAnswer => "single_selection_correct_answer",
            Self::MultiOptions => "multi_options",
            Self::MultiCorrectAnswers => "multi_correct_answers",
            Self::DragAndDropTargets => "drag_and_drop_targets",
            Self::DragAndDropOptions => "drag_and_drop_options",
            Self::DragAndDropCorrectPairs => "drag_and_drop_correct_pairs",
            Self::DropdownSelectionOptions => "dropdown_selection_options",
            Self::DropdownSelectionTargets => "dropdown_selection_targets",
            Self::OrderItems => "order_items",
            Self::OrderCorrectOrder => "order_correct_order",
            Self::YesNoAnswer => "yes_no_answer",
            Self::YesNoMultiStatements => "yesno_multi_statements",
            Self::YesNoMultiCorrectAnswers => "yesno_multi_correct_answers",
        }
    }

    /// Question type whose strategy reads this table.
    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::SingleSelectionOptions | Self::SingleSelectionCorrectAnswer => {
                QuestionType::SingleSelection
            }
            Self::MultiOptions | Self::MultiCorrectAnswers => QuestionType::MultiChoice,
            Self::DragAndDropTargets | Self::DragAndDropOptions | Self::DragAndDropCorrectPairs => {
                QuestionType::DragAndDrop
            }
            Self::DropdownSelectionOptions | Self::DropdownSelectionTargets => {
                QuestionType::DropdownSelection
            }
            Self::OrderItems | Self::OrderCorrectOrder => QuestionType::Order,
            Self::YesNoAnswer => QuestionType::YesNo,
            Self::YesNoMultiStatements | Self::YesNoMultiCorrectAnswers => {
                QuestionType::YesNoMulti
            }
        }
    }

    /// An empty row set of the shape this table produces.
    pub fn empty_rows(&self) -> SupplementalRows {
        match self {
            Self::SingleSelectionOptions | Self::MultiOptions | Self::DragAndDropOptions => {
                SupplementalRows::Options(Vec::new())
            }
            Self::SingleSelectionCorrectAnswer | Self::MultiCorrectAnswers => {
                SupplementalRows::CorrectOptions(Vec::new())
            }
            Self::DragAndDropTargets => SupplementalRows::Targets(Vec::new()),
            Self::DragAndDropCorrectPairs => SupplementalRows::Pairs(Vec::new()),
            Self::DropdownSelectionOptions => SupplementalRows::DropdownOptions(Vec::new()),
            Self::DropdownSelectionTargets => SupplementalRows::Placeholders(Vec::new()),
            Self::OrderItems => SupplementalRows::OrderItems(Vec::new()),
            Self::OrderCorrectOrder => SupplementalRows::OrderPositions(Vec::new()),
            Self::YesNoAnswer => SupplementalRows::YesNoAnswers(Vec::new()),
            Self::YesNoMultiStatements => SupplementalRows::Statements(Vec::new()),
            Self::YesNoMultiCorrectAnswers => SupplementalRows::StatementAnswers(Vec::new()),
        }
    }

    /// Returns `true` if `rows` has the shape this table produces.
    pub fn accepts(&self, rows: &SupplementalRows) -> bool {
        std::mem::discriminant(&self.empty_rows()) == std::mem::discriminant(rows)
    }
}

impl fmt::Display for SupplementalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A supplemental row, joined back onto its question by id.
pub trait SupplementalRow {
    fn question_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    pub question_id: String,
    pub option_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectOptionRow {
    pub question_id: String,
    pub option_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRow {
    pub question_id: String,
    pub target_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRow {
    pub question_id: String,
    pub option_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOptionRow {
    pub question_id: String,
    pub option_id: String,
    pub text: String,
    pub is_correct: bool,
}

/// `dropdown_selection_targets` row: `value` is the correct option text for
/// placeholder `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRow {
    pub question_id: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemRow {
    pub question_id: String,
    pub item_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPositionRow {
    pub question_id: String,
    pub item_id: String,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YesNoAnswerRow {
    pub question_id: String,
    pub correct_answer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRow {
    pub question_id: String,
    pub statement_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementAnswerRow {
    pub question_id: String,
    pub statement_id: String,
    pub correct_answer: bool,
}

macro_rules! supplemental_row {
    ($($ty:ty),+ $(,)?) => {
        $(impl SupplementalRow for $ty {
            fn question_id(&self) -> &str {
                &self.question_id
            }
        })+
    };
}

supplemental_row!(
    OptionRow,
    CorrectOptionRow,
    TargetRow,
    PairRow,
    DropdownOptionRow,
    PlaceholderRow,
    OrderItemRow,
    OrderPositionRow,
    YesNoAnswerRow,
    StatementRow,
    StatementAnswerRow,
);

/// Rows returned for one supplemental query, grouped by row shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SupplementalRows {
    Options(Vec<OptionRow>),
    CorrectOptions(Vec<CorrectOptionRow>),
    Targets(Vec<TargetRow>),
    Pairs(Vec<PairRow>),
    DropdownOptions(Vec<DropdownOptionRow>),
    Placeholders(Vec<PlaceholderRow>),
    OrderItems(Vec<OrderItemRow>),
    OrderPositions(Vec<OrderPositionRow>),
    YesNoAnswers(Vec<YesNoAnswerRow>),
    Statements(Vec<StatementRow>),
    StatementAnswers(Vec<StatementAnswerRow>),
}

fn retain_by<T: SupplementalRow>(rows: &mut Vec<T>, keep: &impl Fn(&str) -> bool) {
    rows.retain(|row| keep(row.question_id()));
}

macro_rules! into_rows {
    ($($name:ident => $variant:ident($ty:ty)),+ $(,)?) => {
        $(
            #[doc = concat!("Unwraps `", stringify!($variant), "` rows.")]
            ///
            /// # Errors
            ///
            /// Returns `StorageError::InvalidData` if the rows have another shape.
            pub fn $name(self) -> Result<Vec<$ty>, StorageError> {
                match self {
                    SupplementalRows::$variant(rows) => Ok(rows),
                    other => Err(StorageError::invalid_data(format!(
                        "expected {} rows, got {}",
                        stringify!($variant),
                        other.kind()
                    ))),
                }
            }
        )+
    };
}

impl SupplementalRows {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Options(_) => "Options",
            Self::CorrectOptions(_) => "CorrectOptions",
            Self::Targets(_) => "Targets",
            Self::Pairs(_) => "Pairs",
            Self::DropdownOptions(_) => "DropdownOptions",
            Self::Placeholders(_) => "Placeholders",
            Self::OrderItems(_) => "OrderItems",
            Self::OrderPositions(_) => "OrderPositions",
            Self::YesNoAnswers(_) => "YesNoAnswers",
            Self::Statements(_) => "Statements",
            Self::StatementAnswers(_) => "StatementAnswers",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Options(rows) => rows.len(),
            Self::CorrectOptions(rows) => rows.len(),
            Self::Targets(rows) => rows.len(),
            Self::Pairs(rows) => rows.len(),
            Self::DropdownOptions(rows) => rows.len(),
            Self::Placeholders(rows) => rows.len(),
            Self::OrderItems(rows) => rows.len(),
            Self::OrderPositions(rows) => rows.len(),
            Self::YesNoAnswers(rows) => rows.len(),
            Self::Statements(rows) => rows.len(),
            Self::StatementAnswers(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps only rows whose question id satisfies `keep`, preserving order.
    pub fn retain_by(&mut self, keep: impl Fn(&str) -> bool) {
        match self {
            Self::Options(rows) => retain_by(rows, &keep),
            Self::CorrectOptions(rows) => retain_by(rows, &keep),
            Self::Targets(rows) => retain_by(rows, &keep),
            Self::Pairs(rows) => retain_by(rows, &keep),
            Self::DropdownOptions(rows) => retain_by(rows, &keep),
            Self::Placeholders(rows) => retain_by(rows, &keep),
            Self::OrderItems(rows) => retain_by(rows, &keep),
            Self::OrderPositions(rows) => retain_by(rows, &keep),
            Self::YesNoAnswers(rows) => retain_by(rows, &keep),
            Self::Statements(rows) => retain_by(rows, &keep),
            Self::StatementAnswers(rows) => retain_by(rows, &keep),
        }
    }

    /// Keeps only rows belonging to one of `question_ids`, preserving order.
    pub fn retain_questions(&mut self, question_ids: &HashSet<&str>) {
        self.retain_by(|id| question_ids.contains(id));
    }

    /// Appends `other` to `self` when both have the same shape.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidData` on a shape mismatch.
    pub fn extend(&mut self, other: SupplementalRows) -> Result<(), StorageError> {
        match (self, other) {
            (Self::Options(a), Self::Options(b)) => a.extend(b),
            (Self::CorrectOptions(a), Self::CorrectOptions(b)) => a.extend(b),
            (Self::Targets(a), Self::Targets(b)) => a.extend(b),
            (Self::Pairs(a), Self::Pairs(b)) => a.extend(b),
            (Self::DropdownOptions(a), Self::DropdownOptions(b)) => a.extend(b),
            (Self::Placeholders(a), Self::Placeholders(b)) => a.extend(b),
            (Self::OrderItems(a), Self::OrderItems(b)) => a.extend(b),
            (Self::OrderPositions(a), Self::OrderPositions(b)) => a.extend(b),
            (Self::YesNoAnswers(a), Self::YesNoAnswers(b)) => a.extend(b),
            (Self::Statements(a), Self::Statements(b)) => a.extend(b),
            (Self::StatementAnswers(a), Self::StatementAnswers(b)) => a.extend(b),
            (this, other) => {
                return Err(StorageError::invalid_data(format!(
                    "cannot append {} rows to {} rows",
                    other.kind(),
                    this.kind()
                )));
            }
        }
        Ok(())
    }

    into_rows!(
        into_options => Options(OptionRow),
        into_correct_options => CorrectOptions(CorrectOptionRow),
        into_targets => Targets(TargetRow),
        into_pairs => Pairs(PairRow),
        into_dropdown_options => DropdownOptions(DropdownOptionRow),
        into_placeholders => Placeholders(PlaceholderRow),
        into_order_items => OrderItems(OrderItemRow),
        into_order_positions => OrderPositions(OrderPositionRow),
        into_yes_no_answers => YesNoAnswers(YesNoAnswerRow),
        into_statements => Statements(StatementRow),
        into_statement_answers => StatementAnswers(StatementAnswerRow),
    );
}
