use std::collections::BTreeMap;

use quizforge_core::{QuestionRow, QuestionType};

/// A base row tagged with its position in the source result.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRow {
    pub index: usize,
    pub row: QuestionRow,
}

impl IndexedRow {
    pub fn id(&self) -> &str {
        self.row.id()
    }
}

/// Rows partitioned by discriminant; each group keeps source order.
pub type TypeGroups = BTreeMap<QuestionType, Vec<IndexedRow>>;

pub fn group_by_type(rows: Vec<QuestionRow>) -> TypeGroups {
    let mut groups = TypeGroups::new();
    for (index, row) in rows.into_iter().enumerate() {
        groups
            .entry(row.question_type)
            .or_default()
            .push(IndexedRow { index, row });
    }
    groups
}
