//! Builders for seeding an [`InMemoryQuizSource`] with quizzes.
//!
//! Row helpers take plain tuples so tests read close to the tables they
//! describe, e.g. `multi("q1c", &[("a", "S3"), ("b", "EBS")], &["a", "b"])`.

use quizforge_core::{
    Difficulty, QuestionBase, QuestionRow, QuestionType, QuizMetadata, Timestamp,
};
use quizforge_storage::{
    CorrectOptionRow, DropdownOptionRow, OptionRow, OrderItemRow, OrderPositionRow, PairRow,
    PlaceholderRow, StatementAnswerRow, StatementRow, StorageError, SupplementalRows,
    SupplementalTable, TargetRow, YesNoAnswerRow,
};
use time::macros::datetime;

use crate::source::InMemoryQuizSource;

/// Creation time used for every fixture row.
pub fn base_time() -> Timestamp {
    Timestamp(datetime!(2024-01-01 00:00 UTC))
}

pub fn quiz_metadata(quiz_id: &str, topic: &str) -> QuizMetadata {
    QuizMetadata {
        id: quiz_id.to_string(),
        title: format!("Quiz {quiz_id}"),
        description: Some(format!("Practice questions for {topic}")),
        topic: topic.to_string(),
        difficulty: Difficulty::Medium,
        quiz_type: None,
        author: Some("fixtures".to_string()),
        settings: None,
        created_at: base_time(),
        updated_at: base_time(),
    }
}

pub fn question_row(quiz_id: &str, question_id: &str, question_type: QuestionType) -> QuestionRow {
    QuestionRow::new(
        question_type,
        QuestionBase {
            id: question_id.to_string(),
            question: format!("{question_type} question {question_id}"),
            points: 1,
            quiz_tag: quiz_id.to_string(),
            difficulty: Difficulty::Medium,
            explanation: Some(format!("Explanation for {question_id}")),
            feedback_correct: None,
            feedback_incorrect: None,
            created_at: base_time(),
            updated_at: base_time(),
        },
    )
}

fn s(value: &str) -> String {
    value.to_string()
}

/// Accumulates one quiz and its rows, then writes them into a source.
pub struct QuizBuilder<'a> {
    source: &'a InMemoryQuizSource,
    metadata: QuizMetadata,
    rows: Vec<QuestionRow>,
    supplemental: Vec<(SupplementalTable, SupplementalRows)>,
}

impl<'a> QuizBuilder<'a> {
    pub fn new(source: &'a InMemoryQuizSource, quiz_id: &str) -> Self {
        Self {
            source,
            metadata: quiz_metadata(quiz_id, quiz_id),
            rows: Vec::new(),
            supplemental: Vec::new(),
        }
    }

    pub fn topic(mut self, topic: &str) -> Self {
        self.metadata.topic = topic.to_string();
        self
    }

    pub fn updated_at(mut self, updated_at: Timestamp) -> Self {
        self.metadata.updated_at = updated_at;
        self
    }

    fn question(&mut self, question_id: &str, question_type: QuestionType) {
        self.rows
            .push(question_row(&self.metadata.id, question_id, question_type));
    }

    fn rows(&mut self, table: SupplementalTable, rows: SupplementalRows) {
        if !rows.is_empty() {
            self.supplemental.push((table, rows));
        }
    }

    fn options(question_id: &str, options: &[(&str, &str)]) -> SupplementalRows {
        SupplementalRows::Options(
            options
                .iter()
                .map(|(option_id, text)| OptionRow {
                    question_id: s(question_id),
                    option_id: s(option_id),
                    text: s(text),
                })
                .collect(),
        )
    }

    fn correct(question_id: &str, option_ids: &[&str]) -> SupplementalRows {
        SupplementalRows::CorrectOptions(
            option_ids
                .iter()
                .map(|option_id| CorrectOptionRow {
                    question_id: s(question_id),
                    option_id: s(option_id),
                })
                .collect(),
        )
    }

    pub fn single_selection(
        mut self,
        question_id: &str,
        options: &[(&str, &str)],
        correct: Option<&str>,
    ) -> Self {
        self.question(question_id, QuestionType::SingleSelection);
        self.rows(
            SupplementalTable::SingleSelectionOptions,
            Self::options(question_id, options),
        );
        let correct: Vec<&str> = correct.into_iter().collect();
        self.rows(
            SupplementalTable::SingleSelectionCorrectAnswer,
            Self::correct(question_id, &correct),
        );
        self
    }

    pub fn multi(mut self, question_id: &str, options: &[(&str, &str)], correct: &[&str]) -> Self {
        self.question(question_id, QuestionType::MultiChoice);
        self.rows(
            SupplementalTable::MultiOptions,
            Self::options(question_id, options),
        );
        self.rows(
            SupplementalTable::MultiCorrectAnswers,
            Self::correct(question_id, correct),
        );
        self
    }

    pub fn drag_and_drop(
        mut self,
        question_id: &str,
        targets: &[(&str, &str)],
        options: &[(&str, &str)],
        pairs: &[(&str, &str)],
    ) -> Self {
        self.question(question_id, QuestionType::DragAndDrop);
        self.rows(
            SupplementalTable::DragAndDropTargets,
            SupplementalRows::Targets(
                targets
                    .iter()
                    .map(|(target_id, text)| TargetRow {
                        question_id: s(question_id),
                        target_id: s(target_id),
                        text: s(text),
                    })
                    .collect(),
            ),
        );
        self.rows(
            SupplementalTable::DragAndDropOptions,
            Self::options(question_id, options),
        );
        self.rows(
            SupplementalTable::DragAndDropCorrectPairs,
            SupplementalRows::Pairs(
                pairs
                    .iter()
                    .map(|(option_id, target_id)| PairRow {
                        question_id: s(question_id),
                        option_id: s(option_id),
                        target_id: s(target_id),
                    })
                    .collect(),
            ),
        );
        self
    }

    pub fn dropdown(
        mut self,
        question_id: &str,
        options: &[(&str, &str, bool)],
        targets: &[(&str, &str)],
    ) -> Self {
        self.question(question_id, QuestionType::DropdownSelection);
        self.rows(
            SupplementalTable::DropdownSelectionOptions,
            SupplementalRows::DropdownOptions(
                options
                    .iter()
                    .map(|(option_id, text, is_correct)| DropdownOptionRow {
                        question_id: s(question_id),
                        option_id: s(option_id),
                        text: s(text),
                        is_correct: *is_correct,
                    })
                    .collect(),
            ),
        );
        self.rows(
            SupplementalTable::DropdownSelectionTargets,
            SupplementalRows::Placeholders(
                targets
                    .iter()
                    .map(|(key, value)| PlaceholderRow {
                        question_id: s(question_id),
                        key: s(key),
                        value: s(value),
                    })
                    .collect(),
            ),
        );
        self
    }

    pub fn order(
        mut self,
        question_id: &str,
        items: &[(&str, &str)],
        positions: &[(&str, i32)],
    ) -> Self {
        self.question(question_id, QuestionType::Order);
        self.rows(
            SupplementalTable::OrderItems,
            SupplementalRows::OrderItems(
                items
                    .iter()
                    .map(|(item_id, text)| OrderItemRow {
                        question_id: s(question_id),
                        item_id: s(item_id),
                        text: s(text),
                    })
                    .collect(),
            ),
        );
        self.rows(
            SupplementalTable::OrderCorrectOrder,
            SupplementalRows::OrderPositions(
                positions
                    .iter()
                    .map(|(item_id, position)| OrderPositionRow {
                        question_id: s(question_id),
                        item_id: s(item_id),
                        position: *position,
                    })
                    .collect(),
            ),
        );
        self
    }

    pub fn yes_no(mut self, question_id: &str, answer: Option<bool>) -> Self {
        self.question(question_id, QuestionType::YesNo);
        self.rows(
            SupplementalTable::YesNoAnswer,
            SupplementalRows::YesNoAnswers(
                answer
                    .into_iter()
                    .map(|correct_answer| YesNoAnswerRow {
                        question_id: s(question_id),
                        correct_answer,
                    })
                    .collect(),
            ),
        );
        self
    }

    pub fn yes_no_multi(
        mut self,
        question_id: &str,
        statements: &[(&str, &str)],
        answers: &[(&str, bool)],
    ) -> Self {
        self.question(question_id, QuestionType::YesNoMulti);
        self.rows(
            SupplementalTable::YesNoMultiStatements,
            SupplementalRows::Statements(
                statements
                    .iter()
                    .map(|(statement_id, text)| StatementRow {
                        question_id: s(question_id),
                        statement_id: s(statement_id),
                        text: s(text),
                    })
                    .collect(),
            ),
        );
        self.rows(
            SupplementalTable::YesNoMultiCorrectAnswers,
            SupplementalRows::StatementAnswers(
                answers
                    .iter()
                    .map(|(statement_id, correct_answer)| StatementAnswerRow {
                        question_id: s(question_id),
                        statement_id: s(statement_id),
                        correct_answer: *correct_answer,
                    })
                    .collect(),
            ),
        );
        self
    }

    /// Writes the quiz, its rows and supplemental data into the source.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidData` if supplemental rows do not fit
    /// their table.
    pub fn install(self) -> Result<QuizMetadata, StorageError> {
        for (table, rows) in self.supplemental {
            self.source.insert_rows(table, rows)?;
        }
        for row in self.rows {
            self.source.insert_question(row);
        }
        self.source.insert_quiz(self.metadata.clone());
        Ok(self.metadata)
    }
}

/// Seeds a small catalogue: `aws-basics` with one valid question of every
/// type, `aws-advanced` on the same topic, and `gcp-basics` on another.
///
/// # Errors
///
/// Propagates [`QuizBuilder::install`] errors.
pub fn seed_sample_catalog(source: &InMemoryQuizSource) -> Result<(), StorageError> {
    QuizBuilder::new(source, "aws-basics")
        .topic("aws")
        .single_selection(
            "q01",
            &[("a", "Amazon S3"), ("b", "Amazon EC2"), ("c", "Amazon RDS")],
            Some("a"),
        )
        .multi(
            "q02",
            &[("a", "Lambda"), ("b", "Fargate"), ("c", "Glacier")],
            &["a", "b"],
        )
        .drag_and_drop(
            "q03",
            &[("t1", "Object storage"), ("t2", "Block storage")],
            &[("o1", "S3"), ("o2", "EBS")],
            &[("o1", "t1"), ("o2", "t2")],
        )
        .dropdown(
            "q04",
            &[("o1", "IAM", true), ("o2", "KMS", false)],
            &[("blank1", "IAM")],
        )
        .order(
            "q05",
            &[("i1", "Create bucket"), ("i2", "Upload object"), ("i3", "Set policy")],
            &[("i2", 2), ("i1", 1), ("i3", 3)],
        )
        .yes_no("q06", Some(true))
        .yes_no_multi(
            "q07",
            &[("s2", "S3 is regional"), ("s1", "IAM is global")],
            &[("s1", true), ("s2", true)],
        )
        .install()?;

    QuizBuilder::new(source, "aws-advanced")
        .topic("aws")
        .yes_no("adv01", Some(false))
        .install()?;

    QuizBuilder::new(source, "gcp-basics")
        .topic("gcp")
        .yes_no("gcp01", Some(true))
        .install()?;

    Ok(())
}
