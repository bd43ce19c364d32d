use std::collections::HashMap;

use async_trait::async_trait;
use quizforge_core::{QuestionPayload, QuestionType, Statement};
use quizforge_storage::{QuizSource, StorageError, SupplementalTable};

use super::{EnrichStrategy, StrategyOutput, by_question, question_ids};
use crate::pipeline::group::IndexedRow;

const TABLES: &[SupplementalTable] = &[
    SupplementalTable::YesNoMultiStatements,
    SupplementalTable::YesNoMultiCorrectAnswers,
];

/// Statements sorted by id with `correctAnswers` aligned to them.
///
/// A statement without an answer row counts as `false`.
pub struct YesNoMultiStrategy;

#[async_trait]
impl EnrichStrategy for YesNoMultiStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::YesNoMulti
    }

    fn tables(&self) -> &'static [SupplementalTable] {
        TABLES
    }

    async fn enrich(
        &self,
        source: &dyn QuizSource,
        rows: Vec<IndexedRow>,
    ) -> Result<StrategyOutput, StorageError> {
        let ids = question_ids(&rows);
        let (statements, answers) = tokio::join!(
            source.supplemental(SupplementalTable::YesNoMultiStatements, &ids),
            source.supplemental(SupplementalTable::YesNoMultiCorrectAnswers, &ids),
        );
        let mut statements = by_question(statements?.into_statements()?);
        let mut answers = by_question(answers?.into_statement_answers()?);

        Ok(StrategyOutput::build(rows, |row| {
            let mut statements = statements.remove(row.id()).unwrap_or_default();
            if statements.is_empty() {
                return Err("no statements");
            }
            let answers: HashMap<String, bool> = answers
                .remove(row.id())
                .unwrap_or_default()
                .into_iter()
                .map(|a| (a.statement_id, a.correct_answer))
                .collect();
            if answers.is_empty() {
                return Err("no statement answers");
            }
            statements.sort_by(|a, b| a.statement_id.cmp(&b.statement_id));
            let correct_answers = statements
                .iter()
                .map(|s| answers.get(&s.statement_id).copied().unwrap_or(false))
                .collect();
            Ok(QuestionPayload::YesNoMulti {
                statements: statements
                    .into_iter()
                    .map(|s| Statement {
                        statement_id: s.statement_id,
                        text: s.text,
                    })
                    .collect(),
                correct_answers,
            })
        }))
    }
}
