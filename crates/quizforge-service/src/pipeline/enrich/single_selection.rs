use async_trait::async_trait;
use quizforge_core::{QuestionPayload, QuestionType};
use quizforge_storage::{QuizSource, StorageError, SupplementalTable};

use super::{EnrichStrategy, StrategyOutput, by_question, question_ids, selection_option};
use crate::pipeline::group::IndexedRow;

const TABLES: &[SupplementalTable] = &[
    SupplementalTable::SingleSelectionOptions,
    SupplementalTable::SingleSelectionCorrectAnswer,
];

/// Options plus the unique correct option id.
///
/// A question with several correct rows keeps the first.
pub struct SingleSelectionStrategy;

#[async_trait]
impl EnrichStrategy for SingleSelectionStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::SingleSelection
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
        let (options, correct) = tokio::join!(
            source.supplemental(SupplementalTable::SingleSelectionOptions, &ids),
            source.supplemental(SupplementalTable::SingleSelectionCorrectAnswer, &ids),
        );
        let mut options = by_question(options?.into_options()?);
        let mut correct = by_question(correct?.into_correct_options()?);

        Ok(StrategyOutput::build(rows, |row| {
            let options = options.remove(row.id()).unwrap_or_default();
            if options.is_empty() {
                return Err("no options");
            }
            let correct = correct
                .remove(row.id())
                .and_then(|rows| rows.into_iter().next())
                .ok_or("missing correct answer")?;
            Ok(QuestionPayload::SingleSelection {
                options: options.into_iter().map(selection_option).collect(),
                correct_answer_option_id: correct.option_id,
            })
        }))
    }
}
