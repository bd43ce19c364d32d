use async_trait::async_trait;
use quizforge_core::{QuestionPayload, QuestionType};
use quizforge_storage::{QuizSource, StorageError, SupplementalTable};

use super::{EnrichStrategy, StrategyOutput, by_question, question_ids};
use crate::pipeline::group::IndexedRow;

const TABLES: &[SupplementalTable] = &[SupplementalTable::YesNoAnswer];

pub struct YesNoStrategy;

#[async_trait]
impl EnrichStrategy for YesNoStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::YesNo
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
        let mut answers = by_question(
            source
                .supplemental(SupplementalTable::YesNoAnswer, &ids)
                .await?
                .into_yes_no_answers()?,
        );

        Ok(StrategyOutput::build(rows, |row| {
            let answer = answers
                .remove(row.id())
                .and_then(|rows| rows.into_iter().next())
                .ok_or("missing answer")?;
            Ok(QuestionPayload::YesNo {
                correct_answer: answer.correct_answer,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::enrich::test_support::{ids, run_strategy};
    use quizforge_db_memory::InMemoryQuizSource;
    use quizforge_db_memory::fixtures::QuizBuilder;

    #[tokio::test]
    async fn answer_row_is_required() {
        let source = InMemoryQuizSource::new();
        QuizBuilder::new(&source, "q")
            .yes_no("a", Some(false))
            .yes_no("b", None)
            .install()
            .unwrap();

        let output = run_strategy(&YesNoStrategy, &source, "q").await;
        assert_eq!(ids(&output), vec!["a"]);
        assert_eq!(
            output.records[0].record.payload,
            QuestionPayload::YesNo {
                correct_answer: false
            }
        );
        assert_eq!(output.dropped[0].question_id, "b");
    }
}
