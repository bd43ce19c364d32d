use async_trait::async_trait;
use quizforge_core::{QuestionPayload, QuestionType};
use quizforge_storage::{QuizSource, StorageError, SupplementalTable};

use super::{EnrichStrategy, StrategyOutput, by_question, question_ids, selection_option};
use crate::pipeline::group::IndexedRow;

const TABLES: &[SupplementalTable] = &[
    SupplementalTable::MultiOptions,
    SupplementalTable::MultiCorrectAnswers,
];

pub struct MultiChoiceStrategy;

#[async_trait]
impl EnrichStrategy for MultiChoiceStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::MultiChoice
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
            source.supplemental(SupplementalTable::MultiOptions, &ids),
            source.supplemental(SupplementalTable::MultiCorrectAnswers, &ids),
        );
        let mut options = by_question(options?.into_options()?);
        let mut correct = by_question(correct?.into_correct_options()?);

        Ok(StrategyOutput::build(rows, |row| {
            let options = options.remove(row.id()).unwrap_or_default();
            if options.is_empty() {
                return Err("no options");
            }
            let correct = correct.remove(row.id()).unwrap_or_default();
            if correct.is_empty() {
                return Err("no correct answers");
            }
            Ok(QuestionPayload::MultiChoice {
                options: options.into_iter().map(selection_option).collect(),
                correct_answer_option_ids: correct.into_iter().map(|c| c.option_id).collect(),
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
    async fn collects_every_correct_id() {
        let source = InMemoryQuizSource::new();
        QuizBuilder::new(&source, "q")
            .multi("a", &[("1", "S3"), ("2", "EBS"), ("3", "EFS")], &["1", "3"])
            .multi("b", &[("1", "S3")], &[])
            .install()
            .unwrap();

        let output = run_strategy(&MultiChoiceStrategy, &source, "q").await;
        assert_eq!(ids(&output), vec!["a"]);
        let QuestionPayload::MultiChoice {
            correct_answer_option_ids,
            ..
        } = &output.records[0].record.payload
        else {
            panic!("expected multi payload");
        };
        assert_eq!(correct_answer_option_ids, &vec!["1".to_string(), "3".to_string()]);
        assert_eq!(output.dropped[0].reason, "no correct answers");
    }
}
