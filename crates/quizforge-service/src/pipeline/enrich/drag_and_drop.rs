use async_trait::async_trait;
use quizforge_core::{CorrectPair, DragTarget, QuestionPayload, QuestionType};
use quizforge_storage::{QuizSource, StorageError, SupplementalTable};

use super::{EnrichStrategy, StrategyOutput, by_question, question_ids, selection_option};
use crate::pipeline::group::IndexedRow;

const TABLES: &[SupplementalTable] = &[
    SupplementalTable::DragAndDropTargets,
    SupplementalTable::DragAndDropOptions,
    SupplementalTable::DragAndDropCorrectPairs,
];

/// Targets, draggable options and the correct option-to-target pairs.
pub struct DragAndDropStrategy;

#[async_trait]
impl EnrichStrategy for DragAndDropStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::DragAndDrop
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
        let (targets, options, pairs) = tokio::join!(
            source.supplemental(SupplementalTable::DragAndDropTargets, &ids),
            source.supplemental(SupplementalTable::DragAndDropOptions, &ids),
            source.supplemental(SupplementalTable::DragAndDropCorrectPairs, &ids),
        );
        let mut targets = by_question(targets?.into_targets()?);
        let mut options = by_question(options?.into_options()?);
        let mut pairs = by_question(pairs?.into_pairs()?);

        Ok(StrategyOutput::build(rows, |row| {
            let targets = targets.remove(row.id()).unwrap_or_default();
            let options = options.remove(row.id()).unwrap_or_default();
            let pairs = pairs.remove(row.id()).unwrap_or_default();
            if targets.is_empty() {
                return Err("no targets");
            }
            if options.is_empty() {
                return Err("no options");
            }
            if pairs.is_empty() {
                return Err("no correct pairs");
            }
            Ok(QuestionPayload::DragAndDrop {
                targets: targets
                    .into_iter()
                    .map(|t| DragTarget {
                        target_id: t.target_id,
                        text: t.text,
                    })
                    .collect(),
                options: options.into_iter().map(selection_option).collect(),
                correct_pairs: pairs
                    .into_iter()
                    .map(|p| CorrectPair {
                        option_id: p.option_id,
                        target_id: p.target_id,
                    })
                    .collect(),
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
    async fn requires_all_three_tables() {
        let source = InMemoryQuizSource::new();
        QuizBuilder::new(&source, "q")
            .drag_and_drop("a", &[("t1", "Compute")], &[("o1", "EC2")], &[("o1", "t1")])
            .drag_and_drop("b", &[("t1", "Compute")], &[("o1", "EC2")], &[])
            .install()
            .unwrap();

        let output = run_strategy(&DragAndDropStrategy, &source, "q").await;
        assert_eq!(ids(&output), vec!["a"]);
        let QuestionPayload::DragAndDrop { correct_pairs, .. } = &output.records[0].record.payload
        else {
            panic!("expected drag and drop payload");
        };
        assert_eq!(
            correct_pairs,
            &vec![CorrectPair {
                option_id: "o1".into(),
                target_id: "t1".into()
            }]
        );
        assert_eq!(output.dropped[0].reason, "no correct pairs");
    }
}
