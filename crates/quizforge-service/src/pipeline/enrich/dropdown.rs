use std::collections::BTreeMap;

use async_trait::async_trait;
use quizforge_core::{DropdownOption, PlaceholderTarget, QuestionPayload, QuestionType};
use quizforge_storage::{QuizSource, StorageError, SupplementalTable};

use super::{EnrichStrategy, StrategyOutput, by_question, question_ids};
use crate::pipeline::group::IndexedRow;

const TABLES: &[SupplementalTable] = &[
    SupplementalTable::DropdownSelectionOptions,
    SupplementalTable::DropdownSelectionTargets,
];

/// Options and the placeholder map `key -> {key, correctOptionText}`.
pub struct DropdownSelectionStrategy;

#[async_trait]
impl EnrichStrategy for DropdownSelectionStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::DropdownSelection
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
        let (options, targets) = tokio::join!(
            source.supplemental(SupplementalTable::DropdownSelectionOptions, &ids),
            source.supplemental(SupplementalTable::DropdownSelectionTargets, &ids),
        );
        let mut options = by_question(options?.into_dropdown_options()?);
        let mut targets = by_question(targets?.into_placeholders()?);

        Ok(StrategyOutput::build(rows, |row| {
            let options = options.remove(row.id()).unwrap_or_default();
            if options.is_empty() {
                return Err("no options");
            }
            let targets = targets.remove(row.id()).unwrap_or_default();
            if targets.is_empty() {
                return Err("no placeholder targets");
            }
            let placeholder_targets: BTreeMap<String, PlaceholderTarget> = targets
                .into_iter()
                .map(|t| {
                    (
                        t.key.clone(),
                        PlaceholderTarget {
                            key: t.key,
                            correct_option_text: t.value,
                        },
                    )
                })
                .collect();
            Ok(QuestionPayload::DropdownSelection {
                options: options
                    .into_iter()
                    .map(|o| DropdownOption {
                        option_id: o.option_id,
                        text: o.text,
                        is_correct: o.is_correct,
                    })
                    .collect(),
                placeholder_targets,
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
    async fn builds_placeholder_map() {
        let source = InMemoryQuizSource::new();
        QuizBuilder::new(&source, "q")
            .dropdown(
                "a",
                &[("1", "IAM", true), ("2", "KMS", false)],
                &[("blank1", "IAM"), ("blank2", "KMS")],
            )
            .dropdown("b", &[("1", "IAM", true)], &[])
            .install()
            .unwrap();

        let output = run_strategy(&DropdownSelectionStrategy, &source, "q").await;
        assert_eq!(ids(&output), vec!["a"]);
        let QuestionPayload::DropdownSelection {
            options,
            placeholder_targets,
        } = &output.records[0].record.payload
        else {
            panic!("expected dropdown payload");
        };
        assert!(options[0].is_correct && !options[1].is_correct);
        assert_eq!(placeholder_targets["blank2"].correct_option_text, "KMS");
        assert_eq!(output.dropped[0].reason, "no placeholder targets");
    }
}
