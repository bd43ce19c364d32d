use async_trait::async_trait;
use quizforge_core::{OrderItem, QuestionPayload, QuestionType};
use quizforge_storage::{QuizSource, StorageError, SupplementalTable};

use super::{EnrichStrategy, StrategyOutput, by_question, question_ids};
use crate::pipeline::group::IndexedRow;

const TABLES: &[SupplementalTable] = &[
    SupplementalTable::OrderItems,
    SupplementalTable::OrderCorrectOrder,
];

/// Items plus `correctOrder`, the item ids sorted by position.
pub struct OrderStrategy;

#[async_trait]
impl EnrichStrategy for OrderStrategy {
    fn question_type(&self) -> QuestionType {
        QuestionType::Order
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
        let (items, positions) = tokio::join!(
            source.supplemental(SupplementalTable::OrderItems, &ids),
            source.supplemental(SupplementalTable::OrderCorrectOrder, &ids),
        );
        let mut items = by_question(items?.into_order_items()?);
        let mut positions = by_question(positions?.into_order_positions()?);

        Ok(StrategyOutput::build(rows, |row| {
            let items = items.remove(row.id()).unwrap_or_default();
            if items.is_empty() {
                return Err("no items");
            }
            let mut positions = positions.remove(row.id()).unwrap_or_default();
            if positions.is_empty() {
                return Err("no correct order");
            }
            positions.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.item_id.cmp(&b.item_id)));
            Ok(QuestionPayload::Order {
                items: items
                    .into_iter()
                    .map(|i| OrderItem {
                        item_id: i.item_id,
                        text: i.text,
                    })
                    .collect(),
                correct_order: positions.into_iter().map(|p| p.item_id).collect(),
            })
        }))
    }
}
