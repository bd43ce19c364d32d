//! Batch enrichment of base rows into typed question records.
//!
//! Every question type has an [`EnrichStrategy`] that reads its supplemental
//! tables with one `question_id IN (...)` query per table and joins the rows
//! back in memory. Strategies are looked up in a [`StrategyRegistry`]; groups
//! run concurrently and all of them finish before assembly.

mod drag_and_drop;
mod dropdown;
mod multi_choice;
mod ordering;
mod single_selection;
mod yes_no;
mod yes_no_multi;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use quizforge_core::{
    QuestionPayload, QuestionRecord, QuestionRow, QuestionType, SelectionOption,
};
use quizforge_storage::{OptionRow, QuizSource, StorageError, SupplementalRow, SupplementalTable};

use super::group::{IndexedRow, TypeGroups, group_by_type};

pub use drag_and_drop::DragAndDropStrategy;
pub use dropdown::DropdownSelectionStrategy;
pub use multi_choice::MultiChoiceStrategy;
pub use ordering::OrderStrategy;
pub use single_selection::SingleSelectionStrategy;
pub use yes_no::YesNoStrategy;
pub use yes_no_multi::YesNoMultiStrategy;

/// An enriched record tagged with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub index: usize,
    pub record: QuestionRecord,
}

/// A base row left out because required supplemental data was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    pub question_id: String,
    pub question_type: QuestionType,
    pub reason: &'static str,
}

#[derive(Debug, Default)]
pub struct StrategyOutput {
    pub records: Vec<IndexedRecord>,
    pub dropped: Vec<DroppedRow>,
}

impl StrategyOutput {
    /// Builds each row's payload with `payload`, dropping rows it rejects.
    pub fn build<F>(rows: Vec<IndexedRow>, mut payload: F) -> Self
    where
        F: FnMut(&QuestionRow) -> Result<QuestionPayload, &'static str>,
    {
        let mut output = Self::default();
        for IndexedRow { index, row } in rows {
            match payload(&row) {
                Ok(payload) => output.records.push(IndexedRecord {
                    index,
                    record: QuestionRecord::new(row.base, payload),
                }),
                Err(reason) => output.dropped.push(DroppedRow {
                    question_id: row.base.id,
                    question_type: row.question_type,
                    reason,
                }),
            }
        }
        output
    }

    fn absorb(&mut self, other: StrategyOutput) {
        self.records.extend(other.records);
        self.dropped.extend(other.dropped);
    }
}

/// Turns one type group of base rows into question records.
#[async_trait]
pub trait EnrichStrategy: Send + Sync {
    fn question_type(&self) -> QuestionType;

    /// Supplemental tables read, each exactly once per call.
    fn tables(&self) -> &'static [SupplementalTable];

    /// Enriches `rows`, all of which carry [`Self::question_type`].
    ///
    /// # Errors
    ///
    /// Returns the first failing supplemental query.
    async fn enrich(
        &self,
        source: &dyn QuizSource,
        rows: Vec<IndexedRow>,
    ) -> Result<StrategyOutput, StorageError>;
}

/// Strategy lookup keyed by discriminant.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<QuestionType, Arc<dyn EnrichStrategy>>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registry with a strategy for every [`QuestionType`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(SingleSelectionStrategy);
        registry.register(MultiChoiceStrategy);
        registry.register(DragAndDropStrategy);
        registry.register(DropdownSelectionStrategy);
        registry.register(OrderStrategy);
        registry.register(YesNoStrategy);
        registry.register(YesNoMultiStrategy);
        registry
    }

    /// Registers `strategy`, returning the one it replaces.
    pub fn register(
        &mut self,
        strategy: impl EnrichStrategy + 'static,
    ) -> Option<Arc<dyn EnrichStrategy>> {
        self.strategies
            .insert(strategy.question_type(), Arc::new(strategy))
    }

    pub fn get(&self, question_type: QuestionType) -> Option<&Arc<dyn EnrichStrategy>> {
        self.strategies.get(&question_type)
    }

    pub fn question_types(&self) -> Vec<QuestionType> {
        self.strategies.keys().copied().collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Enriches every group concurrently.
///
/// `on_group_done` is called with the group's type and row count as each
/// group completes. Every started group runs to completion; if any failed,
/// the first failure in completion order is returned and the other results
/// are discarded.
pub async fn enrich_groups(
    registry: &StrategyRegistry,
    source: &dyn QuizSource,
    groups: TypeGroups,
    mut on_group_done: impl FnMut(QuestionType, usize),
) -> Result<StrategyOutput, StorageError> {
    let mut output = StrategyOutput::default();
    let mut pending = FuturesUnordered::new();

    for (question_type, rows) in groups {
        let count = rows.len();
        let Some(strategy) = registry.get(question_type).cloned() else {
            output
                .dropped
                .extend(rows.into_iter().map(|indexed| DroppedRow {
                    question_id: indexed.row.base.id,
                    question_type,
                    reason: "no enrichment strategy registered",
                }));
            on_group_done(question_type, count);
            continue;
        };
        pending.push(async move { (question_type, count, strategy.enrich(source, rows).await) });
    }

    let mut first_error = None;
    while let Some((question_type, count, result)) = pending.next().await {
        match result {
            Ok(group) => output.absorb(group),
            Err(e) => {
                tracing::warn!(question_type = %question_type, error = %e, "enrichment group failed");
                first_error.get_or_insert(e);
            }
        }
        on_group_done(question_type, count);
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(output),
    }
}

/// Enriches a single row through the same strategy used for batches.
pub async fn enrich_one(
    registry: &StrategyRegistry,
    source: &dyn QuizSource,
    row: QuestionRow,
) -> Result<Option<QuestionRecord>, StorageError> {
    let output = enrich_groups(registry, source, group_by_type(vec![row]), |_, _| {}).await?;
    Ok(output.records.into_iter().next().map(|r| r.record))
}

pub(crate) fn question_ids(rows: &[IndexedRow]) -> Vec<String> {
    rows.iter().map(|r| r.id().to_string()).collect()
}

/// Buckets supplemental rows by question id, keeping row order.
pub(crate) fn by_question<T: SupplementalRow>(rows: Vec<T>) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.question_id().to_string())
            .or_default()
            .push(row);
    }
    grouped
}

pub(crate) fn selection_option(row: OptionRow) -> SelectionOption {
    SelectionOption {
        option_id: row.option_id,
        text: row.text,
    }
}
