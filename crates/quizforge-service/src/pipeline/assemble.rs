use quizforge_core::QuestionRecord;

use super::enrich::IndexedRecord;

/// Restores source order across enriched groups.
pub fn assemble(mut records: Vec<IndexedRecord>) -> Vec<QuestionRecord> {
    records.sort_by_key(|r| r.index);
    records.into_iter().map(|r| r.record).collect()
}
