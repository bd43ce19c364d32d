//! Batched reads against the per-type supplemental tables.
//!
//! Each call is a single `question_id = ANY($1::uuid[])` query; the result shape is
//! decided by the table, see [`SupplementalTable::empty_rows`].

use quizforge_storage::{
    CorrectOptionRow, DropdownOptionRow, OptionRow, OrderItemRow, OrderPositionRow, PairRow,
    PlaceholderRow, StatementAnswerRow, StatementRow, StorageError, SupplementalRows,
    SupplementalTable, TargetRow, YesNoAnswerRow,
};
use sqlx_core::from_row::FromRow;
use sqlx_core::query_as::query_as;
use sqlx_postgres::{PgPool, PgRow};

use crate::error::query_failed;

/// Column list selected from `table`, always starting with `question_id`.
fn columns(table: SupplementalTable) -> &'static str {
    use SupplementalTable::*;
    match table {
        SingleSelectionOptions | MultiOptions | DragAndDropOptions => {
            "question_id::text, option_id::text, text"
        }
        SingleSelectionCorrectAnswer | MultiCorrectAnswers => "question_id::text, option_id::text",
        DragAndDropTargets => "question_id::text, target_id::text, text",
        DragAndDropCorrectPairs => "question_id::text, option_id::text, target_id::text",
        DropdownSelectionOptions => "question_id::text, option_id::text, text, is_correct",
        DropdownSelectionTargets => "question_id::text, key, value",
        OrderItems => "question_id::text, item_id::text, text",
        OrderCorrectOrder => "question_id::text, item_id::text, position",
        YesNoAnswer => "question_id::text, correct_answer",
        YesNoMultiStatements => "question_id::text, statement_id::text, text",
        YesNoMultiCorrectAnswers => "question_id::text, statement_id::text, correct_answer",
    }
}

pub(crate) fn select_sql(table: SupplementalTable) -> String {
    format!(
        "SELECT {} FROM {} WHERE question_id = ANY($1::uuid[])",
        columns(table),
        table.table_name()
    )
}

async fn fetch<T>(
    pool: &PgPool,
    table: SupplementalTable,
    ids: &[String],
) -> Result<Vec<T>, StorageError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = select_sql(table);
    query_as::<_, T>(&sql)
        .bind(ids.to_vec())
        .fetch_all(pool)
        .await
        .map_err(|e| query_failed(table.table_name(), e))
}

/// Reads every row of `table` belonging to one of `ids`.
pub async fn rows(
    pool: &PgPool,
    table: SupplementalTable,
    ids: &[String],
) -> Result<SupplementalRows, StorageError> {
    use SupplementalTable::*;

    if ids.is_empty() {
        return Ok(table.empty_rows());
    }

    let rows = match table {
        SingleSelectionOptions | MultiOptions | DragAndDropOptions => SupplementalRows::Options(
            fetch::<(String, String, String)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, option_id, text)| OptionRow {
                    question_id,
                    option_id,
                    text,
                })
                .collect(),
        ),
        SingleSelectionCorrectAnswer | MultiCorrectAnswers => SupplementalRows::CorrectOptions(
            fetch::<(String, String)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, option_id)| CorrectOptionRow {
                    question_id,
                    option_id,
                })
                .collect(),
        ),
        DragAndDropTargets => SupplementalRows::Targets(
            fetch::<(String, String, String)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, target_id, text)| TargetRow {
                    question_id,
                    target_id,
                    text,
                })
                .collect(),
        ),
        DragAndDropCorrectPairs => SupplementalRows::Pairs(
            fetch::<(String, String, String)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, option_id, target_id)| PairRow {
                    question_id,
                    option_id,
                    target_id,
                })
                .collect(),
        ),
        DropdownSelectionOptions => SupplementalRows::DropdownOptions(
            fetch::<(String, String, String, bool)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, option_id, text, is_correct)| DropdownOptionRow {
                    question_id,
                    option_id,
                    text,
                    is_correct,
                })
                .collect(),
        ),
        DropdownSelectionTargets => SupplementalRows::Placeholders(
            fetch::<(String, String, String)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, key, value)| PlaceholderRow {
                    question_id,
                    key,
                    value,
                })
                .collect(),
        ),
        OrderItems => SupplementalRows::OrderItems(
            fetch::<(String, String, String)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, item_id, text)| OrderItemRow {
                    question_id,
                    item_id,
                    text,
                })
                .collect(),
        ),
        OrderCorrectOrder => SupplementalRows::OrderPositions(
            fetch::<(String, String, i32)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, item_id, position)| OrderPositionRow {
                    question_id,
                    item_id,
                    position,
                })
                .collect(),
        ),
        YesNoAnswer => SupplementalRows::YesNoAnswers(
            fetch::<(String, bool)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, correct_answer)| YesNoAnswerRow {
                    question_id,
                    correct_answer,
                })
                .collect(),
        ),
        YesNoMultiStatements => SupplementalRows::Statements(
            fetch::<(String, String, String)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, statement_id, text)| StatementRow {
                    question_id,
                    statement_id,
                    text,
                })
                .collect(),
        ),
        YesNoMultiCorrectAnswers => SupplementalRows::StatementAnswers(
            fetch::<(String, String, bool)>(pool, table, ids)
                .await?
                .into_iter()
                .map(|(question_id, statement_id, correct_answer)| StatementAnswerRow {
                    question_id,
                    statement_id,
                    correct_answer,
                })
                .collect(),
        ),
    };

    Ok(rows)
}
