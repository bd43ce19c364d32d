//! Reads against the `questions` table.

use chrono::{DateTime, Utc};
use quizforge_core::{Difficulty, QuestionBase, QuestionRow, QuestionType};
use quizforge_storage::StorageError;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::warn;

use super::chrono_to_timestamp;
use crate::error::query_failed;

type BaseRow = (
    String,
    String,
    String,
    Option<i32>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const SELECT_BASE: &str = "SELECT id::text, type::text, question, points, quiz_tag, \
     difficulty::text, explanation, feedback_correct, feedback_incorrect, created_at, updated_at \
     FROM questions WHERE quiz_tag = $1";

pub async fn base_rows(
    pool: &PgPool,
    quiz_id: &str,
    question_type: Option<QuestionType>,
) -> Result<Vec<QuestionRow>, StorageError> {
    let result = match question_type {
        Some(t) => {
            let sql = format!("{SELECT_BASE} AND type::text = $2 ORDER BY id");
            query_as::<_, BaseRow>(&sql)
                .bind(quiz_id)
                .bind(t.as_str())
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!("{SELECT_BASE} ORDER BY id");
            query_as::<_, BaseRow>(&sql)
                .bind(quiz_id)
                .fetch_all(pool)
                .await
        }
    };
    let rows = result.map_err(|e| query_failed("questions", e))?;

    Ok(rows.into_iter().filter_map(into_question_row).collect())
}

fn into_question_row(row: BaseRow) -> Option<QuestionRow> {
    let (
        id,
        kind,
        question,
        points,
        quiz_tag,
        difficulty,
        explanation,
        feedback_correct,
        feedback_incorrect,
        created,
        updated,
    ) = row;

    let question_type = match kind.parse::<QuestionType>() {
        Ok(t) => t,
        Err(_) => {
            warn!(question_id = %id, question_type = %kind, "skipping question of unknown type");
            return None;
        }
    };

    let difficulty = difficulty
        .as_deref()
        .and_then(|d| d.parse::<Difficulty>().ok())
        .unwrap_or_default();

    Some(QuestionRow::new(
        question_type,
        QuestionBase {
            id,
            question,
            points: points.unwrap_or(1),
            quiz_tag,
            difficulty,
            explanation,
            feedback_correct,
            feedback_incorrect,
            created_at: chrono_to_timestamp(created),
            updated_at: chrono_to_timestamp(updated),
        },
    ))
}
