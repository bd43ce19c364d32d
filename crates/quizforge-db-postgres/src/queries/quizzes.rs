//! Reads against the `quizzes` table.

use chrono::{DateTime, Utc};
use quizforge_core::{Difficulty, QuizMetadata, Timestamp};
use quizforge_storage::StorageError;
use serde_json::Value;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use tracing::warn;

use super::chrono_to_timestamp;
use crate::error::query_failed;

type MetadataRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<Value>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const SELECT_METADATA: &str = "SELECT id::text, title, description, quiz_topic, difficulty::text, \
     quiz_type, author, settings, created_at, updated_at FROM quizzes WHERE id = $1";

const SELECT_VERSION: &str = "SELECT updated_at FROM quizzes WHERE id = $1";

const SELECT_RELATED: &str = "SELECT id::text FROM quizzes \
     WHERE quiz_topic = $1 AND id <> $2 ORDER BY id LIMIT $3";

pub async fn metadata(pool: &PgPool, quiz_id: &str) -> Result<Option<QuizMetadata>, StorageError> {
    let row: Option<MetadataRow> = query_as(SELECT_METADATA)
        .bind(quiz_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| query_failed("quizzes", e))?;

    Ok(row.map(into_metadata))
}

fn into_metadata(row: MetadataRow) -> QuizMetadata {
    let (id, title, description, topic, difficulty, quiz_type, author, settings, created, updated) =
        row;

    let difficulty = match difficulty.as_deref().map(str::parse::<Difficulty>) {
        Some(Ok(d)) => d,
        Some(Err(e)) => {
            warn!(quiz_id = %id, error = %e, "unrecognised quiz difficulty, using default");
            Difficulty::default()
        }
        None => Difficulty::default(),
    };

    QuizMetadata {
        // quiz_topic is optional; quizzes without one are their own topic
        topic: topic.unwrap_or_else(|| id.clone()),
        id,
        title,
        description,
        difficulty,
        quiz_type,
        author,
        settings,
        created_at: chrono_to_timestamp(created),
        updated_at: chrono_to_timestamp(updated),
    }
}

/// Single-column probe for the version watermark.
pub async fn version(pool: &PgPool, quiz_id: &str) -> Result<Option<Timestamp>, StorageError> {
    let updated: Option<DateTime<Utc>> =
        query_scalar(SELECT_VERSION)
            .bind(quiz_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| query_failed("quizzes.updated_at", e))?;

    Ok(updated.map(chrono_to_timestamp))
}

pub async fn related(
    pool: &PgPool,
    topic: &str,
    exclude_id: &str,
    limit: usize,
) -> Result<Vec<String>, StorageError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    query_scalar(SELECT_RELATED)
    .bind(topic)
    .bind(exclude_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| query_failed("quizzes by topic", e))
}
