use async_trait::async_trait;
use quizforge_core::{QuestionRow, QuestionType, QuizMetadata, Timestamp};
use quizforge_storage::{QuizSource, StorageError, SupplementalRows, SupplementalTable};
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};

use crate::config::PostgresConfig;
use crate::error::Result;
use crate::pool::create_pool;
use crate::queries::{questions, quizzes, supplemental};

/// PostgreSQL-backed quiz source.
#[derive(Debug, Clone)]
pub struct PostgresQuizSource {
    pool: PgPool,
}

impl PostgresQuizSource {
    /// Connects a pool from `config`.
    pub async fn new(config: &PostgresConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl QuizSource for PostgresQuizSource {
    #[instrument(skip(self))]
    async fn quiz_metadata(
        &self,
        quiz_id: &str,
    ) -> std::result::Result<Option<QuizMetadata>, StorageError> {
        quizzes::metadata(&self.pool, quiz_id).await
    }

    #[instrument(skip(self))]
    async fn base_questions(
        &self,
        quiz_id: &str,
        question_type: Option<QuestionType>,
    ) -> std::result::Result<Vec<QuestionRow>, StorageError> {
        let rows = questions::base_rows(&self.pool, quiz_id, question_type).await?;
        debug!(count = rows.len(), "loaded base question rows");
        Ok(rows)
    }

    #[instrument(skip(self, question_ids), fields(table = %table, ids = question_ids.len()))]
    async fn supplemental(
        &self,
        table: SupplementalTable,
        question_ids: &[String],
    ) -> std::result::Result<SupplementalRows, StorageError> {
        supplemental::rows(&self.pool, table, question_ids).await
    }

    async fn quiz_version(
        &self,
        quiz_id: &str,
    ) -> std::result::Result<Option<Timestamp>, StorageError> {
        quizzes::version(&self.pool, quiz_id).await
    }

    async fn related_quiz_ids(
        &self,
        topic: &str,
        exclude_id: &str,
        limit: usize,
    ) -> std::result::Result<Vec<String>, StorageError> {
        quizzes::related(&self.pool, topic, exclude_id, limit).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
