use quizforge_core::{QuestionRow, QuizMetadata, TypeFilter};
use quizforge_storage::QuizSource;

use crate::error::QuizError;

/// Loads quiz metadata and its base question rows concurrently.
///
/// Both queries run to completion. A metadata error takes precedence over a
/// rows error; absent metadata is `NotFound` even when rows exist. Rows are
/// post-filtered by `filter` so sources that ignore the type argument still
/// yield a correct result.
pub async fn fetch_base(
    source: &dyn QuizSource,
    quiz_id: &str,
    filter: TypeFilter,
) -> Result<(QuizMetadata, Vec<QuestionRow>), QuizError> {
    let (metadata, rows) = tokio::join!(
        source.quiz_metadata(quiz_id),
        source.base_questions(quiz_id, filter.question_type()),
    );
    let metadata = metadata?;
    let rows = rows?;
    let metadata = metadata.ok_or_else(|| QuizError::not_found(quiz_id))?;

    let rows = rows
        .into_iter()
        .filter(|row| filter.matches(row.question_type))
        .collect();
    Ok((metadata, rows))
}
