use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::filter::TypeFilter;
use crate::question::QuestionRecord;
use crate::time::Timestamp;

/// Difficulty level shared by quizzes and questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(CoreError::unknown_difficulty(s)),
        }
    }
}

/// A row of the `quizzes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizMetadata {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topic: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QuizMetadata {
    /// Version watermark derived from `updated_at`.
    pub fn version(&self) -> String {
        self.updated_at.to_string()
    }
}

/// The fully denormalized quiz aggregate.
///
/// `questions` keeps the order in which the source returned the base rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topic: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub questions: Vec<QuestionRecord>,
}

impl Quiz {
    pub fn from_parts(metadata: QuizMetadata, questions: Vec<QuestionRecord>) -> Self {
        Self {
            id: metadata.id,
            title: metadata.title,
            description: metadata.description,
            topic: metadata.topic,
            difficulty: metadata.difficulty,
            quiz_type: metadata.quiz_type,
            author: metadata.author,
            settings: metadata.settings,
            created_at: metadata.created_at,
            updated_at: metadata.updated_at,
            questions,
        }
    }

    /// Quiz with metadata only, used as the first answer of a progressive load.
    pub fn stub(metadata: QuizMetadata) -> Self {
        Self::from_parts(metadata, Vec::new())
    }

    pub fn metadata(&self) -> QuizMetadata {
        QuizMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            topic: self.topic.clone(),
            difficulty: self.difficulty,
            quiz_type: self.quiz_type.clone(),
            author: self.author.clone(),
            settings: self.settings.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn version(&self) -> String {
        self.updated_at.to_string()
    }

    /// Returns a copy holding only the questions accepted by `filter`,
    /// preserving their relative order.
    pub fn filtered(&self, filter: TypeFilter) -> Quiz {
        if filter.is_all() {
            return self.clone();
        }
        let mut quiz = Quiz::stub(self.metadata());
        quiz.questions = self
            .questions
            .iter()
            .filter(|q| filter.matches(q.question_type()))
            .cloned()
            .collect();
        quiz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{QuestionBase, QuestionPayload, QuestionType};

    fn metadata() -> QuizMetadata {
        QuizMetadata {
            id: "aws-basics".to_string(),
            title: "AWS Basics".to_string(),
            description: None,
            topic: "aws-basics".to_string(),
            difficulty: Difficulty::Medium,
            quiz_type: None,
            author: Some("ops".to_string()),
            settings: None,
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            updated_at: "2024-02-01T08:30:00Z".parse().unwrap(),
        }
    }

    fn record(id: &str, payload: QuestionPayload) -> QuestionRecord {
        QuestionRecord::new(
            QuestionBase {
                id: id.to_string(),
                question: format!("question {id}"),
                points: 1,
                quiz_tag: "aws-basics".to_string(),
                difficulty: Difficulty::Easy,
                explanation: None,
                feedback_correct: None,
                feedback_incorrect: None,
                created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
                updated_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            },
            payload,
        )
    }

    #[test]
    fn difficulty_parsing_is_case_insensitive() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("impossible".parse::<Difficulty>().is_err());
    }

    #[test]
    fn version_is_rfc3339_updated_at() {
        let quiz = Quiz::stub(metadata());
        assert_eq!(quiz.version(), "2024-02-01T08:30:00Z");
        assert_eq!(quiz.metadata().version(), quiz.version());
    }

    #[test]
    fn filtered_keeps_matching_questions_in_order() {
        let mut quiz = Quiz::stub(metadata());
        quiz.questions = vec![
            record("a", QuestionPayload::YesNo { correct_answer: true }),
            record(
                "b",
                QuestionPayload::Order {
                    items: vec![],
                    correct_order: vec![],
                },
            ),
            record("c", QuestionPayload::YesNo { correct_answer: false }),
        ];

        let only_yes_no = quiz.filtered(TypeFilter::Only(QuestionType::YesNo));
        let ids: Vec<_> = only_yes_no.questions.iter().map(|q| q.id()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(only_yes_no.id, quiz.id);

        assert_eq!(quiz.filtered(TypeFilter::All), quiz);
    }
}
