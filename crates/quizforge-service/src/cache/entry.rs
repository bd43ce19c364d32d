use quizforge_core::{Quiz, Timestamp, now_utc};
use serde::{Deserialize, Serialize};

use super::tier::CacheError;

/// A cached aggregate with the version watermark it was built at.
///
/// The entry is served without a reload only while `version` equals the
/// quiz's current `updated_at`, however much TTL remains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Quiz,
    pub stored_at: Timestamp,
    pub version: String,
}

impl CacheEntry {
    /// Wraps a freshly loaded aggregate, stamping it with its own version.
    pub fn new(data: Quiz) -> Self {
        let version = data.version();
        Self {
            data,
            stored_at: now_utc(),
            version,
        }
    }

    pub fn is_current(&self, latest_version: &str) -> bool {
        self.version == latest_version
    }

    /// MessagePack encoding with field names, used by the networked tier.
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        rmp_serde::to_vec_named(self).map_err(|e| CacheError::codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        rmp_serde::from_slice(bytes).map_err(|e| CacheError::codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizforge_core::{
        Difficulty, QuestionBase, QuestionPayload, QuestionRecord, QuizMetadata, SelectionOption,
    };

    fn quiz() -> Quiz {
        let ts: Timestamp = "2024-05-01T12:00:00Z".parse().unwrap();
        let meta = QuizMetadata {
            id: "aws-basics".into(),
            title: "AWS Basics".into(),
            description: None,
            topic: "aws".into(),
            difficulty: Difficulty::Easy,
            quiz_type: None,
            author: None,
            settings: Some(serde_json::json!({"shuffle": true})),
            created_at: ts,
            updated_at: ts,
        };
        let record = QuestionRecord::new(
            QuestionBase {
                id: "q1".into(),
                question: "Pick one".into(),
                points: 2,
                quiz_tag: "aws-basics".into(),
                difficulty: Difficulty::Hard,
                explanation: Some("Because".into()),
                feedback_correct: None,
                feedback_incorrect: None,
                created_at: ts,
                updated_at: ts,
            },
            QuestionPayload::MultiChoice {
                options: vec![SelectionOption {
                    option_id: "a".into(),
                    text: "Lambda".into(),
                }],
                correct_answer_option_ids: vec!["a".into()],
            },
        );
        Quiz::from_parts(meta, vec![record])
    }

    #[test]
    fn version_comes_from_updated_at() {
        let entry = CacheEntry::new(quiz());
        assert_eq!(entry.version, "2024-05-01T12:00:00Z");
        assert!(entry.is_current("2024-05-01T12:00:00Z"));
        assert!(!entry.is_current("2024-05-01T12:00:01Z"));
    }

    #[test]
    fn msgpack_codec_preserves_tagged_questions() {
        let entry = CacheEntry::new(quiz());
        let bytes = entry.encode().unwrap();
        let decoded = CacheEntry::decode(&bytes).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn garbage_is_a_codec_error() {
        let err = CacheEntry::decode(b"not msgpack at all").unwrap_err();
        assert!(matches!(err, CacheError::Codec { .. }));
    }
}
