//! Shared setup for the service integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use quizforge_core::QuestionRecord;
use quizforge_db_memory::InMemoryQuizSource;
use quizforge_db_memory::fixtures::{QuizBuilder, seed_sample_catalog};
use quizforge_service::QuizService;

/// A source seeded with the sample catalogue and a service over it with the
/// default local cache.
pub fn catalog_service() -> (Arc<InMemoryQuizSource>, QuizService) {
    let source = Arc::new(InMemoryQuizSource::new());
    seed_sample_catalog(&source).expect("seed sample catalog");
    let service = QuizService::builder(source.clone()).build();
    (source, service)
}

/// Quiz `q1`: two valid single-selection questions and one multi-choice
/// question with no correct answer rows.
pub fn install_q1(source: &InMemoryQuizSource) {
    QuizBuilder::new(source, "q1")
        .topic("storage")
        .single_selection("q1a", &[("a", "S3"), ("b", "EBS")], Some("a"))
        .single_selection("q1b", &[("a", "EFS"), ("b", "FSx")], Some("b"))
        .multi("q1c", &[("a", "Glacier"), ("b", "S3 IA")], &[])
        .install()
        .expect("install q1");
}

pub fn ids(questions: &[QuestionRecord]) -> Vec<&str> {
    questions.iter().map(QuestionRecord::id).collect()
}
