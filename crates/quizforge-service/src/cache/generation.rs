use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Invalidation epochs shared by the read path and the [`super::Invalidator`].
///
/// A load captures the epoch of its quiz before running and only stores its
/// result if no clear happened in the meantime.
#[derive(Debug, Default)]
pub struct Generations {
    global: AtomicU64,
    per_quiz: DashMap<String, u64>,
}

/// Epoch of one quiz at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    global: u64,
    quiz: u64,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, quiz_id: &str) -> Generation {
        Generation {
            global: self.global.load(Ordering::SeqCst),
            quiz: self.per_quiz.get(quiz_id).map_or(0, |g| *g),
        }
    }

    /// Advances the epoch of `quiz_id`, or of every quiz when `None`.
    pub fn bump(&self, quiz_id: Option<&str>) {
        match quiz_id {
            Some(id) => *self.per_quiz.entry(id.to_string()).or_insert(0) += 1,
            None => {
                self.global.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub fn is_current(&self, quiz_id: &str, seen: Generation) -> bool {
        self.current(quiz_id) == seen
    }
}
