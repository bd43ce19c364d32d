use std::fmt;

use quizforge_core::{QuestionType, TypeFilter};

/// Prefix shared by every aggregate entry.
pub const NAMESPACE: &str = "quiz:";

const TYPE_SEGMENT: &str = ":type:";

/// Identifies one cached aggregate: a quiz under one type filter.
///
/// Rendered as `quiz:{quiz_id}:type:{filter}` where the filter is a question
/// type discriminant or `all`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    quiz_id: String,
    filter: TypeFilter,
}

impl CacheKey {
    pub fn new(quiz_id: impl Into<String>, filter: TypeFilter) -> Self {
        Self {
            quiz_id: quiz_id.into(),
            filter,
        }
    }

    /// Key of the full-set aggregate every filtered read can be served from.
    pub fn canonical(quiz_id: impl Into<String>) -> Self {
        Self::new(quiz_id, TypeFilter::All)
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn filter(&self) -> TypeFilter {
        self.filter
    }

    pub fn is_canonical(&self) -> bool {
        self.filter.is_all()
    }

    pub fn to_canonical(&self) -> CacheKey {
        Self::canonical(self.quiz_id.clone())
    }

    /// Every key a quiz can be cached under: `all` plus one per type.
    pub fn variants(quiz_id: &str) -> impl Iterator<Item = CacheKey> + '_ {
        std::iter::once(TypeFilter::All)
            .chain(QuestionType::ALL.into_iter().map(TypeFilter::Only))
            .map(move |filter| Self::new(quiz_id, filter))
    }

    /// Parses a rendered key back; `None` for foreign keys.
    pub fn parse(rendered: &str) -> Option<CacheKey> {
        let rest = rendered.strip_prefix(NAMESPACE)?;
        let (quiz_id, filter) = rest.rsplit_once(TYPE_SEGMENT)?;
        let filter = TypeFilter::parse(filter).ok()?;
        Some(Self::new(quiz_id, filter))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NAMESPACE}{}{TYPE_SEGMENT}{}", self.quiz_id, self.filter)
    }
}
