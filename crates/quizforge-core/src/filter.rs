use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::question::QuestionType;

/// Restricts a quiz to one question type, or keeps every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(QuestionType),
}

impl TypeFilter {
    pub const ALL_SENTINEL: &'static str = "all";

    /// Normalizes user input: surrounding whitespace and case are ignored and
    /// an empty string means every type.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() || normalized == Self::ALL_SENTINEL {
            return Ok(TypeFilter::All);
        }
        normalized.parse::<QuestionType>().map(TypeFilter::Only)
    }

    pub fn from_option(question_type: Option<QuestionType>) -> Self {
        question_type.map_or(TypeFilter::All, TypeFilter::Only)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, TypeFilter::All)
    }

    pub fn question_type(&self) -> Option<QuestionType> {
        match self {
            TypeFilter::All => None,
            TypeFilter::Only(t) => Some(*t),
        }
    }

    pub fn matches(&self, question_type: QuestionType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(t) => *t == question_type,
        }
    }

    /// Segment used inside cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFilter::All => Self::ALL_SENTINEL,
            TypeFilter::Only(t) => t.as_str(),
        }
    }
}

impl From<QuestionType> for TypeFilter {
    fn from(value: QuestionType) -> Self {
        TypeFilter::Only(value)
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeFilter::parse(s)
    }
}

impl Serialize for TypeFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TypeFilter::parse(&s).map_err(serde::de::Error::custom)
    }
}
