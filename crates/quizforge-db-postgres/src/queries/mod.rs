//! SQL for the quiz source, one module per table family.

pub mod questions;
pub mod quizzes;
pub mod supplemental;

use chrono::{DateTime, Utc};
use quizforge_core::Timestamp;
use time::OffsetDateTime;

/// Converts chrono DateTime to the core timestamp type.
pub(crate) fn chrono_to_timestamp(dt: DateTime<Utc>) -> Timestamp {
    let seconds = OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    Timestamp(seconds + time::Duration::nanoseconds(i64::from(dt.timestamp_subsec_nanos())))
}
