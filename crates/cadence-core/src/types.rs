//! Core types for Cadence
//!
//! Shared primitives used across the planning pipeline:
//! - Timestamps and week arithmetic
//! - Post types
//! - Violation severities
//! - Prefixed entity ids

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type alias
pub type Timestamp = DateTime<Utc>;

/// Severity of a guardrail violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Hard rule - blocks acceptance
    Error,
    /// Soft rule - surfaced but non-blocking
    Warning,
}

impl Severity {
    pub fn is_blocking(self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Kind of post planned for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Question,
    Story,
    Comparison,
    Education,
    #[serde(rename = "case-study")]
    CaseStudy,
    Discussion,
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PostType::Question => "question",
            PostType::Story => "story",
            PostType::Comparison => "comparison",
            PostType::Education => "education",
            PostType::CaseStudy => "case-study",
            PostType::Discussion => "discussion",
        };
        write!(f, "{}", name)
    }
}

/// Generate a prefixed unique id, e.g. `post_6f9c...`
pub fn prefixed_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4())
}

/// The Monday that starts the week containing `date`
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(offset)
}

/// The next Monday strictly after `date` (or `date` itself if it is a Monday)
pub fn next_monday(date: NaiveDate) -> NaiveDate {
    if date.weekday() == Weekday::Mon {
        date
    } else {
        week_start_of(date) + Duration::days(7)
    }
}

/// Start-of-day UTC timestamp for a calendar date
pub fn day_start(date: NaiveDate) -> Timestamp {
    DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0).expect("midnight is always valid"),
        Utc,
    )
}

/// True if `ts` falls within `[week_start, week_start + 7d)`
pub fn in_week(ts: Timestamp, week_start: NaiveDate) -> bool {
    let start = day_start(week_start);
    let end = start + Duration::days(7);
    ts >= start && ts < end
}
