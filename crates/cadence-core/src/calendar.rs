//! Calendar output model
//!
//! The persisted result of one generation run: a [`CalendarWeek`] with its
//! ordered [`PlannedPost`] entries and their comment threads. A week is
//! immutable once returned to the caller except for explicit regenerate or
//! delete operations; within the pipeline only the spreading step may shift
//! post times.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{prefixed_id, PostType, Timestamp};

/// One scored quality factor attached to a planned post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorScore {
    /// Factor name, e.g. `open_endedness`
    pub factor: String,
    /// Score 0-10
    pub score: f64,
    /// Weight this factor carried in the final blend
    pub weight: f64,
    #[serde(default)]
    pub detail: Option<String>,
}

/// A planned comment inside a post's thread.
///
/// `parent_id` is a same-list back-reference to a comment created strictly
/// earlier in generation order, so threads can never form cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedComment {
    pub id: String,
    pub author_id: String,
    /// Minutes after the post's scheduled time. This is the source of truth;
    /// `scheduled_at` is derived and recomputed whenever the post moves.
    pub delay_minutes: i64,
    pub seed_text: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub scheduled_at: Timestamp,
}

impl PlannedComment {
    pub fn new(author_id: impl Into<String>, delay_minutes: i64, post_time: Timestamp) -> Self {
        Self {
            id: prefixed_id("cmt"),
            author_id: author_id.into(),
            delay_minutes,
            seed_text: String::new(),
            parent_id: None,
            scheduled_at: post_time + Duration::minutes(delay_minutes),
        }
    }

    /// Make this comment a reply to `parent`
    pub fn reply_to(mut self, parent: &PlannedComment) -> Self {
        self.parent_id = Some(parent.id.clone());
        self
    }
}

/// A planned post occupying one accepted slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPost {
    pub id: String,
    /// Day-of-week label, kept in sync with `scheduled_at` by the scheduler
    pub day: Weekday,
    pub subreddit: String,
    pub author_id: String,
    pub title: String,
    pub body_preview: String,
    #[serde(default)]
    pub body: Option<String>,
    pub post_type: PostType,
    pub theme_ids: Vec<String>,
    pub comments: Vec<PlannedComment>,
    /// Final quality score, rounded to one decimal
    pub quality_score: f64,
    pub quality_factors: Vec<FactorScore>,
    pub scheduled_at: Timestamp,
}

impl PlannedPost {
    /// Move the post to a new time, updating the derived day label and every
    /// comment's absolute timestamp. Delay minutes are preserved.
    pub fn reschedule(&mut self, at: Timestamp) {
        self.scheduled_at = at;
        self.day = at.weekday();
        for comment in &mut self.comments {
            comment.scheduled_at = at + Duration::minutes(comment.delay_minutes);
        }
    }

    /// Ids of every persona participating in this post (author + commenters)
    pub fn participant_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = vec![self.author_id.as_str()];
        for comment in &self.comments {
            if !ids.contains(&comment.author_id.as_str()) {
                ids.push(comment.author_id.as_str());
            }
        }
        ids
    }

    /// Author of the comment `id` refers to, if it exists in this thread
    pub fn comment_author(&self, id: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.author_id.as_str())
    }
}

/// The complete, persisted output of one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarWeek {
    pub id: String,
    pub iso_week: u32,
    /// Always a Monday
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub posts: Vec<PlannedPost>,
    pub generated_at: Timestamp,
}

impl CalendarWeek {
    pub fn new(week_start: NaiveDate, posts: Vec<PlannedPost>, generated_at: Timestamp) -> Self {
        Self {
            id: prefixed_id("week"),
            iso_week: week_start.iso_week().week(),
            week_start,
            week_end: week_start + Duration::days(6),
            posts,
            generated_at,
        }
    }

    /// Export as a self-contained JSON document suitable for archival
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a week from its JSON export
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
