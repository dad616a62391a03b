//! Planner history
//!
//! Accumulated per-account state the pipeline reads and extends: theme usage,
//! persona activity, subreddit posting records, and the most recent generated
//! weeks. History is an explicit value - loaded once per run, mutated in
//! memory, written back through the store at the end of a successful run.
//!
//! Invariant: weekly counters are derived from post dates falling inside the
//! target week and are recomputed at week rollover, never just decremented.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::calendar::CalendarWeek;
use crate::types::{in_week, Timestamp};

/// Number of past weeks retained in history
pub const MAX_RETAINED_WEEKS: usize = 12;

/// Usage record for one theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeUsage {
    pub theme_id: String,
    pub last_used: Timestamp,
    pub times_used: u32,
    /// Subreddits this theme has appeared in
    pub subreddits: Vec<String>,
}

/// Activity record for one persona
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaActivity {
    pub persona_id: String,
    #[serde(default)]
    pub last_post: Option<Timestamp>,
    #[serde(default)]
    pub last_comment: Option<Timestamp>,
    /// Recomputed from `post_dates` at week rollover
    pub posts_this_week: u32,
    pub post_dates: Vec<Timestamp>,
}

impl PersonaActivity {
    pub fn new(persona_id: impl Into<String>) -> Self {
        Self {
            persona_id: persona_id.into(),
            ..Default::default()
        }
    }

    /// Count of authored posts inside `[week_start, week_start + 7d)`
    pub fn posts_in_week(&self, week_start: NaiveDate) -> u32 {
        self.post_dates
            .iter()
            .filter(|ts| in_week(**ts, week_start))
            .count() as u32
    }
}

/// Posting record for one subreddit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubredditActivity {
    pub name: String,
    /// Recomputed from `post_dates` at week rollover
    pub posts_this_week: u32,
    pub post_dates: Vec<Timestamp>,
}

impl SubredditActivity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Count of posts inside `[week_start, week_start + 7d)`
    pub fn posts_in_week(&self, week_start: NaiveDate) -> u32 {
        self.post_dates
            .iter()
            .filter(|ts| in_week(**ts, week_start))
            .count() as u32
    }
}

/// Accumulated planner state for one account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerHistory {
    pub theme_usage: HashMap<String, ThemeUsage>,
    pub persona_activity: HashMap<String, PersonaActivity>,
    pub subreddit_posts: HashMap<String, SubredditActivity>,
    /// Most recent generated weeks, oldest first, capped at [`MAX_RETAINED_WEEKS`]
    pub generated_weeks: Vec<CalendarWeek>,
}

impl PlannerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every weekly counter against the target week
    pub fn roll_over(&mut self, week_start: NaiveDate) {
        for activity in self.persona_activity.values_mut() {
            activity.posts_this_week = activity
                .post_dates
                .iter()
                .filter(|ts| in_week(**ts, week_start))
                .count() as u32;
        }
        for activity in self.subreddit_posts.values_mut() {
            activity.posts_this_week = activity
                .post_dates
                .iter()
                .filter(|ts| in_week(**ts, week_start))
                .count() as u32;
        }
    }

    /// Record a freshly generated week: theme usage, persona activity,
    /// subreddit posts, and the week itself (trimmed to the retention cap).
    pub fn record_week(&mut self, week: &CalendarWeek) {
        for post in &week.posts {
            for theme_id in &post.theme_ids {
                let usage = self
                    .theme_usage
                    .entry(theme_id.clone())
                    .or_insert_with(|| ThemeUsage {
                        theme_id: theme_id.clone(),
                        last_used: post.scheduled_at,
                        times_used: 0,
                        subreddits: Vec::new(),
                    });
                usage.times_used += 1;
                usage.last_used = usage.last_used.max(post.scheduled_at);
                if !usage.subreddits.contains(&post.subreddit) {
                    usage.subreddits.push(post.subreddit.clone());
                }
            }

            let author = self
                .persona_activity
                .entry(post.author_id.clone())
                .or_insert_with(|| PersonaActivity::new(post.author_id.clone()));
            author.post_dates.push(post.scheduled_at);
            author.last_post = Some(match author.last_post {
                Some(prev) => prev.max(post.scheduled_at),
                None => post.scheduled_at,
            });
            author.posts_this_week = author.posts_in_week(week.week_start);

            for comment in &post.comments {
                let commenter = self
                    .persona_activity
                    .entry(comment.author_id.clone())
                    .or_insert_with(|| PersonaActivity::new(comment.author_id.clone()));
                commenter.last_comment = Some(match commenter.last_comment {
                    Some(prev) => prev.max(comment.scheduled_at),
                    None => comment.scheduled_at,
                });
            }

            let subreddit = self
                .subreddit_posts
                .entry(post.subreddit.clone())
                .or_insert_with(|| SubredditActivity::new(post.subreddit.clone()));
            subreddit.post_dates.push(post.scheduled_at);
            subreddit.posts_this_week = subreddit.posts_in_week(week.week_start);
        }

        self.generated_weeks.push(week.clone());
        self.generated_weeks
            .sort_by_key(|w| w.week_start);
        if self.generated_weeks.len() > MAX_RETAINED_WEEKS {
            let excess = self.generated_weeks.len() - MAX_RETAINED_WEEKS;
            self.generated_weeks.drain(..excess);
        }
    }

    /// Remove the week starting at `week_start`, unwinding its derived
    /// records. Used by regenerate before re-running the pipeline.
    pub fn remove_week(&mut self, week_start: NaiveDate) -> Option<CalendarWeek> {
        let index = self
            .generated_weeks
            .iter()
            .position(|w| w.week_start == week_start)?;
        let removed = self.generated_weeks.remove(index);

        for activity in self.persona_activity.values_mut() {
            activity.post_dates.retain(|ts| !in_week(*ts, week_start));
            activity.last_post = activity.post_dates.iter().max().copied();
            activity.posts_this_week = activity.posts_in_week(week_start);
        }
        for activity in self.subreddit_posts.values_mut() {
            activity.post_dates.retain(|ts| !in_week(*ts, week_start));
            activity.posts_this_week = activity.posts_in_week(week_start);
        }

        for post in &removed.posts {
            for theme_id in &post.theme_ids {
                // Latest use still present in retained weeks, in case the
                // removed week held the most recent one
                let fallback = self.latest_theme_use(theme_id);
                let drop = if let Some(usage) = self.theme_usage.get_mut(theme_id) {
                    usage.times_used = usage.times_used.saturating_sub(1);
                    if in_week(usage.last_used, week_start) {
                        if let Some(earlier) = fallback {
                            usage.last_used = earlier;
                        }
                    }
                    usage.times_used == 0
                } else {
                    false
                };
                if drop {
                    self.theme_usage.remove(theme_id);
                }
            }
        }

        Some(removed)
    }

    fn latest_theme_use(&self, theme_id: &str) -> Option<Timestamp> {
        self.generated_weeks
            .iter()
            .flat_map(|w| w.posts.iter())
            .filter(|p| p.theme_ids.iter().any(|t| t == theme_id))
            .map(|p| p.scheduled_at)
            .max()
    }

    /// Activity record for a persona, if any
    pub fn persona(&self, id: &str) -> Option<&PersonaActivity> {
        self.persona_activity.get(id)
    }

    /// Usage record for a theme, if any
    pub fn theme(&self, id: &str) -> Option<&ThemeUsage> {
        self.theme_usage.get(id)
    }

    /// Posting record for a subreddit, if any
    pub fn subreddit(&self, name: &str) -> Option<&SubredditActivity> {
        self.subreddit_posts.get(name)
    }

    /// The stored week starting at `week_start`, if any
    pub fn week_for(&self, week_start: NaiveDate) -> Option<&CalendarWeek> {
        self.generated_weeks
            .iter()
            .find(|w| w.week_start == week_start)
    }

    /// End date of the most recently recorded week
    pub fn last_week_end(&self) -> Option<NaiveDate> {
        self.generated_weeks.iter().map(|w| w.week_end).max()
    }
}
