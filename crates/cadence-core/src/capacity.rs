//! Capacity calculation
//!
//! Derives how many posting slots exist for the target week and which
//! subreddits and personas are still eligible, using the guardrail constants
//! for the 48-hour day blocking.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::guardrails::MIN_HOURS_BETWEEN_PERSONA_POSTS;
use crate::history::PlannerHistory;
use crate::model::PlannerInput;
use crate::types::{in_week, Timestamp};

/// Which resource bounds the week's slot count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityConstraint {
    /// The request itself is the binding constraint
    Requested,
    /// Subreddit weekly caps bind first
    Subreddits,
    /// Persona quotas bind first
    Personas,
}

impl fmt::Display for CapacityConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityConstraint::Requested => write!(f, "requested post count"),
            CapacityConstraint::Subreddits => write!(f, "subreddit capacity"),
            CapacityConstraint::Personas => write!(f, "persona capacity"),
        }
    }
}

/// Per-persona availability for the target week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaAvailability {
    pub persona_id: String,
    /// `max(0, max_posts_per_week - posts recorded this week)`
    pub remaining_quota: u32,
    /// Week days not blocked by the 48-hour rule (post day + following day)
    pub available_days: Vec<NaiveDate>,
    /// Most recent post + 48h, if the persona has posted
    pub blocked_until: Option<Timestamp>,
}

/// Computed capacity for one week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekCapacity {
    pub total_slots: u32,
    /// Subreddits still under their weekly cap
    pub open_subreddits: Vec<String>,
    pub personas: Vec<PersonaAvailability>,
    /// Diagnostic: which resource produced `total_slots`
    pub binding: CapacityConstraint,
}

impl WeekCapacity {
    /// Availability entry for a persona
    pub fn persona(&self, id: &str) -> Option<&PersonaAvailability> {
        self.personas.iter().find(|p| p.persona_id == id)
    }
}

/// Derives weekly slot capacity from input and history
#[derive(Debug)]
pub struct CapacityCalculator;

impl CapacityCalculator {
    /// Compute capacity for the week starting at `week_start`.
    ///
    /// Zero slots is a valid, expected terminal outcome, not an error.
    pub fn compute(
        input: &PlannerInput,
        history: &PlannerHistory,
        week_start: NaiveDate,
    ) -> WeekCapacity {
        let open_subreddits: Vec<String> = input
            .subreddits
            .iter()
            .filter(|s| {
                let posted = history
                    .subreddit(&s.name)
                    .map(|a| a.posts_in_week(week_start))
                    .unwrap_or(0);
                posted < s.max_posts_per_week
            })
            .map(|s| s.name.clone())
            .collect();

        let personas: Vec<PersonaAvailability> = input
            .personas
            .iter()
            .map(|persona| {
                let activity = history.persona(&persona.id);

                let posted = activity
                    .map(|a| a.posts_in_week(week_start))
                    .unwrap_or(0);
                let remaining_quota = persona.max_posts_per_week.saturating_sub(posted);

                let blocked_days: Vec<NaiveDate> = activity
                    .map(|a| {
                        a.post_dates
                            .iter()
                            .flat_map(|ts| {
                                let day = ts.date_naive();
                                [day, day + Duration::days(1)]
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                let available_days = (0..7)
                    .map(|offset| week_start + Duration::days(offset))
                    .filter(|day| !blocked_days.contains(day))
                    .collect();

                let blocked_until = activity.and_then(|a| a.last_post).map(|last| {
                    last + Duration::hours(MIN_HOURS_BETWEEN_PERSONA_POSTS)
                });

                PersonaAvailability {
                    persona_id: persona.id.clone(),
                    remaining_quota,
                    available_days,
                    blocked_until,
                }
            })
            .collect();

        let persona_slots: u32 = personas.iter().map(|p| p.remaining_quota).sum();
        let subreddit_slots = open_subreddits.len() as u32;

        let total_slots = input
            .posts_per_week
            .min(subreddit_slots)
            .min(persona_slots);

        let binding = if total_slots == input.posts_per_week {
            CapacityConstraint::Requested
        } else if subreddit_slots <= persona_slots {
            CapacityConstraint::Subreddits
        } else {
            CapacityConstraint::Personas
        };

        WeekCapacity {
            total_slots,
            open_subreddits,
            personas,
            binding,
        }
    }

    /// Posts already recorded this week for diagnostics
    pub fn posts_recorded_in_week(history: &PlannerHistory, week_start: NaiveDate) -> u32 {
        history
            .subreddit_posts
            .values()
            .flat_map(|a| a.post_dates.iter())
            .filter(|ts| in_week(**ts, week_start))
            .count() as u32
    }
}
