//! Guardrail validation
//!
//! Stateless constraint checks over history and in-progress plans. Each check
//! returns pass/fail plus the violations it found, tagged error (hard, blocks
//! acceptance) or warning (soft, surfaced but non-blocking).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::calendar::{CalendarWeek, PlannedPost};
use crate::history::{PersonaActivity, SubredditActivity, ThemeUsage};
use crate::model::{Company, Persona, PlannerInput, Subreddit};
use crate::types::{day_start, Severity};

/// Max posts per persona per calendar day
pub const MAX_POSTS_PER_PERSONA_PER_DAY: u32 = 1;

/// Minimum gap between two posts by the same persona
pub const MIN_HOURS_BETWEEN_PERSONA_POSTS: i64 = 48;

/// Themes reused inside this window draw a warning and a recency penalty
pub const THEME_REUSE_WINDOW_DAYS: i64 = 21;

/// First-comment delay bounds, in minutes after the post
pub const MIN_FIRST_COMMENT_DELAY_MINUTES: i64 = 30;
pub const MAX_FIRST_COMMENT_DELAY_MINUTES: i64 = 90;

/// More participants than this per post reads as brigading
pub const MAX_PARTICIPANTS_PER_POST: usize = 3;

/// Recommended cap on planned comments per post
pub const RECOMMENDED_MAX_COMMENTS: usize = 3;

/// Default minimum quality score gating acceptance
pub const DEFAULT_MIN_QUALITY_SCORE: f64 = 6.0;

/// Phrases that read as direct promotion when the company is named
pub const PROMO_PHRASES: &[&str] = &[
    "best tool",
    "check out",
    "sign up",
    "buy now",
    "discount",
    "free trial",
    "game changer",
    "you should use",
    "we built",
    "our product",
    "our platform",
    "limited offer",
];

/// Phrases that make a comment read as an empty upvote
const AGREEABLE_PHRASES: &[&str] = &[
    "totally agree",
    "so true",
    "couldn't agree more",
    "100%",
    "exactly this",
    "this is the way",
];

/// Named guardrail rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardrailRule {
    #[serde(rename = "PERSONA_DAILY_CAP")]
    PersonaDailyCap,
    #[serde(rename = "PERSONA_WEEKLY_CAP")]
    PersonaWeeklyCap,
    #[serde(rename = "MIN_48H_GAP")]
    Min48hGap,
    #[serde(rename = "SUBREDDIT_WEEKLY_CAP")]
    SubredditWeeklyCap,
    #[serde(rename = "AUTHOR_FIRST_COMMENT")]
    AuthorFirstComment,
    #[serde(rename = "SELF_REPLY")]
    SelfReply,
    #[serde(rename = "FIRST_COMMENT_DELAY")]
    FirstCommentDelay,
    #[serde(rename = "EARLY_COMMENT_LINK")]
    EarlyCommentLink,
    #[serde(rename = "PROMOTIONAL_CONTENT")]
    PromotionalContent,
    #[serde(rename = "THEME_REUSE_TOO_SOON")]
    ThemeReuseTooSoon,
    #[serde(rename = "TOO_MANY_PARTICIPANTS")]
    TooManyParticipants,
    #[serde(rename = "TOO_MANY_COMMENTS")]
    TooManyComments,
    #[serde(rename = "OVERLY_AGREEABLE")]
    OverlyAgreeable,
    #[serde(rename = "BELOW_QUALITY_THRESHOLD")]
    BelowQualityThreshold,
}

impl GuardrailRule {
    pub fn as_str(self) -> &'static str {
        match self {
            GuardrailRule::PersonaDailyCap => "PERSONA_DAILY_CAP",
            GuardrailRule::PersonaWeeklyCap => "PERSONA_WEEKLY_CAP",
            GuardrailRule::Min48hGap => "MIN_48H_GAP",
            GuardrailRule::SubredditWeeklyCap => "SUBREDDIT_WEEKLY_CAP",
            GuardrailRule::AuthorFirstComment => "AUTHOR_FIRST_COMMENT",
            GuardrailRule::SelfReply => "SELF_REPLY",
            GuardrailRule::FirstCommentDelay => "FIRST_COMMENT_DELAY",
            GuardrailRule::EarlyCommentLink => "EARLY_COMMENT_LINK",
            GuardrailRule::PromotionalContent => "PROMOTIONAL_CONTENT",
            GuardrailRule::ThemeReuseTooSoon => "THEME_REUSE_TOO_SOON",
            GuardrailRule::TooManyParticipants => "TOO_MANY_PARTICIPANTS",
            GuardrailRule::TooManyComments => "TOO_MANY_COMMENTS",
            GuardrailRule::OverlyAgreeable => "OVERLY_AGREEABLE",
            GuardrailRule::BelowQualityThreshold => "BELOW_QUALITY_THRESHOLD",
        }
    }
}

impl fmt::Display for GuardrailRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single violation produced by a validation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailViolation {
    pub rule: GuardrailRule,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub entity_id: Option<String>,
}

impl GuardrailViolation {
    pub fn error(rule: GuardrailRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            message: message.into(),
            entity_id: None,
        }
    }

    pub fn warning(rule: GuardrailRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: Severity::Warning,
            message: message.into(),
            entity_id: None,
        }
    }

    /// Tag the affected entity
    pub fn for_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

/// Outcome of one validation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleCheck {
    pub violations: Vec<GuardrailViolation>,
}

impl RuleCheck {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn from_violations(violations: Vec<GuardrailViolation>) -> Self {
        Self { violations }
    }

    /// Passed iff no error-severity violation was found; warnings don't block
    pub fn passed(&self) -> bool {
        !self
            .violations
            .iter()
            .any(|v| v.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &GuardrailViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &GuardrailViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
    }

    /// Fold another check's violations into this one
    pub fn merge(&mut self, other: RuleCheck) {
        self.violations.extend(other.violations);
    }
}

/// Stateless guardrail checks
#[derive(Debug)]
pub struct Guardrails;

impl Guardrails {
    /// Can `persona` author a post on `date`?
    ///
    /// Checks the daily cap, the weekly cap, and the 48-hour minimum gap
    /// against the persona's recorded post dates. The gap is measured to the
    /// start of the candidate day.
    pub fn can_persona_post_on_date(
        persona: &Persona,
        activity: Option<&PersonaActivity>,
        date: NaiveDate,
        week_start: NaiveDate,
    ) -> RuleCheck {
        let Some(activity) = activity else {
            return RuleCheck::pass();
        };

        let mut violations = Vec::new();

        let posts_on_day = activity
            .post_dates
            .iter()
            .filter(|ts| ts.date_naive() == date)
            .count() as u32;
        if posts_on_day >= MAX_POSTS_PER_PERSONA_PER_DAY {
            violations.push(
                GuardrailViolation::error(
                    GuardrailRule::PersonaDailyCap,
                    format!("{} already has a post on {}", persona.handle, date),
                )
                .for_entity(&persona.id),
            );
        }

        if activity.posts_in_week(week_start) >= persona.max_posts_per_week {
            violations.push(
                GuardrailViolation::error(
                    GuardrailRule::PersonaWeeklyCap,
                    format!(
                        "{} reached its weekly quota of {}",
                        persona.handle, persona.max_posts_per_week
                    ),
                )
                .for_entity(&persona.id),
            );
        }

        if let Some(last_post) = activity.last_post {
            let gap_hours = (day_start(date) - last_post).num_hours();
            if gap_hours < MIN_HOURS_BETWEEN_PERSONA_POSTS {
                violations.push(
                    GuardrailViolation::error(
                        GuardrailRule::Min48hGap,
                        format!(
                            "{} posted {}h before {}, minimum gap is {}h",
                            persona.handle, gap_hours, date, MIN_HOURS_BETWEEN_PERSONA_POSTS
                        ),
                    )
                    .for_entity(&persona.id),
                );
            }
        }

        RuleCheck::from_violations(violations)
    }

    /// Can this theme be used on `date`? Reuse inside the 3-week window is a
    /// warning, never a block.
    pub fn can_use_theme(usage: Option<&ThemeUsage>, date: NaiveDate) -> RuleCheck {
        let Some(usage) = usage else {
            return RuleCheck::pass();
        };

        let days_since = (day_start(date) - usage.last_used).num_days();
        if days_since < THEME_REUSE_WINDOW_DAYS {
            return RuleCheck::from_violations(vec![
                GuardrailViolation::warning(
                    GuardrailRule::ThemeReuseTooSoon,
                    format!(
                        "theme '{}' was used {} days ago, inside the {}-day window",
                        usage.theme_id, days_since, THEME_REUSE_WINDOW_DAYS
                    ),
                )
                .for_entity(&usage.theme_id),
            ]);
        }

        RuleCheck::pass()
    }

    /// Is the subreddit still under its weekly cap?
    pub fn can_post_in_subreddit(
        subreddit: &Subreddit,
        activity: Option<&SubredditActivity>,
        week_start: NaiveDate,
    ) -> RuleCheck {
        let posted = activity
            .map(|a| a.posts_in_week(week_start))
            .unwrap_or(0);

        if posted >= subreddit.max_posts_per_week {
            return RuleCheck::from_violations(vec![
                GuardrailViolation::error(
                    GuardrailRule::SubredditWeeklyCap,
                    format!(
                        "{} already has {} post(s) this week (cap {})",
                        subreddit.name, posted, subreddit.max_posts_per_week
                    ),
                )
                .for_entity(&subreddit.name),
            ]);
        }

        RuleCheck::pass()
    }

    /// No direct promotional phrasing naming the company in the main post.
    ///
    /// A company name inside a neutral "X vs Y" comparison passes; the phrase
    /// lists are a heuristic, not an exact boundary.
    pub fn validate_post_content(title: &str, body: &str, company: &Company) -> RuleCheck {
        let text = format!("{} {}", title, body).to_lowercase();
        let company_name = company.name.trim().to_lowercase();

        if company_name.is_empty() || !text.contains(&company_name) {
            return RuleCheck::pass();
        }

        let promo_hit = PROMO_PHRASES.iter().any(|p| text.contains(p))
            || text.contains(&format!("try {}", company_name));

        if promo_hit {
            return RuleCheck::from_violations(vec![GuardrailViolation::error(
                GuardrailRule::PromotionalContent,
                format!(
                    "post names {} alongside promotional phrasing",
                    company.name
                ),
            )]);
        }

        RuleCheck::pass()
    }

    /// Structural checks on a post's comment thread
    pub fn validate_comment_thread(post: &PlannedPost) -> RuleCheck {
        let mut violations = Vec::new();

        if let Some(first) = post.comments.first() {
            if first.author_id == post.author_id {
                violations.push(
                    GuardrailViolation::error(
                        GuardrailRule::AuthorFirstComment,
                        "the post author must not write the first comment",
                    )
                    .for_entity(&post.id),
                );
            }

            if first.delay_minutes < MIN_FIRST_COMMENT_DELAY_MINUTES
                || first.delay_minutes > MAX_FIRST_COMMENT_DELAY_MINUTES
            {
                violations.push(
                    GuardrailViolation::error(
                        GuardrailRule::FirstCommentDelay,
                        format!(
                            "first comment delay {}min is outside [{}, {}]",
                            first.delay_minutes,
                            MIN_FIRST_COMMENT_DELAY_MINUTES,
                            MAX_FIRST_COMMENT_DELAY_MINUTES
                        ),
                    )
                    .for_entity(&post.id),
                );
            }
        }

        for comment in &post.comments {
            if let Some(parent_id) = &comment.parent_id {
                if post.comment_author(parent_id) == Some(comment.author_id.as_str()) {
                    violations.push(
                        GuardrailViolation::error(
                            GuardrailRule::SelfReply,
                            format!("{} replies to its own comment", comment.author_id),
                        )
                        .for_entity(&comment.id),
                    );
                }
            }
        }

        for comment in post.comments.iter().take(2) {
            let text = comment.seed_text.to_lowercase();
            if text.contains("http://") || text.contains("https://") || text.contains("www.") {
                violations.push(
                    GuardrailViolation::error(
                        GuardrailRule::EarlyCommentLink,
                        "links are not allowed in the first two comments",
                    )
                    .for_entity(&comment.id),
                );
            }
        }

        if post.participant_ids().len() > MAX_PARTICIPANTS_PER_POST {
            violations.push(
                GuardrailViolation::warning(
                    GuardrailRule::TooManyParticipants,
                    format!(
                        "{} personas on one post reads as coordinated",
                        post.participant_ids().len()
                    ),
                )
                .for_entity(&post.id),
            );
        }

        if post.comments.len() > RECOMMENDED_MAX_COMMENTS {
            violations.push(
                GuardrailViolation::warning(
                    GuardrailRule::TooManyComments,
                    format!(
                        "{} planned comments, recommended at most {}",
                        post.comments.len(),
                        RECOMMENDED_MAX_COMMENTS
                    ),
                )
                .for_entity(&post.id),
            );
        }

        for comment in &post.comments {
            let text = comment.seed_text.to_lowercase();
            let agreeable = AGREEABLE_PHRASES.iter().any(|p| text.contains(p));
            if agreeable && comment.seed_text.len() < 60 {
                violations.push(
                    GuardrailViolation::warning(
                        GuardrailRule::OverlyAgreeable,
                        "comment is a bare agreement with no substance",
                    )
                    .for_entity(&comment.id),
                );
            }
        }

        RuleCheck::from_violations(violations)
    }

    /// Whole-calendar pass over a finished week: per-post content and thread
    /// checks, subreddit caps across the week, persona spacing across the
    /// week, and a re-check of every final score against the threshold.
    pub fn validate_week(
        week: &CalendarWeek,
        input: &PlannerInput,
        min_quality_score: f64,
    ) -> RuleCheck {
        let mut check = RuleCheck::pass();

        for post in &week.posts {
            check.merge(Self::validate_post_content(
                &post.title,
                post.body.as_deref().unwrap_or(&post.body_preview),
                &input.company,
            ));
            check.merge(Self::validate_comment_thread(post));

            if post.quality_score < min_quality_score {
                check.violations.push(
                    GuardrailViolation::error(
                        GuardrailRule::BelowQualityThreshold,
                        format!(
                            "post scored {:.1}, below the {:.1} threshold",
                            post.quality_score, min_quality_score
                        ),
                    )
                    .for_entity(&post.id),
                );
            }
        }

        let mut per_subreddit: HashMap<&str, u32> = HashMap::new();
        for post in &week.posts {
            *per_subreddit.entry(post.subreddit.as_str()).or_default() += 1;
        }
        for (name, count) in per_subreddit {
            let cap = input
                .subreddit(name)
                .map(|s| s.max_posts_per_week)
                .unwrap_or(1);
            if count > cap {
                check.violations.push(
                    GuardrailViolation::error(
                        GuardrailRule::SubredditWeeklyCap,
                        format!("{} appears {} times this week (cap {})", name, count, cap),
                    )
                    .for_entity(name),
                );
            }
        }

        let mut per_author: HashMap<&str, Vec<crate::types::Timestamp>> = HashMap::new();
        for post in &week.posts {
            per_author
                .entry(post.author_id.as_str())
                .or_default()
                .push(post.scheduled_at);
        }
        for (author, mut times) in per_author {
            times.sort();
            for pair in times.windows(2) {
                let gap_hours = (pair[1] - pair[0]).num_hours();
                if gap_hours < MIN_HOURS_BETWEEN_PERSONA_POSTS {
                    check.violations.push(
                        GuardrailViolation::error(
                            GuardrailRule::Min48hGap,
                            format!(
                                "{} has two posts {}h apart this week",
                                author, gap_hours
                            ),
                        )
                        .for_entity(author),
                    );
                }
            }
        }

        check
    }
}
