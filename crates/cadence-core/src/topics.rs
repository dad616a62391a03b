//! Topic selection
//!
//! Ranks (theme, subreddit) pairs by compatibility and recency, then greedily
//! picks the top pairs under uniqueness constraints. Selected pairs carry a
//! template draft title and preview which the content generator may later
//! overwrite.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::guardrails::THEME_REUSE_WINDOW_DAYS;
use crate::history::{PlannerHistory, ThemeUsage};
use crate::model::{Company, PlannerInput, Subreddit, Theme, ThemeCategory};
use crate::rng::PlannerRng;
use crate::types::{day_start, PostType};

/// Penalty multiplier for themes reused inside the 3-week window
const REUSE_PENALTY: f64 = 0.3;

/// Weekly recovery rate once a theme leaves the reuse window
const RECOVERY_PER_WEEK: f64 = 0.1;

/// A selected (theme, subreddit) pair with its draft content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCandidate {
    pub theme_id: String,
    pub subreddit: String,
    pub post_type: PostType,
    /// Compatibility score after recency scaling
    pub score: f64,
    pub draft_title: String,
    pub draft_preview: String,
}

/// Ranks and picks (theme, subreddit) pairs
#[derive(Debug)]
pub struct TopicSelector;

impl TopicSelector {
    /// Select up to `count` topics for the target week.
    ///
    /// Subreddit uniqueness always holds across the selection. Theme
    /// uniqueness is relaxed only when the pool cannot otherwise fill the
    /// request. Returning fewer than `count` is expected when inputs are
    /// exhausted; the caller surfaces it as a warning.
    pub fn select(
        input: &PlannerInput,
        history: &PlannerHistory,
        open_subreddits: &[String],
        count: usize,
        week_start: NaiveDate,
        rng: &mut PlannerRng,
    ) -> Vec<TopicCandidate> {
        let mut pairs: Vec<(f64, &Theme, &Subreddit)> = Vec::new();
        for theme in &input.themes {
            for subreddit in &input.subreddits {
                if !open_subreddits.contains(&subreddit.name) {
                    continue;
                }
                let base = Self::compatibility(theme, subreddit, &input.company);
                let multiplier = Self::recency_multiplier(history.theme(&theme.id), week_start);
                pairs.push((base * multiplier, theme, subreddit));
            }
        }

        // Deterministic order: score descending, then ids as tie-breakers
        pairs.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
                .then_with(|| a.2.name.cmp(&b.2.name))
        });

        let mut selected: Vec<TopicCandidate> = Vec::new();
        let mut used_subreddits: HashSet<&str> = HashSet::new();
        let mut used_themes: HashSet<&str> = HashSet::new();

        for (score, theme, subreddit) in &pairs {
            if selected.len() >= count {
                break;
            }
            if used_subreddits.contains(subreddit.name.as_str())
                || used_themes.contains(theme.id.as_str())
            {
                continue;
            }
            used_subreddits.insert(&subreddit.name);
            used_themes.insert(&theme.id);
            selected.push(Self::candidate(theme, subreddit, *score, rng));
        }

        // Second pass relaxes theme uniqueness, never subreddit uniqueness
        if selected.len() < count {
            for (score, theme, subreddit) in &pairs {
                if selected.len() >= count {
                    break;
                }
                if used_subreddits.contains(subreddit.name.as_str()) {
                    continue;
                }
                used_subreddits.insert(&subreddit.name);
                selected.push(Self::candidate(theme, subreddit, *score, rng));
            }
        }

        selected
    }

    /// Keyword/category affinity heuristic on a 0-10 scale
    fn compatibility(theme: &Theme, subreddit: &Subreddit, company: &Company) -> f64 {
        let mut score: f64 = 5.0;

        let keyword = theme.keyword.to_lowercase();
        let sub_text = format!(
            "{} {}",
            subreddit.name,
            subreddit.culture_notes.as_deref().unwrap_or("")
        )
        .to_lowercase();

        for token in keyword.split_whitespace() {
            if token.len() > 3 && sub_text.contains(token) {
                score += 1.5;
            }
        }

        if company
            .pain_points
            .iter()
            .any(|p| p.to_lowercase().contains(&keyword) || keyword.contains(&p.to_lowercase()))
        {
            score += 1.0;
        }

        score += match theme.category {
            // Questions travel well everywhere
            Some(ThemeCategory::Question) => 0.5,
            Some(ThemeCategory::Comparison) if sub_text.contains("tool") => 1.0,
            Some(ThemeCategory::Education)
                if sub_text.contains("learn") || sub_text.contains("guide") =>
            {
                1.0
            }
            Some(ThemeCategory::CaseStudy) if sub_text.contains("startup") => 0.5,
            _ => 0.0,
        };

        score.clamp(0.0, 10.0)
    }

    /// 0.3x inside the reuse window, recovering toward 1.0x afterwards
    fn recency_multiplier(usage: Option<&ThemeUsage>, week_start: NaiveDate) -> f64 {
        let Some(usage) = usage else {
            return 1.0;
        };

        let days = (day_start(week_start) - usage.last_used).num_days();
        if days < THEME_REUSE_WINDOW_DAYS {
            return REUSE_PENALTY;
        }

        let weeks = days as f64 / 7.0;
        (REUSE_PENALTY + (weeks - 3.0) * RECOVERY_PER_WEEK).min(1.0)
    }

    fn candidate(
        theme: &Theme,
        subreddit: &Subreddit,
        score: f64,
        rng: &mut PlannerRng,
    ) -> TopicCandidate {
        TopicCandidate {
            theme_id: theme.id.clone(),
            subreddit: subreddit.name.clone(),
            post_type: theme.post_type(),
            score,
            draft_title: Self::draft_title(theme, rng),
            draft_preview: Self::draft_preview(theme, subreddit, rng),
        }
    }

    fn draft_title(theme: &Theme, rng: &mut PlannerRng) -> String {
        let keyword = &theme.keyword;
        let templates: &[&str] = match theme.post_type() {
            PostType::Question => &[
                "What's your approach to {kw}?",
                "How do you handle {kw} on a small team?",
                "Anyone else wrestling with {kw}?",
            ],
            PostType::Story => &[
                "What six months of {kw} taught me",
                "Our {kw} experiment, honest results",
            ],
            PostType::Comparison => &[
                "{kw}: what are people actually using?",
                "Comparing approaches to {kw}, what am I missing?",
            ],
            PostType::Education => &[
                "A practical intro to {kw}",
                "Notes on {kw} from the trenches",
            ],
            PostType::CaseStudy => &[
                "How we approached {kw} (numbers inside)",
                "{kw}: a small case study",
            ],
            PostType::Discussion => &[
                "Let's talk about {kw}",
                "Open thread: {kw}",
            ],
        };

        let template = rng.pick(templates).copied().unwrap_or("{kw}");
        template.replace("{kw}", keyword)
    }

    fn draft_preview(theme: &Theme, subreddit: &Subreddit, rng: &mut PlannerRng) -> String {
        let templates: &[&str] = &[
            "Looking to swap notes on {kw} with people who've been there.",
            "Genuinely curious how {sub} handles {kw} day to day.",
            "Sharing where we landed on {kw} and what still feels off.",
        ];
        let template = rng.pick(templates).copied().unwrap_or(templates[0]);
        template
            .replace("{kw}", &theme.keyword)
            .replace("{sub}", &subreddit.name)
    }
}
