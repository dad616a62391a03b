//! Calendar orchestration
//!
//! Drives the full pipeline for one generation request:
//! capacity -> days -> topics -> per-slot (author -> schedule -> content ->
//! score) -> spread -> whole-week validation -> persistence.
//!
//! Slots that cannot be filled are rejected and counted, never abort the run;
//! the run as a whole fails only when it produces zero accepted posts.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::calendar::{CalendarWeek, PlannedPost};
use crate::capacity::CapacityCalculator;
use crate::config::PlannerConfig;
use crate::content::{ContentGenerator, QualityOracle};
use crate::error::{PlannerError, Result};
use crate::guardrails::{GuardrailViolation, Guardrails};
use crate::model::PlannerInput;
use crate::quality::{QualityScorer, RefinementLoop, ScoreContext};
use crate::rng::PlannerRng;
use crate::schedule::Scheduler;
use crate::storage::HistoryStore;
use crate::topics::TopicSelector;
use crate::types::{next_monday, prefixed_id};
use crate::assigner::PersonaAssigner;

/// Pipeline stage reached by a run, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Start,
    CapacityComputed,
    DaysSelected,
    TopicsSelected,
    Spread,
    WholeWeekValidated,
    Persisted,
    Done,
    Failed,
}

/// What happened to one candidate slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SlotOutcome {
    Accepted {
        post_id: String,
        subreddit: String,
        score: f64,
    },
    NoEligibleAuthor {
        subreddit: String,
        day: NaiveDate,
    },
    BelowThreshold {
        subreddit: String,
        score: f64,
        attempts: u32,
    },
}

/// Diagnostic summary of one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub stage: RunStage,
    pub accepted: u32,
    pub rejected: u32,
    pub slots: Vec<SlotOutcome>,
    pub warnings: Vec<String>,
    /// Whole-week pass results; error-severity entries discovered here do not
    /// retroactively undo persistence
    pub violations: Vec<GuardrailViolation>,
}

/// Successful run output: the persisted week plus its report
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub week: CalendarWeek,
    pub report: GenerationReport,
}

/// Drives the generation pipeline end to end
#[derive(Debug)]
pub struct CalendarOrchestrator {
    config: PlannerConfig,
    scorer: QualityScorer,
    refiner: RefinementLoop,
    rng: PlannerRng,
}

impl CalendarOrchestrator {
    pub fn new(config: PlannerConfig) -> Self {
        let scorer = QualityScorer::new()
            .with_min_score(config.min_quality_score)
            .with_oracle_weight(config.oracle_weight);

        let (rng, refiner) = match config.seed {
            Some(seed) => (
                PlannerRng::seeded(seed),
                RefinementLoop::with_seed(config.max_retries, seed.wrapping_add(1)),
            ),
            None => (
                PlannerRng::from_entropy(),
                RefinementLoop::new(config.max_retries),
            ),
        };

        Self {
            config,
            scorer,
            refiner,
            rng,
        }
    }

    /// Generate the week starting at `week_start`.
    ///
    /// History is loaded once, mutated in memory, and written back only after
    /// a successful run. Each slot is processed to completion before the next
    /// begins because later slots depend on the authors, subreddits and
    /// themes accumulated by earlier ones.
    pub async fn generate_week(
        &mut self,
        input: &PlannerInput,
        store: &mut dyn HistoryStore,
        generator: &dyn ContentGenerator,
        oracle: Option<&dyn QualityOracle>,
        week_start: NaiveDate,
    ) -> Result<GenerationOutcome> {
        input.validate()?;

        let oracle = if self.config.oracle_enabled {
            oracle
        } else {
            None
        };

        let mut history = store.load()?;
        history.roll_over(week_start);

        let capacity = CapacityCalculator::compute(input, &history, week_start);
        info!(
            week_start = %week_start,
            total_slots = capacity.total_slots,
            binding = %capacity.binding,
            "capacity computed"
        );
        if capacity.total_slots == 0 {
            return Err(PlannerError::CapacityExhausted {
                week_start,
                binding: capacity.binding,
            });
        }

        let mut warnings: Vec<String> = Vec::new();
        let mut slots: Vec<SlotOutcome> = Vec::new();

        let days = Scheduler::select_days(week_start, capacity.total_slots as usize);
        debug!(?days, "posting days selected");

        let topics = TopicSelector::select(
            input,
            &history,
            &capacity.open_subreddits,
            capacity.total_slots as usize,
            week_start,
            &mut self.rng,
        );
        if topics.len() < capacity.total_slots as usize {
            warnings.push(format!(
                "only {} of {} slots could be matched with a topic",
                topics.len(),
                capacity.total_slots
            ));
        }

        let mut accepted_posts: Vec<PlannedPost> = Vec::new();
        let mut used_authors: HashSet<String> = HashSet::new();
        let mut rejected = 0u32;

        for (day, topic) in days.iter().zip(topics.iter()) {
            let Some(theme) = input.theme(&topic.theme_id) else {
                continue;
            };
            let Some(subreddit) = input.subreddit(&topic.subreddit) else {
                continue;
            };

            let theme_check = Guardrails::can_use_theme(history.theme(&theme.id), *day);
            for violation in &theme_check.violations {
                warnings.push(violation.message.clone());
            }

            let Some(assignment) = PersonaAssigner::assign(
                input,
                &capacity,
                *day,
                theme,
                subreddit,
                topic.post_type,
                &used_authors,
                &mut self.rng,
            ) else {
                warn!(subreddit = %topic.subreddit, day = %day, "no eligible author, slot skipped");
                warnings.push(format!(
                    "no eligible author for {} on {}, slot skipped",
                    topic.subreddit, day
                ));
                slots.push(SlotOutcome::NoEligibleAuthor {
                    subreddit: topic.subreddit.clone(),
                    day: *day,
                });
                rejected += 1;
                continue;
            };

            let scheduled_at = Scheduler::schedule_time(*day, &mut self.rng);
            let mut post = PlannedPost {
                id: prefixed_id("post"),
                day: day.weekday(),
                subreddit: subreddit.name.clone(),
                author_id: assignment.author_id.clone(),
                title: topic.draft_title.clone(),
                body_preview: topic.draft_preview.clone(),
                body: None,
                post_type: topic.post_type,
                theme_ids: vec![theme.id.clone()],
                comments: assignment.comments,
                quality_score: 0.0,
                quality_factors: Vec::new(),
                scheduled_at,
            };
            post.reschedule(scheduled_at);

            let Some(author) = input.persona(&assignment.author_id) else {
                continue;
            };
            let score_ctx = ScoreContext {
                company: &input.company,
                author,
                subreddit,
                theme,
            };

            let refined = self
                .refiner
                .run(
                    &self.scorer,
                    generator,
                    oracle,
                    &score_ctx,
                    &input.personas,
                    &topic.draft_title,
                    post,
                    &mut warnings,
                )
                .await;

            if refined.assessment.accepted {
                info!(
                    post_id = %refined.post.id,
                    subreddit = %refined.post.subreddit,
                    score = refined.assessment.final_score,
                    "slot accepted"
                );
                slots.push(SlotOutcome::Accepted {
                    post_id: refined.post.id.clone(),
                    subreddit: refined.post.subreddit.clone(),
                    score: refined.assessment.final_score,
                });
                used_authors.insert(assignment.author_id);
                accepted_posts.push(refined.post);
            } else {
                warn!(
                    subreddit = %topic.subreddit,
                    score = refined.assessment.final_score,
                    attempts = refined.attempts,
                    "slot rejected below quality threshold"
                );
                warnings.push(format!(
                    "post for {} scored {:.1} after {} attempt(s), below threshold {:.1}",
                    topic.subreddit,
                    refined.assessment.final_score,
                    refined.attempts,
                    self.scorer.min_score()
                ));
                slots.push(SlotOutcome::BelowThreshold {
                    subreddit: topic.subreddit.clone(),
                    score: refined.assessment.final_score,
                    attempts: refined.attempts,
                });
                rejected += 1;
            }
        }

        if accepted_posts.is_empty() {
            return Err(PlannerError::NoAcceptedPosts { rejected, warnings });
        }

        Scheduler::spread_posts(&mut accepted_posts, &mut self.rng);

        let week = CalendarWeek::new(week_start, accepted_posts, Utc::now());

        let week_check = Guardrails::validate_week(&week, input, self.scorer.min_score());
        if !week_check.passed() {
            warn!(
                violations = week_check.violations.len(),
                "whole-week validation found error-severity violations"
            );
        }

        history.record_week(&week);
        store.save(&history)?;
        info!(week_id = %week.id, posts = week.posts.len(), "week persisted");

        let accepted = week.posts.len() as u32;
        Ok(GenerationOutcome {
            week,
            report: GenerationReport {
                stage: RunStage::Done,
                accepted,
                rejected,
                slots,
                warnings,
                violations: week_check.violations,
            },
        })
    }

    /// Generate the week after the most recently recorded one, or the next
    /// Monday when no history exists.
    pub async fn generate_next_week(
        &mut self,
        input: &PlannerInput,
        store: &mut dyn HistoryStore,
        generator: &dyn ContentGenerator,
        oracle: Option<&dyn QualityOracle>,
    ) -> Result<GenerationOutcome> {
        let history = store.load()?;
        let week_start = match history.last_week_end() {
            Some(end) => end + Duration::days(1),
            None => next_monday(Utc::now().date_naive()),
        };

        self.generate_week(input, store, generator, oracle, week_start)
            .await
    }

    /// Remove any stored week for `week_start`, then re-run generation
    /// unconditionally.
    pub async fn regenerate(
        &mut self,
        input: &PlannerInput,
        store: &mut dyn HistoryStore,
        generator: &dyn ContentGenerator,
        oracle: Option<&dyn QualityOracle>,
        week_start: NaiveDate,
    ) -> Result<GenerationOutcome> {
        let mut history = store.load()?;
        if let Some(removed) = history.remove_week(week_start) {
            info!(week_id = %removed.id, week_start = %week_start, "removed prior week before regeneration");
            store.save(&history)?;
        }

        self.generate_week(input, store, generator, oracle, week_start)
            .await
    }
}
