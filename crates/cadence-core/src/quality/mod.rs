//! Quality scoring
//!
//! Rule-based 0-10 scoring of candidate posts across six weighted factors,
//! optionally blended with an external oracle score. The final score gates
//! acceptance against the configured threshold; rejection is a normal
//! pipeline outcome, not an error.

pub mod factors;
pub mod refine;

use tracing::warn;

use crate::calendar::{FactorScore, PlannedPost};
use crate::content::QualityOracle;
use crate::guardrails::DEFAULT_MIN_QUALITY_SCORE;
use crate::model::{Company, Persona, Subreddit, Theme};

pub use refine::{RefinedCandidate, RefinementLoop};

/// Default weight of the oracle score in hybrid mode
pub const DEFAULT_ORACLE_WEIGHT: f64 = 0.3;

/// Fixed per-factor weight table; weights sum to 1.0
pub const FACTOR_WEIGHTS: &[(&str, f64)] = &[
    ("open_endedness", 0.20),
    ("non_promotional", 0.20),
    ("subreddit_fit", 0.15),
    ("author_credibility", 0.15),
    ("thread_naturalness", 0.15),
    ("engagement_potential", 0.15),
];

/// Context needed to score a candidate post
#[derive(Debug, Clone)]
pub struct ScoreContext<'a> {
    pub company: &'a Company,
    pub author: &'a Persona,
    pub subreddit: &'a Subreddit,
    pub theme: &'a Theme,
}

/// Result of scoring one candidate post
#[derive(Debug, Clone)]
pub struct QualityAssessment {
    /// Deterministic rule-based score
    pub rule_score: f64,
    /// Final score after optional oracle blending, rounded to one decimal
    pub final_score: f64,
    pub factors: Vec<FactorScore>,
    pub accepted: bool,
}

/// Rule-based scorer with optional oracle blending
#[derive(Debug, Clone)]
pub struct QualityScorer {
    min_score: f64,
    oracle_weight: f64,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self {
            min_score: DEFAULT_MIN_QUALITY_SCORE,
            oracle_weight: DEFAULT_ORACLE_WEIGHT,
        }
    }

    /// Set the acceptance threshold
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Set the oracle blend weight, clamped to [0, 1]
    pub fn with_oracle_weight(mut self, weight: f64) -> Self {
        self.oracle_weight = weight.clamp(0.0, 1.0);
        self
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Compute the deterministic rule-based score and factor breakdown.
    ///
    /// Idempotent: re-scoring the same immutable post with the same weights
    /// yields the same result.
    pub fn score_rules(
        &self,
        post: &PlannedPost,
        ctx: &ScoreContext<'_>,
    ) -> (f64, Vec<FactorScore>) {
        let mut scores = Vec::with_capacity(FACTOR_WEIGHTS.len());

        for (name, weight) in FACTOR_WEIGHTS {
            let (score, detail) = match *name {
                "open_endedness" => factors::open_endedness(post),
                "non_promotional" => factors::non_promotional(post, ctx.company),
                "subreddit_fit" => factors::subreddit_fit(post, ctx.subreddit),
                "author_credibility" => factors::author_credibility(post, ctx.author, ctx.theme),
                "thread_naturalness" => factors::thread_naturalness(post),
                "engagement_potential" => factors::engagement_potential(post),
                other => unreachable!("unknown quality factor {other}"),
            };

            scores.push(FactorScore {
                factor: name.to_string(),
                score,
                weight: *weight,
                detail,
            });
        }

        let total_weight: f64 = scores.iter().map(|f| f.weight).sum();
        let weighted: f64 = scores.iter().map(|f| f.score * f.weight).sum();
        let rule_score = round1(weighted / total_weight);

        (rule_score, scores)
    }

    /// Score a candidate post, blending in the oracle when one is provided.
    ///
    /// An erroring oracle falls back silently to the rule-based score; this
    /// never raises past the caller.
    pub async fn assess(
        &self,
        post: &PlannedPost,
        ctx: &ScoreContext<'_>,
        oracle: Option<&dyn QualityOracle>,
    ) -> QualityAssessment {
        let (rule_score, mut factors) = self.score_rules(post, ctx);
        let mut final_score = rule_score;

        if let Some(oracle) = oracle {
            match oracle.assess(post, ctx.company).await {
                Ok(assessment) => {
                    final_score = round1(
                        (1.0 - self.oracle_weight) * rule_score
                            + self.oracle_weight * assessment.score.clamp(0.0, 10.0),
                    );
                    factors.push(FactorScore {
                        factor: "oracle".to_string(),
                        score: assessment.score,
                        weight: self.oracle_weight,
                        detail: Some(assessment.feedback),
                    });
                }
                Err(e) => {
                    warn!(error = %e, post_id = %post.id, "quality oracle failed, using rule-based score");
                }
            }
        }

        QualityAssessment {
            rule_score,
            final_score,
            factors,
            accepted: final_score >= self.min_score,
        }
    }

    /// Acceptance gate: final score must reach the minimum threshold
    pub fn is_accepted(&self, final_score: f64) -> bool {
        final_score >= self.min_score
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Round to one decimal place
pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::PlannedComment;
    use crate::content::{NeutralOracle, OracleAssessment};
    use crate::error::PlannerError;
    use crate::model::ThemeCategory;
    use crate::types::PostType;
    use async_trait::async_trait;
    use chrono::{Datelike, TimeZone, Utc};

    fn fixtures() -> (Company, Persona, Subreddit, Theme) {
        (
            Company::new("Slideforge", "Deck automation"),
            Persona::new("p1", "u/maker_one").with_background("founder into churn metrics"),
            Subreddit::new("r/saas").with_culture_notes("saas metrics and churn war stories"),
            Theme::new("t1", "churn metrics").with_category(ThemeCategory::Question),
        )
    }

    fn good_post() -> PlannedPost {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap();
        let mut first = PlannedComment::new("p2", 45, at);
        first.seed_text = "This hits close to home. How long did it take before you saw anything change?".to_string();
        let mut second = PlannedComment::new("p3", 75, at).reply_to(&first);
        second.seed_text = "Adding a data point: our variance was bigger than the trend for a full quarter.".to_string();

        PlannedPost {
            id: "post_q".to_string(),
            day: at.weekday(),
            subreddit: "r/saas".to_string(),
            author_id: "p1".to_string(),
            title: "How do you actually track churn metrics?".to_string(),
            body_preview: "Honest question about churn metrics.".to_string(),
            body: Some(
                "Honest question for people who've dealt with churn metrics: how much of \
                 your process is deliberate versus inherited? We measured for 2 quarters \
                 and I still don't trust the numbers. What's actually working for you?"
                    .to_string(),
            ),
            post_type: PostType::Question,
            theme_ids: vec!["t1".to_string()],
            comments: vec![first, second],
            quality_score: 0.0,
            quality_factors: vec![],
            scheduled_at: at,
        }
    }

    #[test]
    fn test_rule_score_is_idempotent() {
        let (company, author, subreddit, theme) = fixtures();
        let ctx = ScoreContext {
            company: &company,
            author: &author,
            subreddit: &subreddit,
            theme: &theme,
        };
        let scorer = QualityScorer::new();
        let post = good_post();

        let (a, factors_a) = scorer.score_rules(&post, &ctx);
        let (b, factors_b) = scorer.score_rules(&post, &ctx);

        assert_eq!(a, b);
        assert_eq!(factors_a.len(), factors_b.len());
        for (fa, fb) in factors_a.iter().zip(&factors_b) {
            assert_eq!(fa.score, fb.score);
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = FACTOR_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_good_post_clears_threshold() {
        let (company, author, subreddit, theme) = fixtures();
        let ctx = ScoreContext {
            company: &company,
            author: &author,
            subreddit: &subreddit,
            theme: &theme,
        };
        let scorer = QualityScorer::new();

        let (score, factors) = scorer.score_rules(&good_post(), &ctx);
        assert!(score >= DEFAULT_MIN_QUALITY_SCORE, "score was {score}");
        assert_eq!(factors.len(), FACTOR_WEIGHTS.len());
    }

    #[test]
    fn test_promotional_post_scores_lower() {
        let (company, author, subreddit, theme) = fixtures();
        let ctx = ScoreContext {
            company: &company,
            author: &author,
            subreddit: &subreddit,
            theme: &theme,
        };
        let scorer = QualityScorer::new();

        let good = good_post();
        let (good_score, _) = scorer.score_rules(&good, &ctx);

        let mut bad = good;
        bad.title = "Try Slideforge - the best tool for churn!".to_string();
        bad.body = Some(
            "Slideforge is a game changer. Sign up for the free trial and check out our product."
                .to_string(),
        );
        let (bad_score, _) = scorer.score_rules(&bad, &ctx);

        assert!(bad_score < good_score);
    }

    #[tokio::test]
    async fn test_oracle_blending() {
        let (company, author, subreddit, theme) = fixtures();
        let ctx = ScoreContext {
            company: &company,
            author: &author,
            subreddit: &subreddit,
            theme: &theme,
        };
        let scorer = QualityScorer::new().with_oracle_weight(0.5);
        let post = good_post();

        let (rule_score, _) = scorer.score_rules(&post, &ctx);
        let assessment = scorer.assess(&post, &ctx, Some(&NeutralOracle)).await;

        let expected = round1(0.5 * rule_score + 0.5 * 6.0);
        assert_eq!(assessment.final_score, expected);
        assert!(assessment
            .factors
            .iter()
            .any(|f| f.factor == "oracle"));
    }

    struct FailingOracle;

    #[async_trait]
    impl QualityOracle for FailingOracle {
        async fn assess(
            &self,
            _post: &PlannedPost,
            _company: &Company,
        ) -> crate::error::Result<OracleAssessment> {
            Err(PlannerError::Collaborator("oracle offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_rules() {
        let (company, author, subreddit, theme) = fixtures();
        let ctx = ScoreContext {
            company: &company,
            author: &author,
            subreddit: &subreddit,
            theme: &theme,
        };
        let scorer = QualityScorer::new();
        let post = good_post();

        let assessment = scorer.assess(&post, &ctx, Some(&FailingOracle)).await;
        assert_eq!(assessment.final_score, assessment.rule_score);
        assert!(!assessment.factors.iter().any(|f| f.factor == "oracle"));
    }

    #[test]
    fn test_rounding_to_one_decimal() {
        assert_eq!(round1(6.4499), 6.4);
        assert_eq!(round1(6.26), 6.3);
        assert_eq!(round1(7.0), 7.0);
    }
}
