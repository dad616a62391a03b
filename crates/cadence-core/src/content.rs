//! Content collaborator contracts
//!
//! The engine consumes structured text but does not produce it: post and
//! comment text comes from a [`ContentGenerator`], optional score blending
//! from a [`QualityOracle`]. Both are traits with two concrete shapes - a
//! deterministic template fallback shipped here and external adapters
//! (e.g. the HTTP implementations in `cadence-llm`) - selected by
//! configuration, never by runtime type inspection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::calendar::PlannedPost;
use crate::error::Result;
use crate::model::{Company, Persona, Subreddit, Theme};
use crate::rng::PlannerRng;
use crate::types::PostType;

/// Structured context for generating a post
#[derive(Debug, Clone)]
pub struct PostContext<'a> {
    pub company: &'a Company,
    pub author: &'a Persona,
    pub subreddit: &'a Subreddit,
    pub theme: &'a Theme,
    pub post_type: PostType,
    /// Template draft from topic selection, usable as a starting point
    pub draft_title: &'a str,
}

/// Structured context for generating one comment
#[derive(Debug, Clone)]
pub struct CommentContext<'a> {
    pub company: &'a Company,
    pub commenter: &'a Persona,
    pub post_title: &'a str,
    pub post_body: &'a str,
    /// Text of comments generated earlier in the same thread
    pub prior_comments: &'a [String],
    /// True when the post author acknowledges a commenter
    pub is_author_reply: bool,
}

/// Generated post content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Generated comment content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedComment {
    pub text: String,
    #[serde(default)]
    pub tone: Option<String>,
}

/// Produces post and comment text from structured context
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_post(&self, ctx: &PostContext<'_>) -> Result<GeneratedPost>;

    async fn generate_comment(&self, ctx: &CommentContext<'_>) -> Result<GeneratedComment>;
}

/// External quality assessment of a finished post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleAssessment {
    /// Overall score 0-10
    pub score: f64,
    pub naturalness: f64,
    pub authenticity: f64,
    pub engagement: f64,
    pub feedback: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Optional external quality scorer blended into the rule-based score
#[async_trait]
pub trait QualityOracle: Send + Sync {
    async fn assess(&self, post: &PlannedPost, company: &Company) -> Result<OracleAssessment>;
}

/// Deterministic template-based generator.
///
/// The fallback when no external generator is configured, and the safety net
/// when one fails mid-run. Template choice flows through [`PlannerRng`] so a
/// seeded instance produces identical output.
#[derive(Debug)]
pub struct TemplateContentGenerator {
    rng: Mutex<PlannerRng>,
}

impl TemplateContentGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(PlannerRng::from_entropy()),
        }
    }

    /// Reproducible generator for tests and replayable runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(PlannerRng::seeded(seed)),
        }
    }

    fn body_templates(post_type: PostType) -> &'static [&'static str] {
        match post_type {
            PostType::Question => &[
                "We've been going back and forth on {kw} for a while now and I still don't feel great about our setup. What's actually working for you, and what would you skip if you started over?",
                "Honest question for people who've dealt with {kw}: how much of your process is deliberate versus inherited? I keep wondering if we overcomplicated it.",
            ],
            PostType::Story => &[
                "Six months ago we changed how we do {kw} and the results surprised me. Some of it worked, some of it quietly failed. Happy to share numbers if useful - curious whether others saw the same pattern.",
                "A short story about {kw}: we ignored it for a year, then it bit us in one week. Writing down what we changed in case it saves someone the same scramble. What did your turning point look like?",
            ],
            PostType::Comparison => &[
                "I've been comparing a few ways to handle {kw} and each one trades off something different. Before I commit, what did you pick and what do you wish you'd known?",
                "There seem to be two schools of thought on {kw}. We've tried both halfway and that's clearly the worst option. For those who committed to one: any regrets?",
            ],
            PostType::Education => &[
                "Things I wish someone had told me about {kw}: it's less about the tooling and more about the cadence. Sharing my notes below - push back where I'm wrong.",
                "A practical breakdown of {kw} from someone who learned it the slow way. No silver bullets, just the steps that stuck. What would you add?",
            ],
            PostType::CaseStudy => &[
                "We ran a focused experiment on {kw} last quarter. Sharing setup, numbers, and the one result we didn't expect. Would love a sanity check on the methodology.",
                "Case study: {kw} at a five-person team. What we measured, what moved, what didn't. Ask me anything about the details.",
            ],
            PostType::Discussion => &[
                "Open thread on {kw}: what's the current state of the art in your corner? Feels like the common wisdom is a couple of years stale.",
                "Been thinking a lot about {kw} lately. Not selling anything, just want to hear how different teams frame it.",
            ],
        }
    }

    fn opener_templates() -> &'static [&'static str] {
        &[
            "This hits close to home. How long did it take before you saw anything change?",
            "Interesting timing, we just went through this. What did you try first, and why that order?",
            "Good question. Out of curiosity, what size team is this for? The answer changes a lot with scale.",
            "Following this thread. We made the opposite call and I'm starting to doubt it - what pushed you this way?",
        ]
    }

    fn follower_templates() -> &'static [&'static str] {
        &[
            "Adding a data point: we measured this for a quarter and the variance was bigger than the trend. Would be careful drawing conclusions too early.",
            "The part nobody mentions is the maintenance cost afterwards. It worked for us, but only after we assigned a clear owner.",
            "We tried something similar and walked it back after a month. Not because it failed, but because nobody wanted to own it long term.",
        ]
    }

    fn ack_templates() -> &'static [&'static str] {
        &[
            "That's a fair point about the timeline - took us about six weeks before anything was visible.",
            "Good catch, I should have mentioned the team size. We're five people, which definitely shapes this.",
            "Appreciate the pushback. The ordering was mostly forced by what was on fire at the time.",
        ]
    }
}

impl Default for TemplateContentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for TemplateContentGenerator {
    async fn generate_post(&self, ctx: &PostContext<'_>) -> Result<GeneratedPost> {
        let mut rng = self.rng.lock().expect("rng lock poisoned");

        let body_template = rng
            .pick(Self::body_templates(ctx.post_type))
            .copied()
            .unwrap_or("{kw}");
        let body = body_template.replace("{kw}", &ctx.theme.keyword);

        Ok(GeneratedPost {
            title: ctx.draft_title.to_string(),
            body,
            keywords: ctx
                .theme
                .keyword
                .split_whitespace()
                .map(|s| s.to_string())
                .collect(),
        })
    }

    async fn generate_comment(&self, ctx: &CommentContext<'_>) -> Result<GeneratedComment> {
        let mut rng = self.rng.lock().expect("rng lock poisoned");

        let (templates, tone) = if ctx.is_author_reply {
            (Self::ack_templates(), "appreciative")
        } else if ctx.prior_comments.is_empty() {
            (Self::opener_templates(), "curious")
        } else {
            (Self::follower_templates(), "measured")
        };

        let text = rng
            .pick(templates)
            .copied()
            .unwrap_or(templates[0])
            .to_string();

        Ok(GeneratedComment {
            text,
            tone: Some(tone.to_string()),
        })
    }
}

/// Oracle stub returning a neutral assessment. Useful in tests and as the
/// configured default when no external oracle is wired up.
#[derive(Debug)]
pub struct NeutralOracle;

#[async_trait]
impl QualityOracle for NeutralOracle {
    async fn assess(&self, _post: &PlannedPost, _company: &Company) -> Result<OracleAssessment> {
        Ok(OracleAssessment {
            score: 6.0,
            naturalness: 6.0,
            authenticity: 6.0,
            engagement: 6.0,
            feedback: "No external oracle configured; neutral default.".to_string(),
            suggestions: Vec::new(),
        })
    }
}
