//! Cadence Core - guardrailed weekly social calendar generation
//!
//! Cadence plans a recurring weekly schedule of social-media posts and their
//! comment threads, subject to hard quantitative guardrails and a minimum
//! quality gate.
//!
//! # Architecture
//!
//! The planning engine is a pipeline of small components:
//!
//! 1. **Guardrails** (`guardrails`): pure constraint checks over history and in-progress plans
//! 2. **Capacity** (`capacity`): how many slots exist this week and who is eligible
//! 3. **Topics** (`topics`): score-ranked (theme, subreddit) selection with recency decay
//! 4. **Assigner** (`assigner`): author and commenter selection, comment skeleton
//! 5. **Scheduler** (`schedule`): weighted days, windowed times, 24h spreading
//! 6. **Quality** (`quality`): rule-based scoring, oracle blending, bounded refinement
//! 7. **Orchestrator** (`orchestrator`): the end-to-end run with retry/skip policy
//!
//! History is an explicit [`history::PlannerHistory`] value loaded through the
//! [`storage::HistoryStore`] contract at run start and written back at run
//! end. Content and quality assessment come from collaborator traits in
//! [`content`]; a deterministic template generator ships as the fallback.
//!
//! # Quick Start
//!
//! ```
//! use cadence_core::config::PlannerConfig;
//! use cadence_core::content::TemplateContentGenerator;
//! use cadence_core::model::{Company, Persona, PlannerInput, Subreddit, Theme};
//! use cadence_core::orchestrator::CalendarOrchestrator;
//! use cadence_core::storage::MemoryHistoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cadence_core::Result<()> {
//! let input = PlannerInput {
//!     company: Company::new("Slideforge", "Deck automation for founders"),
//!     personas: vec![
//!         Persona::new("p1", "u/maker_one").with_background("saas founder"),
//!         Persona::new("p2", "u/maker_two").with_background("growth marketer"),
//!     ],
//!     subreddits: vec![Subreddit::new("r/startups")],
//!     themes: vec![Theme::new("t1", "pitch decks")],
//!     posts_per_week: 1,
//! };
//!
//! let mut store = MemoryHistoryStore::new();
//! let generator = TemplateContentGenerator::seeded(42);
//! let mut orchestrator = CalendarOrchestrator::new(PlannerConfig::new().with_seed(42));
//!
//! let outcome = orchestrator
//!     .generate_next_week(&input, &mut store, &generator, None)
//!     .await?;
//! println!("{} posts planned", outcome.week.posts.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Design Principles
//!
//! 1. **Explicit state**: history flows through the pipeline as a value, never a hidden singleton
//! 2. **Partial failure is normal**: a slot that cannot be filled is skipped, not fatal
//! 3. **Injectable randomness**: every random draw goes through a seedable generator
//! 4. **Collaborators fail soft**: generator/oracle errors fall back, they never abort a run

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod assigner;
pub mod calendar;
pub mod capacity;
pub mod config;
pub mod content;
pub mod error;
pub mod guardrails;
pub mod history;
pub mod model;
pub mod orchestrator;
pub mod quality;
pub mod rng;
pub mod schedule;
pub mod storage;
pub mod topics;
pub mod types;

// Re-export commonly used types for convenience
pub use calendar::{CalendarWeek, PlannedComment, PlannedPost};
pub use capacity::{CapacityCalculator, CapacityConstraint, WeekCapacity};
pub use config::PlannerConfig;
pub use content::{ContentGenerator, QualityOracle, TemplateContentGenerator};
pub use error::{PlannerError, Result};
pub use guardrails::{GuardrailRule, GuardrailViolation, Guardrails, RuleCheck};
pub use history::PlannerHistory;
pub use model::{Company, Persona, PlannerInput, Subreddit, Theme};
pub use orchestrator::{CalendarOrchestrator, GenerationOutcome, GenerationReport};
pub use quality::{QualityScorer, RefinementLoop};
pub use rng::PlannerRng;
pub use schedule::Scheduler;
pub use storage::{HistoryStore, MemoryHistoryStore, SqliteHistoryStore};
pub use types::{Severity, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
