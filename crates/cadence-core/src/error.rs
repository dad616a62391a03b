//! Error types for Cadence Core
//!
//! This module defines all error types used throughout the planning engine.
//! We use `thiserror` for ergonomic error definitions with automatic Display/Error implementations.

use thiserror::Error;

use crate::capacity::CapacityConstraint;

/// Result type alias for planner operations
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Main error type for planner operations
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Input validation errors - raised before the pipeline starts
    #[error("Invalid planner input: {0}")]
    InvalidInput(#[from] InputError),

    /// Zero posting slots for the target week - history is left untouched
    #[error("No capacity for week starting {week_start}: {binding} exhausted")]
    CapacityExhausted {
        week_start: chrono::NaiveDate,
        binding: CapacityConstraint,
    },

    /// Every candidate slot was rejected - the run produced nothing to persist.
    /// Carries the warnings accumulated before the run gave up.
    #[error("No posts accepted: all {rejected} candidate slots were rejected")]
    NoAcceptedPosts {
        rejected: u32,
        warnings: Vec<String>,
    },

    /// External collaborator (content generator / quality oracle) failures
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// History store errors
    #[error("History store error: {0}")]
    Store(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<PlannerError>,
    },
}

/// Errors raised while validating planner input
#[derive(Error, Debug, Clone)]
pub enum InputError {
    #[error("At least 2 personas are required, got {0}")]
    NotEnoughPersonas(usize),

    #[error("At least one subreddit is required")]
    NoSubreddits,

    #[error("At least one theme is required")]
    NoThemes,

    #[error("Posts per week must be in range [1, 7], got {0}")]
    PostsPerWeekOutOfRange(u32),

    #[error("Duplicate persona id: {0}")]
    DuplicatePersonaId(String),

    #[error("Duplicate subreddit name: {0}")]
    DuplicateSubreddit(String),

    #[error("Persona {0} has a zero weekly post quota")]
    ZeroPersonaQuota(String),
}

impl From<rusqlite::Error> for PlannerError {
    fn from(e: rusqlite::Error) -> Self {
        PlannerError::Store(e.to_string())
    }
}

impl PlannerError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.context(f()))
    }
}
