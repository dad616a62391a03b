//! Planner configuration

use serde::{Deserialize, Serialize};

use crate::guardrails::DEFAULT_MIN_QUALITY_SCORE;
use crate::quality::refine::DEFAULT_MAX_RETRIES;
use crate::quality::DEFAULT_ORACLE_WEIGHT;

/// Engine configuration for one planner instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Minimum final quality score for a post to be accepted
    pub min_quality_score: f64,

    /// Weight of the external oracle score in hybrid mode, 0-1
    pub oracle_weight: f64,

    /// Whether the external quality oracle participates in scoring
    pub oracle_enabled: bool,

    /// Regeneration attempts after the first, per slot
    pub max_retries: u32,

    /// Fixed RNG seed for replayable runs; None draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_quality_score: DEFAULT_MIN_QUALITY_SCORE,
            oracle_weight: DEFAULT_ORACLE_WEIGHT,
            oracle_enabled: false,
            max_retries: DEFAULT_MAX_RETRIES,
            seed: None,
        }
    }
}

impl PlannerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quality threshold
    pub fn with_min_quality_score(mut self, score: f64) -> Self {
        self.min_quality_score = score;
        self
    }

    /// Set the oracle blend weight (clamped to [0, 1])
    pub fn with_oracle_weight(mut self, weight: f64) -> Self {
        self.oracle_weight = weight.clamp(0.0, 1.0);
        self
    }

    /// Enable or disable oracle blending
    pub fn with_oracle_enabled(mut self, enabled: bool) -> Self {
        self.oracle_enabled = enabled;
        self
    }

    /// Set the per-slot retry cap
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Fix the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
