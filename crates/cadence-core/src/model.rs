//! Planner input model
//!
//! Caller-owned entities the engine reads but never mutates: the company
//! context, the persona roster, the target subreddits, and the theme pool.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::InputError;
use crate::types::PostType;

/// Read-only company context used for content generation and promo checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub pain_points: Vec<String>,
}

impl Company {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            pain_points: Vec::new(),
        }
    }
}

/// A posting persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    /// Display handle, e.g. `u/quiet_builder`
    pub handle: String,
    /// Free-text background used for topic-affinity ranking
    pub background: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    pub max_posts_per_week: u32,
}

impl Persona {
    pub fn new(id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
            background: String::new(),
            role: None,
            tone: None,
            max_posts_per_week: 2,
        }
    }

    /// Set the background text
    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Set the role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the tone
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    /// Set the weekly post quota
    pub fn with_weekly_quota(mut self, quota: u32) -> Self {
        self.max_posts_per_week = quota;
        self
    }
}

fn default_subreddit_cap() -> u32 {
    1
}

/// A target subreddit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subreddit {
    pub name: String,
    #[serde(default = "default_subreddit_cap")]
    pub max_posts_per_week: u32,
    #[serde(default)]
    pub culture_notes: Option<String>,
}

impl Subreddit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_posts_per_week: default_subreddit_cap(),
            culture_notes: None,
        }
    }

    /// Set the weekly post cap
    pub fn with_weekly_cap(mut self, cap: u32) -> Self {
        self.max_posts_per_week = cap;
        self
    }

    /// Set culture notes
    pub fn with_culture_notes(mut self, notes: impl Into<String>) -> Self {
        self.culture_notes = Some(notes.into());
        self
    }
}

/// Category of a theme, steering post type and templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeCategory {
    Question,
    Story,
    Comparison,
    Education,
    #[serde(rename = "case-study")]
    CaseStudy,
}

impl From<ThemeCategory> for PostType {
    fn from(category: ThemeCategory) -> Self {
        match category {
            ThemeCategory::Question => PostType::Question,
            ThemeCategory::Story => PostType::Story,
            ThemeCategory::Comparison => PostType::Comparison,
            ThemeCategory::Education => PostType::Education,
            ThemeCategory::CaseStudy => PostType::CaseStudy,
        }
    }
}

/// A content theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub keyword: String,
    #[serde(default)]
    pub category: Option<ThemeCategory>,
}

impl Theme {
    pub fn new(id: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            keyword: keyword.into(),
            category: None,
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: ThemeCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Post type for this theme, defaulting to a plain discussion
    pub fn post_type(&self) -> PostType {
        self.category.map(PostType::from).unwrap_or(PostType::Discussion)
    }
}

/// Complete input for one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerInput {
    pub company: Company,
    pub personas: Vec<Persona>,
    pub subreddits: Vec<Subreddit>,
    pub themes: Vec<Theme>,
    /// Requested number of posts for the target week
    pub posts_per_week: u32,
}

impl PlannerInput {
    /// Validate the input before the pipeline starts.
    ///
    /// Generation must not begin (and no state may be persisted) if this fails.
    pub fn validate(&self) -> std::result::Result<(), InputError> {
        if self.personas.len() < 2 {
            return Err(InputError::NotEnoughPersonas(self.personas.len()));
        }
        if self.subreddits.is_empty() {
            return Err(InputError::NoSubreddits);
        }
        if self.themes.is_empty() {
            return Err(InputError::NoThemes);
        }
        if self.posts_per_week < 1 || self.posts_per_week > 7 {
            return Err(InputError::PostsPerWeekOutOfRange(self.posts_per_week));
        }

        let mut seen = HashSet::new();
        for persona in &self.personas {
            if !seen.insert(persona.id.as_str()) {
                return Err(InputError::DuplicatePersonaId(persona.id.clone()));
            }
            if persona.max_posts_per_week == 0 {
                return Err(InputError::ZeroPersonaQuota(persona.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for subreddit in &self.subreddits {
            if !seen.insert(subreddit.name.as_str()) {
                return Err(InputError::DuplicateSubreddit(subreddit.name.clone()));
            }
        }

        Ok(())
    }

    /// Look up a persona by id
    pub fn persona(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Look up a subreddit by name
    pub fn subreddit(&self, name: &str) -> Option<&Subreddit> {
        self.subreddits.iter().find(|s| s.name == name)
    }

    /// Look up a theme by id
    pub fn theme(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }
}
