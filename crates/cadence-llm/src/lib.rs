//! LLM adapters for Cadence
//!
//! HTTP implementations of the engine's collaborator traits against an
//! OpenAI-compatible chat completions endpoint:
//!
//! - [`LlmContentGenerator`] produces post and comment text
//! - [`LlmQualityOracle`] scores finished posts for hybrid blending
//!
//! Both return structured JSON parsed into the engine's contracts. Failures
//! surface as [`cadence_core::PlannerError::Collaborator`]; the engine
//! catches them and falls back to its deterministic templates, so a broken
//! or unconfigured endpoint degrades a run, never aborts it.

#![deny(unsafe_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use cadence_core::calendar::PlannedPost;
use cadence_core::content::{
    CommentContext, ContentGenerator, GeneratedComment, GeneratedPost, OracleAssessment,
    PostContext, QualityOracle,
};
use cadence_core::model::Company;
use cadence_core::PlannerError;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "CADENCE_LLM_API_KEY";

/// Environment variable overriding the API base URL
pub const API_BASE_VAR: &str = "CADENCE_LLM_API_BASE";

/// Environment variable overriding the model name
pub const MODEL_VAR: &str = "CADENCE_LLM_MODEL";

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from the HTTP adapters
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not set; export {API_KEY_VAR}")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

impl From<LlmError> for PlannerError {
    fn from(e: LlmError) -> Self {
        PlannerError::Collaborator(e.to_string())
    }
}

/// Connection settings for the chat endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.8,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Build from the environment (`.env` supported via dotenvy)
    pub fn from_env() -> Result<Self, LlmError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var(API_KEY_VAR).map_err(|_| LlmError::MissingApiKey)?;
        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var(API_BASE_VAR) {
            config.api_base = base;
        }
        if let Ok(model) = std::env::var(MODEL_VAR) {
            config.model = model;
        }
        Ok(config)
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Thin chat-completions client shared by both adapters
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    /// Client configured from the environment
    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(LlmConfig::from_env()?)
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn chat(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: self.config.temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat endpoint returned an error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))?;

        debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }

    /// Send a prompt and parse the reply as JSON into `T`, tolerating
    /// markdown code fences around the payload.
    async fn chat_json<T: serde::de::DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
    ) -> Result<T, LlmError> {
        let raw = self.chat(system, user).await?;
        let stripped = strip_code_fences(&raw);
        serde_json::from_str(stripped)
            .map_err(|e| LlmError::MalformedResponse(format!("{e}: {stripped}")))
    }
}

/// Remove a surrounding ```...``` fence if present
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// HTTP-backed [`ContentGenerator`]
#[derive(Debug, Clone)]
pub struct LlmContentGenerator {
    client: LlmClient,
}

impl LlmContentGenerator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Ok(Self::new(LlmClient::from_env()?))
    }

    fn post_prompt(ctx: &PostContext<'_>) -> String {
        format!(
            "Write a {post_type} post for {subreddit} about \"{keyword}\".\n\
             Author voice: {background}.\n\
             Subreddit culture: {culture}.\n\
             Company context (do NOT promote or name it): {company} - {description}.\n\
             Working title: {draft}.\n\
             Rules: sound like a practitioner, no links, no marketing language, \
             end with something that invites replies.\n\
             Reply with JSON only: {{\"title\": string, \"body\": string, \"keywords\": [string]}}",
            post_type = ctx.post_type,
            subreddit = ctx.subreddit.name,
            keyword = ctx.theme.keyword,
            background = ctx.author.background,
            culture = ctx.subreddit.culture_notes.as_deref().unwrap_or("unknown"),
            company = ctx.company.name,
            description = ctx.company.description,
            draft = ctx.draft_title,
        )
    }

    fn comment_prompt(ctx: &CommentContext<'_>) -> String {
        let role = if ctx.is_author_reply {
            "You are the post author, briefly acknowledging a commenter."
        } else if ctx.prior_comments.is_empty() {
            "You are the first commenter; react and ask one genuine question."
        } else {
            "You are a later commenter; add a concrete data point or gentle pushback."
        };

        format!(
            "{role}\n\
             Commenter voice: {background}.\n\
             Post title: {title}\n\
             Post body: {body}\n\
             Earlier comments: {prior}\n\
             Rules: one short paragraph, no links, no empty agreement.\n\
             Reply with JSON only: {{\"text\": string, \"tone\": string}}",
            role = role,
            background = ctx.commenter.background,
            title = ctx.post_title,
            body = ctx.post_body,
            prior = if ctx.prior_comments.is_empty() {
                "none".to_string()
            } else {
                ctx.prior_comments.join(" | ")
            },
        )
    }
}

const GENERATOR_SYSTEM: &str = "You ghost-write authentic reddit posts and comments for \
    scheduled community engagement. You never produce marketing copy and you never \
    reveal any company affiliation. Output strictly the requested JSON.";

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate_post(&self, ctx: &PostContext<'_>) -> cadence_core::Result<GeneratedPost> {
        let prompt = Self::post_prompt(ctx);
        let post: GeneratedPost = self
            .client
            .chat_json(GENERATOR_SYSTEM, &prompt)
            .await
            .map_err(PlannerError::from)?;
        Ok(post)
    }

    async fn generate_comment(
        &self,
        ctx: &CommentContext<'_>,
    ) -> cadence_core::Result<GeneratedComment> {
        let prompt = Self::comment_prompt(ctx);
        let comment: GeneratedComment = self
            .client
            .chat_json(GENERATOR_SYSTEM, &prompt)
            .await
            .map_err(PlannerError::from)?;
        Ok(comment)
    }
}

/// HTTP-backed [`QualityOracle`]
#[derive(Debug, Clone)]
pub struct LlmQualityOracle {
    client: LlmClient,
}

impl LlmQualityOracle {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Ok(Self::new(LlmClient::from_env()?))
    }

    fn assessment_prompt(post: &PlannedPost, company: &Company) -> String {
        let comments: Vec<String> = post
            .comments
            .iter()
            .map(|c| format!("[{} +{}min] {}", c.author_id, c.delay_minutes, c.seed_text))
            .collect();

        format!(
            "Rate this planned reddit post and its comment thread for authenticity.\n\
             Subreddit: {subreddit}\n\
             Title: {title}\n\
             Body: {body}\n\
             Comments:\n{comments}\n\
             The post must not read as promotion for \"{company}\".\n\
             Score each dimension 0-10.\n\
             Reply with JSON only: {{\"score\": number, \"naturalness\": number, \
             \"authenticity\": number, \"engagement\": number, \"feedback\": string, \
             \"suggestions\": [string]}}",
            subreddit = post.subreddit,
            title = post.title,
            body = post.body.as_deref().unwrap_or(&post.body_preview),
            comments = comments.join("\n"),
            company = company.name,
        )
    }
}

const ORACLE_SYSTEM: &str = "You are a strict reviewer of planned social posts. You score \
    how natural, authentic and engaging they would read to a real community. Output \
    strictly the requested JSON.";

#[async_trait]
impl QualityOracle for LlmQualityOracle {
    async fn assess(
        &self,
        post: &PlannedPost,
        company: &Company,
    ) -> cadence_core::Result<OracleAssessment> {
        let prompt = Self::assessment_prompt(post, company);
        let assessment: OracleAssessment = self
            .client
            .chat_json(ORACLE_SYSTEM, &prompt)
            .await
            .map_err(PlannerError::from)?;
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::model::{Persona, Subreddit, Theme};
    use cadence_core::types::PostType;
    use chrono::{Datelike, TimeZone, Utc};

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_chat_response_parsing() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hello");
    }

    #[test]
    fn test_generated_post_tolerates_missing_keywords() {
        let raw = r#"{"title": "t", "body": "b"}"#;
        let post: GeneratedPost = serde_json::from_str(strip_code_fences(raw)).unwrap();
        assert!(post.keywords.is_empty());
    }

    #[test]
    fn test_llm_error_maps_to_collaborator() {
        let err: PlannerError = LlmError::MissingApiKey.into();
        assert!(matches!(err, PlannerError::Collaborator(_)));
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn test_post_prompt_includes_context() {
        let company = Company::new("Slideforge", "Deck automation");
        let author = Persona::new("p1", "u/maker_one").with_background("saas founder");
        let subreddit = Subreddit::new("r/saas").with_culture_notes("metrics talk");
        let theme = Theme::new("t1", "churn metrics");

        let prompt = LlmContentGenerator::post_prompt(&PostContext {
            company: &company,
            author: &author,
            subreddit: &subreddit,
            theme: &theme,
            post_type: PostType::Question,
            draft_title: "What's your approach to churn metrics?",
        });

        assert!(prompt.contains("r/saas"));
        assert!(prompt.contains("churn metrics"));
        assert!(prompt.contains("saas founder"));
        assert!(prompt.contains("do NOT promote"));
    }

    #[test]
    fn test_oracle_prompt_lists_comments() {
        let company = Company::new("Slideforge", "Deck automation");
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
        let mut comment = cadence_core::PlannedComment::new("p2", 45, at);
        comment.seed_text = "How did you measure that?".to_string();

        let post = PlannedPost {
            id: "post_x".to_string(),
            day: at.weekday(),
            subreddit: "r/saas".to_string(),
            author_id: "p1".to_string(),
            title: "A question".to_string(),
            body_preview: "preview".to_string(),
            body: None,
            post_type: PostType::Question,
            theme_ids: vec!["t1".to_string()],
            comments: vec![comment],
            quality_score: 0.0,
            quality_factors: vec![],
            scheduled_at: at,
        };

        let prompt = LlmQualityOracle::assessment_prompt(&post, &company);
        assert!(prompt.contains("[p2 +45min] How did you measure that?"));
        assert!(prompt.contains("Slideforge"));
    }
}
