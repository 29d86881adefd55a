//! Answer generation for the chat endpoint.
//!
//! The server does not care where answers come from. It asks an
//! [`AnswerSource`] for a stream of text deltas and forwards them verbatim.
//!
//! # Sources
//!
//! - [`ChatCompletionsSource`]: `OpenAI`-compatible Chat Completions API
//!   (`/v1/chat/completions`)

pub mod chat_completions;

pub use chat_completions::ChatCompletionsSource;

use std::pin::Pin;

use futures::Stream;

/// Answer text as it is produced, one delta per item.
pub type TextStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// LLM connection and model settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-4o-mini`).
    pub model: String,
    /// Optional system message sent ahead of every query.
    pub system_prompt: Option<String>,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl LlmSettings {
    /// Read settings from `LLM_BASE_URL`, `LLM_MODEL`, `LLM_API_KEY` and
    /// `LLM_SYSTEM_PROMPT`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the missing or empty required variable.
    pub fn from_env() -> Result<Self, String> {
        let base_url = required_var("LLM_BASE_URL")?;
        let model = required_var("LLM_MODEL")?;

        Ok(Self {
            base_url,
            api_key: optional_var("LLM_API_KEY"),
            model,
            system_prompt: optional_var("LLM_SYSTEM_PROMPT"),
        })
    }
}

fn required_var(name: &str) -> Result<String, String> {
    let value = std::env::var(name).map_err(|_missing| format!("Missing required env var: {name}"))?;
    if value.trim().is_empty() {
        return Err(format!("{name} cannot be empty"));
    }
    Ok(value)
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Produces a streamed answer for a query.
#[async_trait::async_trait]
pub trait AnswerSource: Send + Sync {
    /// Start answering `query`.
    ///
    /// Errors returned here happen before any text was produced; errors
    /// inside the stream happen mid-answer.
    async fn answer(&self, query: &str) -> anyhow::Result<TextStream>;
}
