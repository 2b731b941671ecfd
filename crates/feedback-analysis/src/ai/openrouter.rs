//! [`AIProvider`] over OpenRouter.
//!
//! OpenRouter (<https://openrouter.ai/>) exposes many hosted models behind one
//! OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use super::AIProvider;
use super::{prompts, response};
use crate::types::{Category, Enrichment, Suggestion};
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TEMPERATURE: f32 = 0.1;
const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

impl OpenRouterResponse {
    fn into_text(self) -> Result<String> {
        self.choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .map(|msg| msg.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow!("No response content from OpenRouter API"))
    }
}

/// OpenRouter connection settings.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// Provider-qualified model id, e.g. `openai/gpt-4o-mini`.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Full chat completions URL.
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenRouterConfig {
    pub fn builder() -> OpenRouterConfigBuilder {
        OpenRouterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Fluent setters over a default [`OpenRouterConfig`].
#[derive(Debug, Clone)]
pub struct OpenRouterConfigBuilder {
    config: OpenRouterConfig,
}

impl OpenRouterConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn build(self) -> OpenRouterConfig {
        self.config
    }
}

/// Feedback classification and insights through any OpenRouter model.
pub struct OpenRouterProvider {
    api_key: String,
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, OpenRouterConfig::default())
    }

    pub fn with_config(api_key: impl Into<String>, config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Could not create OpenRouter HTTP client: {e}"))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    fn call_api(&self, prompt: &str) -> Result<String> {
        let request = OpenRouterRequest {
            model: self.config.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Feedback-Analysis")
            .json(&request)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("OpenRouter API returned {status}: {body}"));
        }

        let result: OpenRouterResponse = response.json()?;
        let text = result.into_text()?;
        debug!("OpenRouter returned {} chars", text.len());
        Ok(text)
    }
}

impl AIProvider for OpenRouterProvider {
    fn classify_feedback(&self, text: &str) -> Result<Enrichment> {
        let reply = self.call_api(&prompts::classification_prompt(text))?;
        response::parse_enrichment(&reply)
    }

    fn summarize_category(&self, category: Category, samples: &[String]) -> Result<String> {
        let reply = self.call_api(&prompts::summary_prompt(category, samples))?;
        Ok(reply.trim().to_string())
    }

    fn suggest_improvements(
        &self,
        category: Category,
        samples: &[String],
    ) -> Result<Vec<Suggestion>> {
        let reply = self.call_api(&prompts::suggestions_prompt(category, samples))?;
        response::parse_suggestions(&reply)
    }

    fn name(&self) -> &str {
        "OpenRouter"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}
