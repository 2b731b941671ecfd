//! [`AIProvider`] over Google's Gemini REST API (<https://ai.google.dev/>).
//!
//! Every call is a single-turn `generateContent` request; the reply text is
//! handed to [`response`] for JSON extraction.

use std::time::Duration;

use super::AIProvider;
use super::{prompts, response};
use crate::types::{Category, Enrichment, Suggestion};
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/";

/// Default model used for feedback analysis.
const DEFAULT_MODEL: &str = "gemini-flash-lite-latest";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default temperature for model responses (low for consistent labels).
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Enough for a classification object or five suggestions.
const DEFAULT_MAX_TOKENS: u32 = 1000;

// Wire format: request
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

// Wire format: response
#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

impl GeminiResponse {
    /// Text of the first candidate, all parts joined.
    ///
    /// Candidates blocked by safety filters count as empty.
    fn into_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .ok_or_else(|| anyhow!("No candidates in Gemini response"))?;

        if let Some(reason) = &candidate.finish_reason
            && (reason == "SAFETY" || reason == "BLOCKED")
        {
            return Err(anyhow!("Gemini response blocked ({reason})"));
        }

        let text: String = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            return Err(anyhow!("No response content from Gemini API"));
        }
        Ok(text)
    }
}

/// Gemini connection settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Model name appended to the base URL, e.g. `gemini-2.0-flash`.
    pub model: String,
    pub temperature: f32,
    /// Cap on `maxOutputTokens`.
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Endpoint prefix; the model and `:generateContent` are appended to it.
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }
}

impl GeminiConfig {
    pub fn builder() -> GeminiConfigBuilder {
        GeminiConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Fluent setters over a default [`GeminiConfig`].
#[derive(Debug, Clone)]
pub struct GeminiConfigBuilder {
    config: GeminiConfig,
}

impl GeminiConfigBuilder {
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

    pub fn build(self) -> GeminiConfig {
        self.config
    }
}

/// Feedback classification and insights backed by Gemini `generateContent`.
///
/// ```rust,ignore
/// use feedback_analysis::ai::{GeminiConfig, GeminiProvider};
///
/// let provider = GeminiProvider::with_config(
///     api_key,
///     GeminiConfig::builder().model("gemini-2.0-flash").build(),
/// )?;
/// ```
pub struct GeminiProvider {
    api_key: String,
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Provider with the default model and settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, GeminiConfig::default())
    }

    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn with_config(api_key: impl Into<String>, config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Could not create Gemini HTTP client: {e}"))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    fn call_api(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![Content {
                role: "user".to_owned(),
                parts: vec![Part {
                    text: prompt.to_owned(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let url = format!(
            "{}{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.api_key
        );

        let response = self.client.post(&url).json(&request).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("Gemini API returned {status}: {body}"));
        }

        let result: GeminiResponse = response.json()?;
        let text = result.into_text()?;
        debug!("Gemini returned {} chars", text.len());
        Ok(text)
    }
}

impl AIProvider for GeminiProvider {
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
        "Gemini"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // GeminiResponse parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_valid_response() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "{\"sentiment\": \"positive\"}"}]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), r#"{"sentiment": "positive"}"#);
    }

    #[test]
    fn test_parse_response_multiple_parts_are_joined() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "[{\"title\": "}, {"text": "\"x\"}]"}]}
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), r#"[{"title": "x"}]"#);
    }

    #[test]
    fn test_parse_response_with_empty_candidates() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(response.into_text().is_err());
    }

    #[test]
    fn test_parse_response_with_null_candidates() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": null}"#).unwrap();
        assert!(response.candidates.is_none());
    }

    #[test]
    fn test_parse_response_missing_parts() {
        let json = r#"{"candidates": [{"content": {}}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_text().is_err());
    }

    #[test]
    fn test_parse_response_safety_blocked() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "partial"}]},
                "finishReason": "SAFETY"
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = response.into_text().unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_malformed_json() {
        let json = r#"{"candidates": [{"content": "not an object"}]}"#;
        let result: std::result::Result<GeminiResponse, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    // -------------------------------------------------------------------------
    // Configuration tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_config_builder() {
        let config = GeminiConfig::builder()
            .model("gemini-2.0-flash")
            .temperature(0.3)
            .timeout_secs(5)
            .build();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_provider_metadata() {
        let provider = GeminiProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "Gemini");
        assert_eq!(provider.model(), Some(DEFAULT_MODEL));
    }
}
