//! AI module for LLM-powered feedback enrichment.
//!
//! This module provides a trait-based abstraction for AI providers, so the
//! analysis engine can classify and summarize feedback with any LLM backend.
//!
//! # Feature Flag
//!
//! The concrete HTTP providers require the `ai` feature flag. The
//! [`AIProvider`] trait, prompt builders and response parsers are always
//! available for custom implementations.
//!
//! ```toml
//! # Enable hosted providers (default)
//! feedback-analysis = { version = "0.1", features = ["ai"] }
//!
//! # Bring your own provider
//! feedback-analysis = { version = "0.1", default-features = false }
//! ```
//!
//! # Providers
//!
//! - [`GeminiProvider`] - Google Gemini API (requires `ai` feature)
//! - [`OpenRouterProvider`] - OpenRouter API (requires `ai` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use feedback_analysis::ai::GeminiProvider;
//! use feedback_analysis::AnalysisPipeline;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(GeminiProvider::new("your-api-key")?);
//!
//! let outcome = AnalysisPipeline::builder()
//!     .ai_provider(provider)
//!     .build()?
//!     .analyze_file("feedback.csv")?;
//! ```

mod provider;
pub use provider::AIProvider;

pub mod prompts;
pub mod response;

#[cfg(feature = "ai")]
mod gemini;
#[cfg(feature = "ai")]
mod openrouter;

#[cfg(feature = "ai")]
pub use gemini::{GeminiConfig, GeminiConfigBuilder, GeminiProvider};

#[cfg(feature = "ai")]
pub use openrouter::{OpenRouterConfig, OpenRouterConfigBuilder, OpenRouterProvider};
