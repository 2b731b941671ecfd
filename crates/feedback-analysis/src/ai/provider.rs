//! AI provider trait for abstracting LLM interactions.
//!
//! The aggregation engine only talks to this trait, so any text-understanding
//! backend (a hosted LLM, a local model, a keyword classifier in tests) can
//! enrich feedback.
//!
//! # Implementing a New Provider
//!
//! 1. Create a new file in `src/ai/` (e.g., `openai.rs`)
//! 2. Implement the [`AIProvider`] trait for your provider struct
//! 3. Export the provider in `src/ai/mod.rs`
//!
//! The prompt builders in [`super::prompts`] and the parsers in
//! [`super::response`] can be reused by any provider that returns free text.

use anyhow::Result;

use crate::types::{Category, Enrichment, Suggestion};

/// Trait for providers that classify and summarize customer feedback.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage across threads.
///
/// # Error Handling
///
/// Implementations should return meaningful errors via `anyhow::Result`.
/// The engine never aborts on a provider error: it substitutes a fallback
/// value and records a warning.
pub trait AIProvider: Send + Sync {
    /// Classify one feedback entry: sentiment, category and up to three key points.
    fn classify_feedback(&self, text: &str) -> Result<Enrichment>;

    /// Summarize the feedback samples of one category in a short paragraph.
    fn summarize_category(&self, category: Category, samples: &[String]) -> Result<String>;

    /// Suggest concrete improvements for one category.
    fn suggest_improvements(&self, category: Category, samples: &[String])
    -> Result<Vec<Suggestion>>;

    /// Get the provider name for logging and reports.
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    ///
    /// Returns `None` if the provider doesn't expose model information.
    fn model(&self) -> Option<&str> {
        None
    }
}
