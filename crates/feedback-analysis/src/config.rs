//! Configuration types for the feedback analysis pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// When category summaries and improvement suggestions are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InsightScope {
    /// Each chunk summarizes its own category buckets; when chunks are merged
    /// the last chunk that produced an insight for a category wins.
    #[default]
    PerChunk,
    /// Insights are generated once, from the buckets of the whole run.
    Run,
}

/// Configuration for the analysis pipeline.
///
/// Use [`AnalysisConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use feedback_analysis::config::{AnalysisConfig, InsightScope};
///
/// let config = AnalysisConfig::builder()
///     .max_chunks(4)
///     .insight_scope(InsightScope::Run)
///     .request_delay_ms(0)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Whether the report includes the sentiment section.
    /// Default: true
    pub include_sentiment: bool,

    /// Whether the report includes the category section.
    /// Default: true
    pub include_categorization: bool,

    /// Whether to ask the provider for per-category summaries.
    /// Default: true
    pub include_summaries: bool,

    /// Whether to ask the provider for per-category improvement suggestions.
    /// Default: true
    pub include_suggestions: bool,

    /// Maximum number of feedback samples per category sent for insights.
    /// Default: 20
    pub sample_limit: usize,

    /// Maximum number of suggestions kept per category.
    /// Default: 5
    pub max_suggestions: usize,

    /// Pause after every classification call, in milliseconds.
    /// Default: 100
    pub request_delay_ms: u64,

    /// Upper bound on the number of chunks a dataset is split into.
    /// Default: 10
    pub max_chunks: usize,

    /// When insights are generated.
    /// Default: PerChunk
    pub insight_scope: InsightScope,

    /// Explicit feedback column. If None, the column is inferred.
    /// Default: None
    pub feedback_column: Option<String>,

    /// Output directory for generated reports.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Custom output file name (without extension).
    /// If None, the input file stem is used.
    /// Default: None
    pub output_name: Option<String>,

    /// Whether to write the report and annotated dataset to disk.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            include_sentiment: true,
            include_categorization: true,
            include_summaries: true,
            include_suggestions: true,
            sample_limit: 20,
            max_suggestions: 5,
            request_delay_ms: 100,
            max_chunks: 10,
            insight_scope: InsightScope::default(),
            feedback_column: None,
            output_dir: PathBuf::from("outputs"),
            output_name: None,
            save_to_disk: true,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// The pause applied after each classification call.
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Whether any insight generation is enabled.
    pub fn wants_insights(&self) -> bool {
        self.include_summaries || self.include_suggestions
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.sample_limit == 0 {
            return Err(ConfigValidationError::MustBePositive {
                field: "sample_limit".to_string(),
            });
        }

        if self.max_suggestions == 0 {
            return Err(ConfigValidationError::MustBePositive {
                field: "max_suggestions".to_string(),
            });
        }

        if self.max_chunks == 0 {
            return Err(ConfigValidationError::MustBePositive {
                field: "max_chunks".to_string(),
            });
        }

        if let Some(column) = &self.feedback_column
            && column.trim().is_empty()
        {
            return Err(ConfigValidationError::EmptyColumnName);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': must be at least 1")]
    MustBePositive { field: String },

    #[error("Feedback column name must not be empty")]
    EmptyColumnName,
}

/// Builder for [`AnalysisConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    include_sentiment: Option<bool>,
    include_categorization: Option<bool>,
    include_summaries: Option<bool>,
    include_suggestions: Option<bool>,
    sample_limit: Option<usize>,
    max_suggestions: Option<usize>,
    request_delay_ms: Option<u64>,
    max_chunks: Option<usize>,
    insight_scope: Option<InsightScope>,
    feedback_column: Option<String>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    save_to_disk: Option<bool>,
}

impl AnalysisConfigBuilder {
    /// Show or hide the sentiment section of the report.
    pub fn include_sentiment(mut self, include: bool) -> Self {
        self.include_sentiment = Some(include);
        self
    }

    /// Show or hide the category section of the report.
    pub fn include_categorization(mut self, include: bool) -> Self {
        self.include_categorization = Some(include);
        self
    }

    /// Enable or disable per-category summaries.
    pub fn include_summaries(mut self, include: bool) -> Self {
        self.include_summaries = Some(include);
        self
    }

    /// Enable or disable per-category improvement suggestions.
    pub fn include_suggestions(mut self, include: bool) -> Self {
        self.include_suggestions = Some(include);
        self
    }

    /// Set how many samples per category are sent for insights.
    pub fn sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = Some(limit);
        self
    }

    /// Set how many suggestions are kept per category.
    pub fn max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = Some(max);
        self
    }

    /// Set the pause after each classification call.
    ///
    /// Use 0 in tests or with providers that do their own rate limiting.
    pub fn request_delay_ms(mut self, millis: u64) -> Self {
        self.request_delay_ms = Some(millis);
        self
    }

    /// Set the upper bound on the number of chunks.
    pub fn max_chunks(mut self, max: usize) -> Self {
        self.max_chunks = Some(max);
        self
    }

    /// Set when insights are generated.
    pub fn insight_scope(mut self, scope: InsightScope) -> Self {
        self.insight_scope = Some(scope);
        self
    }

    /// Set an explicit feedback column, bypassing inference.
    pub fn feedback_column(mut self, column: impl Into<String>) -> Self {
        self.feedback_column = Some(column.into());
        self
    }

    /// Set the output directory for reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Enable or disable writing outputs to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        let config = AnalysisConfig {
            include_sentiment: self.include_sentiment.unwrap_or(true),
            include_categorization: self.include_categorization.unwrap_or(true),
            include_summaries: self.include_summaries.unwrap_or(true),
            include_suggestions: self.include_suggestions.unwrap_or(true),
            sample_limit: self.sample_limit.unwrap_or(20),
            max_suggestions: self.max_suggestions.unwrap_or(5),
            request_delay_ms: self.request_delay_ms.unwrap_or(100),
            max_chunks: self.max_chunks.unwrap_or(10),
            insight_scope: self.insight_scope.unwrap_or_default(),
            feedback_column: self.feedback_column,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("outputs")),
            output_name: self.output_name,
            save_to_disk: self.save_to_disk.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
