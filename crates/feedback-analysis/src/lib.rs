//! Customer Feedback Analysis Library
//!
//! Turns loosely structured customer feedback files into an annotated table
//! and an aggregate report, using an LLM to classify every entry.
//!
//! # Overview
//!
//! - **Ingestion**: CSV (delimiter sniffing), JSON (strict, Python-literal and
//!   line-based fallbacks) and plain text are normalized into one table shape.
//!   Malformed input never fails; it degrades to a placeholder row.
//! - **Column Inference**: the feedback column is picked by name, by a
//!   text heuristic, or falls back to the first column.
//! - **Enrichment**: each row gets a sentiment, a category and up to three key
//!   points from an [`ai::AIProvider`]; provider failures become fallbacks.
//! - **Aggregation**: distributions, per-category summaries and improvement
//!   suggestions, merged across chunks.
//! - **Reporting**: JSON and Markdown reports plus an annotated CSV export.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use feedback_analysis::{AnalysisConfig, AnalysisPipeline};
//! use feedback_analysis::ai::GeminiProvider;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(GeminiProvider::new(api_key)?);
//!
//! let pipeline = AnalysisPipeline::builder()
//!     .ai_provider(provider)
//!     .config(AnalysisConfig::builder().output_dir("reports").build()?)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//!
//! let outcome = pipeline.analyze_file("reviews.csv")?;
//! println!("{:?}", outcome.result.sentiment_distribution);
//! ```
//!
//! # Working Without the Pipeline
//!
//! Every stage is usable on its own:
//!
//! ```rust,ignore
//! use feedback_analysis::{RawInput, normalize, infer_feedback_column, analyze_in_chunks};
//!
//! let normalized = normalize(&RawInput::from_path("reviews.json")?);
//! let column = infer_feedback_column(&normalized.dataset)?;
//! let result = analyze_in_chunks(&normalized.dataset, &column, &config, &provider, |_, _| {})?;
//! ```

pub mod ai;
pub mod analysis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{
    AccumulatedResult, ChunkPlan, FeedbackColumn, SelectionReason, analyze_in_chunks,
    enrich_and_aggregate, generate_insights, infer_feedback_column,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ConfigValidationError, InsightScope};
pub use dataset::{ColumnInfo, Dataset};
pub use error::{AnalysisError, Result as AnalysisResult, ResultExt};
pub use ingest::{FileFormat, Normalized, RawInput, normalize};
pub use pipeline::{
    AnalysisOutcome, AnalysisPipeline, AnalysisPipelineBuilder, AnalysisStage,
    ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
pub use reporting::{FeedbackReport, ReportGenerator};
pub use types::{Category, Enrichment, FormatLabel, Sentiment, Suggestion};
