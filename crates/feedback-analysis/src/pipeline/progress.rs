//! Progress reporting for the analysis pipeline.
//!
//! Enrichment dominates run time (one provider round trip per row), so it
//! carries most of the progress weight and reports once per chunk.
//!
//! # Example
//!
//! ```rust,ignore
//! use feedback_analysis::AnalysisPipeline;
//!
//! let outcome = AnalysisPipeline::builder()
//!     .ai_provider(provider)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .analyze_file("reviews.csv")?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Reading and normalizing the input file
    Ingesting,
    /// Choosing the feedback column
    ColumnDetection,
    /// Classifying rows chunk by chunk
    Enrichment,
    /// Summaries and suggestions for the whole run
    Insights,
    /// Writing report files
    ReportGeneration,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl AnalysisStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ingesting => "Reading Input",
            Self::ColumnDetection => "Detecting Feedback Column",
            Self::Enrichment => "Analyzing Feedback",
            Self::Insights => "Generating Insights",
            Self::ReportGeneration => "Generating Reports",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run spent in this stage (0.0 - 1.0).
    ///
    /// The working stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Ingesting => 0.05,
            Self::ColumnDetection => 0.02,
            Self::Enrichment => 0.78,
            Self::Insights => 0.10,
            Self::ReportGeneration => 0.05,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Overall progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Ingesting => 0.0,
            Self::ColumnDetection => 0.05,
            Self::Enrichment => 0.07,
            Self::Insights => 0.85,
            Self::ReportGeneration => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: AnalysisStage,

    /// Optional detail, e.g. "Chunk 2/10"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: AnalysisStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            sub_stage: None,
            progress: overall(stage, stage_progress),
            stage_progress,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a progress update with item counts, e.g. completed chunks.
    pub fn with_items(
        stage: AnalysisStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            (current as f32 / total as f32).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            stage,
            sub_stage: Some(sub_stage.into()),
            progress: overall(stage, stage_progress),
            stage_progress,
            message: message.into(),
            items_processed: Some(current),
            items_total: Some(total),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: AnalysisStage::Complete,
            sub_stage: None,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: AnalysisStage::Failed,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }
}

fn overall(stage: AnalysisStage, stage_progress: f32) -> f32 {
    (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0)
}

/// Receiver of pipeline progress updates.
///
/// Implementations must be `Send + Sync` so a pipeline running on a worker
/// thread can report to a UI thread.
pub trait ProgressReporter: Send + Sync {
    /// Called at every stage transition and after every enrichment chunk.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
static_assertions::assert_impl_all!(AnalysisStage: Send, Sync, Copy);
