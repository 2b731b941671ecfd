//! The analysis pipeline and its builder.
//!
//! Wires ingestion, column detection, chunked enrichment and report writing
//! together, reporting progress at each stage.

use crate::ai::AIProvider;
use crate::analysis::{
    AccumulatedResult, ChunkPlan, FeedbackColumn, analyze_in_chunks, infer_feedback_column,
};
use crate::config::{AnalysisConfig, InsightScope};
use crate::error::{AnalysisError, Result};
use crate::ingest::{self, Normalized, RawInput};
use crate::pipeline::progress::{
    AnalysisStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::reporting::{FeedbackReport, ReportGenerator};
use crate::types::FormatLabel;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Base name used for output files when neither a name nor an input path is known.
const DEFAULT_OUTPUT_NAME: &str = "feedback";

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    /// Input path, when the run started from a file
    pub input_file: Option<String>,
    /// Base name of the output files
    pub name: String,
    pub format: FormatLabel,
    pub feedback_column: FeedbackColumn,
    /// Rows in the normalized dataset
    pub rows: usize,
    pub chunks: usize,
    pub duration_ms: u64,
    pub provider: String,
    pub model: Option<String>,
    pub result: AccumulatedResult,
    /// Files written by the pipeline (Markdown report and annotated CSV)
    pub files: Vec<PathBuf>,
}

impl AnalysisOutcome {
    /// Build the report for this run.
    pub fn report(&self, config: &AnalysisConfig) -> FeedbackReport {
        ReportGenerator::build_report(self, config)
    }
}

/// The feedback analysis pipeline.
///
/// Use [`AnalysisPipeline::builder()`] to create a pipeline; an AI provider is
/// required.
///
/// # Example
///
/// ```rust,ignore
/// use feedback_analysis::{AnalysisConfig, AnalysisPipeline};
/// use feedback_analysis::ai::OpenRouterProvider;
/// use std::sync::Arc;
///
/// let provider = Arc::new(OpenRouterProvider::new(api_key)?);
///
/// let outcome = AnalysisPipeline::builder()
///     .ai_provider(provider)
///     .config(AnalysisConfig::builder().max_chunks(4).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .analyze_file("reviews.csv")?;
/// ```
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    ai_provider: Arc<dyn AIProvider>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    reporter: ReportGenerator,
}

// Pipelines may be moved to a worker thread
static_assertions::assert_impl_all!(AnalysisPipeline: Send, Sync);

impl AnalysisPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> AnalysisPipelineBuilder {
        AnalysisPipelineBuilder::default()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The report writer configured with this pipeline's output directory.
    pub fn reporter(&self) -> &ReportGenerator {
        &self.reporter
    }

    /// Read, normalize and analyse a file.
    ///
    /// # Errors
    ///
    /// I/O errors reading the file, a missing explicit column, an empty dataset
    /// with no columns, or a failure writing reports. Malformed content never
    /// errors; it is normalized to a placeholder.
    pub fn analyze_file(&self, path: impl AsRef<Path>) -> Result<AnalysisOutcome> {
        let path = path.as_ref();
        self.run(|| {
            self.report_progress(ProgressUpdate::new(
                AnalysisStage::Ingesting,
                0.0,
                format!("Reading {}...", path.display()),
            ));
            let raw = RawInput::from_path(path)?;
            let normalized = ingest::normalize(&raw);
            self.analyze_internal(normalized, Some(path))
        })
    }

    /// Normalize and analyse in-memory content, e.g. an upload.
    pub fn analyze_bytes(
        &self,
        bytes: impl Into<Vec<u8>>,
        extension: &str,
    ) -> Result<AnalysisOutcome> {
        let raw = RawInput::new(bytes, extension);
        self.run(|| {
            self.report_progress(ProgressUpdate::new(
                AnalysisStage::Ingesting,
                0.0,
                "Normalizing input...",
            ));
            self.analyze_internal(ingest::normalize(&raw), None)
        })
    }

    /// Analyse an already normalized dataset.
    pub fn analyze_normalized(&self, normalized: Normalized) -> Result<AnalysisOutcome> {
        self.run(|| self.analyze_internal(normalized, None))
    }

    fn run(&self, f: impl FnOnce() -> Result<AnalysisOutcome>) -> Result<AnalysisOutcome> {
        match f() {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Analyzed {} feedback entries",
                    outcome.result.total_classified()
                )));
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn analyze_internal(
        &self,
        normalized: Normalized,
        input: Option<&Path>,
    ) -> Result<AnalysisOutcome> {
        let start_time = Instant::now();
        let Normalized { dataset, label } = normalized;

        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Ingesting,
            1.0,
            format!(
                "Loaded {} rows x {} columns ({})",
                dataset.height(),
                dataset.width(),
                label
            ),
        ));

        // Step 1: Feedback column
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::ColumnDetection,
            0.0,
            "Detecting feedback column...",
        ));
        let column = match &self.config.feedback_column {
            Some(name) => FeedbackColumn::explicit(&dataset, name)?,
            None => infer_feedback_column(&dataset)?,
        };
        info!("Feedback column: '{}' ({:?})", column.name, column.reason);
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::ColumnDetection,
            1.0,
            format!("Using column '{}'", column.name),
        ));

        // Step 2: Enrichment
        let chunks = ChunkPlan::new(dataset.height(), self.config.max_chunks).len();
        self.report_progress(ProgressUpdate::with_items(
            AnalysisStage::Enrichment,
            format!("Chunk 0/{chunks}"),
            0,
            chunks,
            format!("Analyzing {} rows with {}...", dataset.height(), self.ai_provider.name()),
        ));

        let result = analyze_in_chunks(
            &dataset,
            &column,
            &self.config,
            self.ai_provider.as_ref(),
            |done, total| {
                debug!("Chunk {}/{} done", done, total);
                self.report_progress(ProgressUpdate::with_items(
                    AnalysisStage::Enrichment,
                    format!("Chunk {done}/{total}"),
                    done,
                    total,
                    format!("Processed chunk {done} of {total}"),
                ));
            },
        )?;

        if self.config.insight_scope == InsightScope::Run && self.config.wants_insights() {
            self.report_progress(ProgressUpdate::new(
                AnalysisStage::Insights,
                1.0,
                format!(
                    "Generated insights for {} categories",
                    result.category_samples.len()
                ),
            ));
        }

        let mut outcome = AnalysisOutcome {
            input_file: input.map(|p| p.display().to_string()),
            name: output_base_name(self.config.output_name.as_deref(), input),
            format: label,
            feedback_column: column,
            rows: dataset.height(),
            chunks,
            duration_ms: start_time.elapsed().as_millis() as u64,
            provider: self.ai_provider.name().to_string(),
            model: self.ai_provider.model().map(str::to_string),
            result,
            files: Vec::new(),
        };

        // Step 3: Reports
        if self.config.save_to_disk {
            self.report_progress(ProgressUpdate::new(
                AnalysisStage::ReportGeneration,
                0.0,
                "Saving report files...",
            ));
            outcome.files = self.write_outputs(&outcome)?;
            self.report_progress(ProgressUpdate::new(
                AnalysisStage::ReportGeneration,
                1.0,
                "Report files saved",
            ));
        }

        Ok(outcome)
    }

    fn write_outputs(&self, outcome: &AnalysisOutcome) -> Result<Vec<PathBuf>> {
        let report = outcome.report(&self.config);
        let markdown = self
            .reporter
            .write_markdown(&report, &outcome.name)
            .map_err(|e| AnalysisError::ReportGenerationFailed(e.to_string()))?;
        let annotated = self
            .reporter
            .write_annotated_dataset(&outcome.result.processed_data, &outcome.name)
            .map_err(|e| AnalysisError::ReportGenerationFailed(e.to_string()))?;
        Ok(vec![markdown, annotated])
    }
}

/// `output_name`, else the input file stem, else `"feedback"`.
fn output_base_name(output_name: Option<&str>, input: Option<&Path>) -> String {
    output_name
        .map(str::to_string)
        .or_else(|| {
            input
                .and_then(|p| p.file_stem())
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string())
}

/// Builder for creating an [`AnalysisPipeline`] instance.
#[derive(Default)]
pub struct AnalysisPipelineBuilder {
    config: Option<AnalysisConfig>,
    ai_provider: Option<Arc<dyn AIProvider>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(AnalysisPipelineBuilder: Send);

impl AnalysisPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the AI provider that classifies and summarizes feedback.
    ///
    /// `Arc` lets one provider (and its HTTP client) serve several pipelines.
    pub fn ai_provider(mut self, provider: Arc<dyn AIProvider>) -> Self {
        self.ai_provider = Some(provider);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let pipeline = AnalysisPipeline::builder()
    ///     .ai_provider(provider)
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {:?}: {}",
    ///             update.progress * 100.0,
    ///             update.stage,
    ///             update.message
    ///         );
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidConfig`] if the configuration fails validation,
    /// [`AnalysisError::MissingProvider`] if no AI provider was set.
    pub fn build(self) -> Result<AnalysisPipeline> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;

        let ai_provider = self.ai_provider.ok_or(AnalysisError::MissingProvider)?;
        let reporter = ReportGenerator::new(config.output_dir.clone());

        Ok(AnalysisPipeline {
            config,
            ai_provider,
            progress_reporter: self.progress_reporter,
            reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Enrichment, Sentiment, Suggestion};
    use std::sync::Mutex;

    struct StaticProvider;

    impl AIProvider for StaticProvider {
        fn classify_feedback(&self, _text: &str) -> anyhow::Result<Enrichment> {
            Ok(Enrichment::new(Sentiment::Positive, Category::Other, vec![]))
        }

        fn summarize_category(&self, _: Category, _: &[String]) -> anyhow::Result<String> {
            Ok("fine".to_string())
        }

        fn suggest_improvements(
            &self,
            _: Category,
            _: &[String],
        ) -> anyhow::Result<Vec<Suggestion>> {
            Ok(vec![])
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    fn quiet_config() -> AnalysisConfig {
        AnalysisConfig::builder()
            .request_delay_ms(0)
            .save_to_disk(false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_provider() {
        let err = AnalysisPipeline::builder().build().err().unwrap();
        assert!(matches!(err, AnalysisError::MissingProvider));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = AnalysisConfig {
            max_chunks: 0,
            ..Default::default()
        };
        let err = AnalysisPipeline::builder()
            .config(config)
            .ai_provider(Arc::new(StaticProvider))
            .build()
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_analyze_bytes_reports_progress() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let pipeline = AnalysisPipeline::builder()
            .config(quiet_config())
            .ai_provider(Arc::new(StaticProvider))
            .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        let outcome = pipeline
            .analyze_bytes("id,comment\n1,Lovely trip\n2,Would go again", "csv")
            .unwrap();

        assert_eq!(outcome.feedback_column.name, "comment");
        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.chunks, 2);
        assert_eq!(outcome.name, "feedback");
        assert_eq!(outcome.provider, "static");
        assert!(outcome.files.is_empty());
        assert_eq!(outcome.result.sentiment_count(Sentiment::Positive), 2);

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&AnalysisStage::Ingesting));
        assert!(stages.contains(&AnalysisStage::Enrichment));
        assert!(!stages.contains(&AnalysisStage::ReportGeneration));
        assert_eq!(stages.last(), Some(&AnalysisStage::Complete));
    }

    #[test]
    fn test_missing_explicit_column_fails() {
        let config = AnalysisConfig::builder()
            .request_delay_ms(0)
            .save_to_disk(false)
            .feedback_column("nope")
            .build()
            .unwrap();
        let failed = Arc::new(Mutex::new(false));
        let failed_clone = failed.clone();

        let pipeline = AnalysisPipeline::builder()
            .config(config)
            .ai_provider(Arc::new(StaticProvider))
            .on_progress(move |update| {
                if update.stage == AnalysisStage::Failed {
                    *failed_clone.lock().unwrap() = true;
                }
            })
            .build()
            .unwrap();

        let err = pipeline.analyze_bytes("feedback\nok", "csv").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(*failed.lock().unwrap());
    }

    #[test]
    fn test_output_base_name() {
        assert_eq!(output_base_name(Some("custom"), None), "custom");
        assert_eq!(
            output_base_name(None, Some(Path::new("data/reviews.json"))),
            "reviews"
        );
        assert_eq!(output_base_name(None, None), "feedback");
    }
}
