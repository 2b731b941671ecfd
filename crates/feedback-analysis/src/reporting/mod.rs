//! Report generation module.
//!
//! A [`FeedbackReport`] is built from a finished
//! [`AnalysisOutcome`](crate::pipeline::AnalysisOutcome) and can be:
//! - printed as JSON to stdout (`--json` CLI flag)
//! - written as `<name>_report.json` (`--emit-report` CLI flag)
//! - rendered to `<name>_report.md`
//!
//! The annotated rows are exported separately as `<name>_annotated.csv`.
//!
//! # Example
//!
//! ```rust,ignore
//! use feedback_analysis::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report(&outcome, &config);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new("outputs");
//! generator.write_markdown(&report, "reviews")?;
//! generator.write_annotated_dataset(&outcome.result.processed_data, "reviews")?;
//! ```

mod generator;

pub use generator::{
    CategorySuggestions, CategorySummary, DistributionRow, DistributionTable, ExecutiveSummary,
    FeedbackReport, ReportGenerator, render_markdown,
};
