use crate::analysis::AccumulatedResult;
use crate::config::AnalysisConfig;
use crate::dataset::Dataset;
use crate::pipeline::AnalysisOutcome;
use crate::types::{Category, Sentiment, Suggestion};
use crate::utils::percentage;
use anyhow::Result;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// Report Types
// ============================================================================

/// Everything a reader needs from one analysis run.
///
/// Serialized for `--json` and `--emit-report`, and rendered to Markdown.
/// The sentiment and category tables are `None` when their sections are
/// disabled in [`AnalysisConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file, when the run started from one
    pub input_file: Option<String>,
    /// How the input was normalized, e.g. "csv" or "json-like text"
    pub input_format: String,
    pub feedback_column: String,
    pub provider: String,
    pub model: Option<String>,
    pub duration_ms: u64,

    pub executive_summary: ExecutiveSummary,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<DistributionTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<DistributionTable>,

    pub category_summaries: Vec<CategorySummary>,
    pub improvement_suggestions: Vec<CategorySuggestions>,

    pub warnings: Vec<String>,
    pub conclusion: String,
}

/// Headline numbers plus a ready-to-print paragraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    /// Rows in the analysed dataset
    pub total_rows: usize,
    /// Rows that were classified (blank feedback is not counted)
    pub total_feedback: usize,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub top_category: Option<Category>,
    pub top_category_count: usize,
    pub text: String,
}

/// Count table with a percentage per row and a total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionTable {
    pub rows: Vec<DistributionRow>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRow {
    /// Machine label, e.g. "food_dining"
    pub key: String,
    /// Display label, e.g. "Food Dining"
    pub label: String,
    pub count: usize,
    /// Share of the total, rounded to one decimal
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySuggestions {
    pub category: Category,
    pub title: String,
    pub suggestions: Vec<Suggestion>,
}

// ============================================================================
// Generator
// ============================================================================

/// Writes report files below an output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
        }
    }
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build the report for a finished run.
    pub fn build_report(outcome: &AnalysisOutcome, config: &AnalysisConfig) -> FeedbackReport {
        let result = &outcome.result;
        let total = result.total_classified();

        let executive_summary = executive_summary(result, outcome.rows);

        let sentiment = config
            .include_sentiment
            .then(|| sentiment_table(result));
        let categories = config
            .include_categorization
            .then(|| category_table(result));

        let category_summaries = result
            .category_summaries
            .iter()
            .filter(|(_, summary)| !summary.trim().is_empty())
            .map(|(&category, summary)| CategorySummary {
                category,
                title: category.display_name(),
                summary: summary.clone(),
            })
            .collect();

        let improvement_suggestions = result
            .improvement_suggestions
            .iter()
            .filter(|(_, suggestions)| !suggestions.is_empty())
            .map(|(&category, suggestions)| CategorySuggestions {
                category,
                title: category.display_name(),
                suggestions: suggestions.clone(),
            })
            .collect();

        FeedbackReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: outcome.input_file.clone(),
            input_format: outcome.format.to_string(),
            feedback_column: outcome.feedback_column.name.clone(),
            provider: outcome.provider.clone(),
            model: outcome.model.clone(),
            duration_ms: outcome.duration_ms,
            executive_summary,
            sentiment,
            categories,
            category_summaries,
            improvement_suggestions,
            warnings: result.warnings.clone(),
            conclusion: format!(
                "This report provides an analysis of {total} customer feedback entries. \
                The insights and suggestions presented should be considered as part of a \
                comprehensive service improvement strategy. Regular analysis of customer \
                feedback is recommended to track progress and identify emerging trends."
            ),
        }
    }

    /// Write a report to `<base>_report.json`.
    pub fn write_report_to_file(&self, report: &FeedbackReport, base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(format!("{}_report.json", base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }

    /// Write the Markdown rendering of a report to `<base>_report.md`.
    pub fn write_markdown(&self, report: &FeedbackReport, base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join(format!("{}_report.md", base_name));
        fs::write(&path, render_markdown(report))?;

        info!("Markdown report saved: {}", path.display());
        Ok(path)
    }

    /// Export the annotated rows to `<base>_annotated.csv`.
    ///
    /// Key points are joined with `"; "` since CSV has no list type.
    pub fn write_annotated_dataset(&self, dataset: &Dataset, base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let mut frame = dataset.export_frame()?;
        let path = self.output_dir.join(format!("{}_annotated.csv", base_name));
        let mut file = File::create(&path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut frame)?;

        info!("Annotated dataset saved: {}", path.display());
        Ok(path)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn executive_summary(result: &AccumulatedResult, total_rows: usize) -> ExecutiveSummary {
    let total = result.total_classified();
    let positive = percentage(result.sentiment_count(Sentiment::Positive), total);
    let negative = percentage(result.sentiment_count(Sentiment::Negative), total);
    let top = result.top_category();

    let mut text = format!(
        "This report analyzes {total} customer feedback entries. \
        Overall, {positive:.1}% of the feedback is positive and {negative:.1}% is negative."
    );
    match top {
        Some((category, count)) => {
            let _ = write!(
                text,
                " The most discussed category is '{}', accounting for {} entries.",
                category.display_name(),
                count
            );
        }
        None => text.push_str(" No feedback categories were identified."),
    }

    ExecutiveSummary {
        total_rows,
        total_feedback: total,
        positive_percentage: round1(positive),
        negative_percentage: round1(negative),
        top_category: top.map(|(category, _)| category),
        top_category_count: top.map_or(0, |(_, count)| count),
        text,
    }
}

fn sentiment_table(result: &AccumulatedResult) -> DistributionTable {
    let total = result.total_classified();
    let rows = Sentiment::ALL
        .iter()
        .map(|&sentiment| {
            let count = result.sentiment_count(sentiment);
            DistributionRow {
                key: sentiment.as_str().to_string(),
                label: sentiment.display_name().to_string(),
                count,
                percentage: round1(percentage(count, total)),
            }
        })
        .collect();
    DistributionTable { rows, total }
}

/// Categories that occurred, most frequent first.
fn category_table(result: &AccumulatedResult) -> DistributionTable {
    let total = result.total_classified();
    let mut counts: Vec<(Category, usize)> = result
        .category_distribution
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(&category, &count)| (category, count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let rows = counts
        .into_iter()
        .map(|(category, count)| DistributionRow {
            key: category.as_str().to_string(),
            label: category.display_name(),
            count,
            percentage: round1(percentage(count, total)),
        })
        .collect();
    DistributionTable { rows, total }
}

/// Render a report as Markdown.
pub fn render_markdown(report: &FeedbackReport) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# Feedback Analysis Report\n");
    let _ = writeln!(md, "Generated on: {}\n", report.generated_at);
    if let Some(input) = &report.input_file {
        let _ = writeln!(md, "- Input: `{}` ({})", input, report.input_format);
    } else {
        let _ = writeln!(md, "- Input format: {}", report.input_format);
    }
    let _ = writeln!(md, "- Feedback column: `{}`", report.feedback_column);
    match &report.model {
        Some(model) => {
            let _ = writeln!(md, "- Provider: {} ({})\n", report.provider, model);
        }
        None => {
            let _ = writeln!(md, "- Provider: {}\n", report.provider);
        }
    }

    let _ = writeln!(md, "## Executive Summary\n");
    let _ = writeln!(md, "{}\n", report.executive_summary.text);

    if let Some(table) = &report.sentiment {
        let _ = writeln!(md, "## Sentiment Analysis\n");
        if table.total == 0 {
            let _ = writeln!(md, "No sentiment data available.\n");
        } else {
            write_table(&mut md, "Sentiment", table);
        }
    }

    if let Some(table) = &report.categories {
        let _ = writeln!(md, "## Feedback Categories\n");
        if table.rows.is_empty() {
            let _ = writeln!(md, "No category data available.\n");
        } else {
            write_table(&mut md, "Category", table);
        }
    }

    let _ = writeln!(md, "## Category Summaries\n");
    if report.category_summaries.is_empty() {
        let _ = writeln!(md, "No category summaries available.\n");
    }
    for summary in &report.category_summaries {
        let _ = writeln!(md, "### {}\n\n{}\n", summary.title, summary.summary.trim());
    }

    let _ = writeln!(md, "## Improvement Suggestions\n");
    if report.improvement_suggestions.is_empty() {
        let _ = writeln!(md, "No improvement suggestions available.\n");
    }
    for group in &report.improvement_suggestions {
        let _ = writeln!(md, "### {}\n", group.title);
        for suggestion in &group.suggestions {
            let _ = writeln!(md, "- **{}**: {}", suggestion.title, suggestion.explanation);
        }
        md.push('\n');
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(md, "## Warnings\n");
        for warning in &report.warnings {
            let _ = writeln!(md, "- {}", warning);
        }
        md.push('\n');
    }

    let _ = writeln!(md, "## Conclusion\n");
    let _ = writeln!(md, "{}", report.conclusion);
    md
}

fn write_table(md: &mut String, heading: &str, table: &DistributionTable) {
    let _ = writeln!(md, "| {} | Count | Percentage |", heading);
    let _ = writeln!(md, "|---|---:|---:|");
    for row in &table.rows {
        let _ = writeln!(md, "| {} | {} | {:.1}% |", row.label, row.count, row.percentage);
    }
    let total_pct = if table.total > 0 { 100.0 } else { 0.0 };
    let _ = writeln!(md, "| Total | {} | {:.1}% |\n", table.total, total_pct);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FeedbackColumn, SelectionReason};
    use crate::dataset::FEEDBACK_COLUMN;
    use crate::types::{Enrichment, FormatLabel};

    fn outcome() -> AnalysisOutcome {
        let lines: Vec<String> = ["Great hotel", "Late bus", "Cold bus", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut dataset = Dataset::from_lines(FEEDBACK_COLUMN, &lines);
        dataset
            .annotate(&[
                Enrichment::new(
                    Sentiment::Positive,
                    Category::Accommodation,
                    vec!["great".into()],
                ),
                Enrichment::new(
                    Sentiment::Negative,
                    Category::Transportation,
                    vec!["late".into(), "bus".into()],
                ),
                Enrichment::new(Sentiment::Negative, Category::Transportation, vec![]),
                Enrichment::default(),
            ])
            .unwrap();

        let mut result = AccumulatedResult::default();
        result.record(Sentiment::Positive, Category::Accommodation, "Great hotel");
        result.record(Sentiment::Negative, Category::Transportation, "Late bus");
        result.record(Sentiment::Negative, Category::Transportation, "Cold bus");
        result
            .category_summaries
            .insert(Category::Transportation, "Buses are unreliable.".into());
        result.improvement_suggestions.insert(
            Category::Transportation,
            vec![Suggestion::new("Newer fleet", "Replace old buses.")],
        );
        result.warnings.push("one row failed".into());
        result.processed_data = dataset;

        AnalysisOutcome {
            input_file: Some("reviews.csv".into()),
            name: "reviews".into(),
            format: FormatLabel::Csv,
            feedback_column: FeedbackColumn {
                name: FEEDBACK_COLUMN.into(),
                reason: SelectionReason::Vocabulary,
            },
            rows: 4,
            chunks: 1,
            duration_ms: 12,
            provider: "mock".into(),
            model: None,
            result,
            files: Vec::new(),
        }
    }

    #[test]
    fn test_build_report_tables() {
        let report = ReportGenerator::build_report(&outcome(), &AnalysisConfig::default());

        let sentiment = report.sentiment.as_ref().unwrap();
        assert_eq!(sentiment.total, 3);
        assert_eq!(sentiment.rows[0].key, "positive");
        assert_eq!(sentiment.rows[0].percentage, 33.3);
        assert_eq!(sentiment.rows[2].count, 2);

        let categories = report.categories.as_ref().unwrap();
        assert_eq!(categories.rows[0].label, "Transportation");
        assert_eq!(categories.rows[0].count, 2);
        assert_eq!(categories.rows.len(), 2);

        assert_eq!(report.executive_summary.total_rows, 4);
        assert_eq!(
            report.executive_summary.top_category,
            Some(Category::Transportation)
        );
        assert!(report.executive_summary.text.contains("analyzes 3 customer"));
        assert!(report.executive_summary.text.contains("66.7% is negative"));
    }

    #[test]
    fn test_disabled_sections_are_omitted() {
        let config = AnalysisConfig::builder()
            .include_sentiment(false)
            .include_categorization(false)
            .build()
            .unwrap();
        let report = ReportGenerator::build_report(&outcome(), &config);
        assert!(report.sentiment.is_none());
        assert!(report.categories.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("sentiment").is_none());

        let md = render_markdown(&report);
        assert!(!md.contains("## Sentiment Analysis"));
        assert!(md.contains("## Executive Summary"));
    }

    #[test]
    fn test_markdown_sections() {
        let report = ReportGenerator::build_report(&outcome(), &AnalysisConfig::default());
        let md = render_markdown(&report);

        assert!(md.starts_with("# Feedback Analysis Report"));
        assert!(md.contains("| Negative | 2 | 66.7% |"));
        assert!(md.contains("| Total | 3 | 100.0% |"));
        assert!(md.contains("### Transportation\n\nBuses are unreliable."));
        assert!(md.contains("- **Newer fleet**: Replace old buses."));
        assert!(md.contains("## Warnings\n\n- one row failed"));
        assert!(md.contains("## Conclusion"));
    }

    #[test]
    fn test_empty_result_report() {
        let mut empty = outcome();
        empty.result = AccumulatedResult::default();
        let report = ReportGenerator::build_report(&empty, &AnalysisConfig::default());

        assert_eq!(report.executive_summary.total_feedback, 0);
        assert_eq!(report.executive_summary.positive_percentage, 0.0);
        assert!(report.executive_summary.top_category.is_none());

        let md = render_markdown(&report);
        assert!(md.contains("No sentiment data available."));
        assert!(md.contains("No category data available."));
        assert!(md.contains("No category summaries available."));
    }
}
