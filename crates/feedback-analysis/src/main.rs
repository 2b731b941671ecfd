//! CLI entry point for the feedback analysis pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use feedback_analysis::utils::truncate_str;
use feedback_analysis::{
    AnalysisConfig, AnalysisOutcome, AnalysisPipeline, FeedbackReport, InsightScope, RawInput,
    infer_feedback_column, normalize,
};
use std::path::Path;
use tracing::{error, info};

#[cfg(feature = "ai")]
use feedback_analysis::ai::{
    AIProvider, GeminiConfig, GeminiProvider, OpenRouterConfig, OpenRouterProvider,
};
#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;

/// Hosted model used to classify and summarize feedback
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProvider {
    /// Google Gemini (GEMINI_API_KEY or GOOGLE_API_KEY)
    Gemini,
    /// OpenRouter (OPENROUTER_API_KEY)
    Openrouter,
}

/// CLI-compatible insight scope enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliInsightScope {
    /// Each chunk summarizes its own feedback; later chunks overwrite earlier ones
    PerChunk,
    /// Summaries and suggestions are generated once from the whole run
    Run,
}

impl From<CliInsightScope> for InsightScope {
    fn from(cli: CliInsightScope) -> Self {
        match cli {
            CliInsightScope::PerChunk => InsightScope::PerChunk,
            CliInsightScope::Run => InsightScope::Run,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "AI-assisted customer feedback analysis",
    long_about = "Normalizes CSV, JSON or text feedback files, classifies every entry \
                  (sentiment, category, key points) with an LLM and writes a report.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  GEMINI_API_KEY        API key for Google Gemini (GOOGLE_API_KEY also accepted)\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter\n\n\
                  EXAMPLES:\n  \
                  # Analyze a CSV export\n  \
                  feedback-analysis -i reviews.csv\n\n  \
                  # Preview the detected feedback column without calling the model\n  \
                  feedback-analysis -i reviews.json --dry-run\n\n  \
                  # Use OpenRouter and print the report as JSON\n  \
                  feedback-analysis -i reviews.txt --provider openrouter --json"
)]
struct Args {
    /// Path to the feedback file (.csv, .json or .txt)
    #[arg(short, long)]
    input: String,

    /// Output directory for reports
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses the input file name
    #[arg(long)]
    output_name: Option<String>,

    /// Column holding the feedback text
    ///
    /// If not specified, the column is detected automatically
    #[arg(long)]
    column: Option<String>,

    /// AI provider used for analysis
    #[arg(long, value_enum, default_value = "gemini")]
    provider: CliProvider,

    /// Override the provider's default model
    #[arg(long)]
    model: Option<String>,

    /// Omit the sentiment section from the report
    #[arg(long)]
    no_sentiment: bool,

    /// Omit the category section from the report
    #[arg(long)]
    no_categories: bool,

    /// Skip per-category summaries
    #[arg(long)]
    no_summaries: bool,

    /// Skip per-category improvement suggestions
    #[arg(long)]
    no_suggestions: bool,

    /// Maximum number of chunks the rows are split into
    #[arg(long, default_value = "10")]
    max_chunks: usize,

    /// Maximum feedback samples per category sent for summaries and suggestions
    #[arg(long, default_value = "20")]
    sample_limit: usize,

    /// Pause after every classification request, in milliseconds
    #[arg(long, default_value = "100")]
    request_delay_ms: u64,

    /// When summaries and suggestions are generated
    #[arg(long, value_enum, default_value = "per-chunk")]
    insight_scope: CliInsightScope,

    /// Preview the dataset and detected feedback column without analysis
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write the JSON report to the output directory
    ///
    /// The report will be saved as <name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Do not write the Markdown report or annotated CSV
    #[arg(long)]
    no_save: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    if args.dry_run {
        return run_dry_run(&args);
    }

    let mut config_builder = AnalysisConfig::builder()
        .output_dir(&args.output)
        .include_sentiment(!args.no_sentiment)
        .include_categorization(!args.no_categories)
        .include_summaries(!args.no_summaries)
        .include_suggestions(!args.no_suggestions)
        .max_chunks(args.max_chunks)
        .sample_limit(args.sample_limit)
        .request_delay_ms(args.request_delay_ms)
        .insight_scope(args.insight_scope.into())
        .save_to_disk(!args.no_save);

    if let Some(ref name) = args.output_name {
        config_builder = config_builder.output_name(name);
    }

    if let Some(ref column) = args.column {
        config_builder = config_builder.feedback_column(column);
    }

    let config = config_builder.build()?;
    let pipeline = build_pipeline(&args, config)?;

    run_pipeline(&pipeline, &args)
}

/// Run dry-run mode: normalize the file and show the detected column.
///
/// Uses `println!` on purpose; the preview is the output of `--dry-run`.
fn run_dry_run(args: &Args) -> Result<()> {
    let raw = RawInput::from_path(&args.input)?;
    let normalized = normalize(&raw);
    let dataset = &normalized.dataset;

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of feedback analysis");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input);
    println!("  Parsed as: {}", normalized.label);
    println!("  Rows: {}", dataset.height());
    println!("  Columns: {}", dataset.width());
    if normalized.label.is_degraded() {
        println!("  WARNING: the file could not be parsed; a placeholder row was used");
    }
    println!();

    println!("COLUMNS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<24} {:<10} {:<10} {:<10} {:<30}",
        "Column", "Type", "Non-null", "Missing %", "Sample"
    );
    println!("{}", "-".repeat(86));
    for col in dataset.column_info() {
        println!(
            "{:<24} {:<10} {:<10} {:<10.1} {:<30}",
            truncate_str(&col.name, 23),
            col.dtype,
            col.non_null_count,
            col.null_percentage,
            truncate_str(col.sample_value.as_deref().unwrap_or("-"), 30)
        );
    }
    println!();

    println!("FEEDBACK COLUMN");
    println!("{}", "-".repeat(40));
    match &args.column {
        Some(column) if dataset.has_column(column) => {
            println!("  {} (user-specified)", column);
        }
        Some(column) => {
            println!("  WARNING: Specified column '{}' not found in dataset!", column);
            println!("  Available columns: {:?}", dataset.column_names());
        }
        None => match infer_feedback_column(dataset) {
            Ok(column) => println!("  {} (detected: {:?})", column.name, column.reason),
            Err(e) => println!("  Could not detect a feedback column: {}", e),
        },
    }
    println!();

    println!("OUTPUT FILES (will be created)");
    println!("{}", "-".repeat(40));
    let name = args
        .output_name
        .clone()
        .unwrap_or_else(|| extract_file_stem(&args.input));
    if !args.no_save {
        println!("  - {}/{}_report.md", args.output, name);
        println!("  - {}/{}_annotated.csv", args.output, name);
    }
    if args.emit_report {
        println!("  - {}/{}_report.json", args.output, name);
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To run the analysis, run without --dry-run");
    println!("{}", "=".repeat(80));

    Ok(())
}

/// Build the pipeline with the selected provider.
#[cfg(feature = "ai")]
fn build_pipeline(args: &Args, config: AnalysisConfig) -> Result<AnalysisPipeline> {
    let provider: Arc<dyn AIProvider> = match args.provider {
        CliProvider::Gemini => {
            let api_key = env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("GOOGLE_API_KEY"))
                .map_err(|_| anyhow!("GEMINI_API_KEY (or GOOGLE_API_KEY) is not set"))?;
            let mut provider_config = GeminiConfig::builder();
            if let Some(ref model) = args.model {
                provider_config = provider_config.model(model);
            }
            Arc::new(GeminiProvider::with_config(
                api_key,
                provider_config.build(),
            )?)
        }
        CliProvider::Openrouter => {
            let api_key = env::var("OPENROUTER_API_KEY")
                .map_err(|_| anyhow!("OPENROUTER_API_KEY is not set"))?;
            let mut provider_config = OpenRouterConfig::builder();
            if let Some(ref model) = args.model {
                provider_config = provider_config.model(model);
            }
            Arc::new(OpenRouterProvider::with_config(
                api_key,
                provider_config.build(),
            )?)
        }
    };

    info!(
        "Using {} ({})",
        provider.name(),
        provider.model().unwrap_or("default model")
    );

    let mut builder = AnalysisPipeline::builder()
        .config(config)
        .ai_provider(provider);

    if !args.quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Without the "ai" feature there is no provider to analyse with.
#[cfg(not(feature = "ai"))]
fn build_pipeline(_args: &Args, _config: AnalysisConfig) -> Result<AnalysisPipeline> {
    Err(anyhow!(
        "AI support not compiled in. Rebuild with --features ai, or use --dry-run."
    ))
}

/// Run pipeline and print results.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn run_pipeline(pipeline: &AnalysisPipeline, args: &Args) -> Result<()> {
    info!("{}", "=".repeat(80));
    info!("Starting feedback analysis...");
    info!("{}", "=".repeat(80));

    let outcome = pipeline.analyze_file(&args.input).map_err(|e| {
        error!("Analysis failed: {}", e);
        anyhow!("Analysis failed: {}", e)
    })?;

    let report = outcome.report(pipeline.config());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report {
        let report_path = pipeline
            .reporter()
            .write_report_to_file(&report, &outcome.name)?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&outcome, &report);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("feedback")
        .to_string()
}

/// Print a human-readable summary of the analysis.
fn print_human_readable_summary(outcome: &AnalysisOutcome, report: &FeedbackReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!("FEEDBACK ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({}, {} rows)",
        outcome.input_file.as_deref().unwrap_or("-"),
        outcome.format,
        outcome.rows
    );
    println!("Column: {}", outcome.feedback_column.name);
    println!(
        "Model:  {} {}",
        outcome.provider,
        outcome.model.as_deref().unwrap_or("")
    );
    println!("Duration: {}ms ({} chunks)", outcome.duration_ms, outcome.chunks);
    println!();

    println!("{}", report.executive_summary.text);
    println!();

    if let Some(ref table) = report.sentiment {
        println!("Sentiment:");
        for row in &table.rows {
            println!("  {:<10} {:>6} ({:.1}%)", row.label, row.count, row.percentage);
        }
        println!();
    }

    if let Some(ref table) = report.categories {
        println!("Categories:");
        for row in &table.rows {
            println!("  {:<22} {:>6} ({:.1}%)", row.label, row.count, row.percentage);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in report.warnings.iter().take(5) {
            println!("  ! {}", truncate_str(warning, 100));
        }
        if report.warnings.len() > 5 {
            println!("  ... and {} more", report.warnings.len() - 5);
        }
        println!();
    }

    if !outcome.files.is_empty() {
        println!("Files:");
        for file in &outcome.files {
            println!("  - {}", file.display());
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save the JSON report");
    println!("{}", "=".repeat(80));
}
