//! Row-by-row enrichment and per-category insight generation.
//!
//! Provider failures never abort a run. A failed classification gives the
//! row the fallback enrichment, a failed summary or suggestion request gives
//! the category a fallback insight, and a failed chunk becomes a warning.

use std::thread;

use tracing::{debug, info, warn};

use super::aggregate::AccumulatedResult;
use super::chunking::ChunkPlan;
use super::column::FeedbackColumn;
use crate::ai::AIProvider;
use crate::config::{AnalysisConfig, InsightScope};
use crate::dataset::Dataset;
use crate::error::{AnalysisError, Result};
use crate::types::{Enrichment, Suggestion};
use crate::utils::truncate_str;

/// Characters of feedback text quoted in warnings.
const WARNING_PREVIEW_CHARS: usize = 50;

/// Classify every row of `dataset` and aggregate the results.
///
/// Null, empty and whitespace-only feedback is not sent to the provider: the
/// row keeps the default enrichment and is left out of the distributions.
/// With [`InsightScope::PerChunk`] the category insights for this dataset are
/// generated before returning.
pub fn enrich_and_aggregate(
    dataset: Dataset,
    column: &FeedbackColumn,
    config: &AnalysisConfig,
    provider: &dyn AIProvider,
) -> Result<AccumulatedResult> {
    let texts = dataset.text_values(&column.name)?;
    let delay = config.request_delay();

    let mut result = AccumulatedResult::default();
    let mut enrichments = Vec::with_capacity(texts.len());
    let mut skipped = 0usize;

    for value in &texts {
        let Some(text) = value.as_deref().filter(|t| !t.trim().is_empty()) else {
            skipped += 1;
            enrichments.push(Enrichment::default());
            continue;
        };

        let enrichment = match provider.classify_feedback(text) {
            Ok(enrichment) => enrichment,
            Err(e) => {
                let preview = truncate_str(text.trim(), WARNING_PREVIEW_CHARS);
                warn!("Classification failed for \"{}\": {}", preview, e);
                result
                    .warnings
                    .push(format!("Could not analyze feedback \"{preview}\": {e}"));
                Enrichment::fallback()
            }
        };

        result.record(enrichment.sentiment, enrichment.category, text);
        enrichments.push(enrichment);

        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    debug!(
        "Classified {} rows ({} skipped as empty)",
        enrichments.len() - skipped,
        skipped
    );

    let mut processed = dataset;
    processed.annotate(&enrichments)?;
    result.processed_data = processed;

    if config.insight_scope == InsightScope::PerChunk {
        generate_insights(&mut result, config, provider);
    }

    Ok(result)
}

/// Fill `category_summaries` and `improvement_suggestions` from the category
/// buckets of `result`.
///
/// At most `sample_limit` samples per category are sent, in bucket order.
/// Suggestions are capped at `max_suggestions`.
pub fn generate_insights(
    result: &mut AccumulatedResult,
    config: &AnalysisConfig,
    provider: &dyn AIProvider,
) {
    if !config.wants_insights() {
        return;
    }

    for (&category, bucket) in &result.category_samples {
        if bucket.is_empty() {
            continue;
        }
        let samples = &bucket[..bucket.len().min(config.sample_limit)];

        if config.include_summaries {
            let summary = match provider.summarize_category(category, samples) {
                Ok(summary) if !summary.trim().is_empty() => summary,
                Ok(_) => {
                    warn!("Empty summary for {}", category);
                    format!("Could not generate summary for {category}: empty response")
                }
                Err(e) => {
                    warn!("Summary failed for {}: {}", category, e);
                    format!("Could not generate summary for {category}: {e}")
                }
            };
            result.category_summaries.insert(category, summary);
        }

        if config.include_suggestions {
            let mut suggestions = match provider.suggest_improvements(category, samples) {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    warn!("Suggestions failed for {}: {}", category, e);
                    Vec::new()
                }
            };
            if suggestions.is_empty() {
                suggestions.push(Suggestion::fallback(category));
            }
            suggestions.truncate(config.max_suggestions);
            result.improvement_suggestions.insert(category, suggestions);
        }
    }
}

/// Enrich `dataset` in contiguous chunks and fold the chunk results.
///
/// `on_chunk(completed, total)` is called after every chunk, including one
/// that failed. A failed chunk adds the warning `"Error processing chunk N: ..."`
/// and its rows are missing from `processed_data`.
pub fn analyze_in_chunks<F>(
    dataset: &Dataset,
    column: &FeedbackColumn,
    config: &AnalysisConfig,
    provider: &dyn AIProvider,
    mut on_chunk: F,
) -> Result<AccumulatedResult>
where
    F: FnMut(usize, usize),
{
    if !dataset.has_column(&column.name) {
        return Err(AnalysisError::ColumnNotFound(column.name.clone()));
    }

    let plan = ChunkPlan::new(dataset.height(), config.max_chunks);
    let total = plan.len();
    info!(
        "Analyzing {} rows of '{}' in {} chunks {:?}",
        dataset.height(),
        column.name,
        total,
        plan.sizes()
    );

    if plan.is_empty() {
        let mut result = enrich_and_aggregate(dataset.clone(), column, config, provider)?;
        if config.insight_scope == InsightScope::Run {
            generate_insights(&mut result, config, provider);
        }
        return Ok(result);
    }

    let mut accumulated = AccumulatedResult::default();
    for (index, range) in plan.ranges().iter().enumerate() {
        let chunk = dataset.slice(range.start, range.len());
        match enrich_and_aggregate(chunk, column, config, provider) {
            Ok(result) => accumulated.merge(result)?,
            Err(e) => {
                warn!("Chunk {} of {} failed: {}", index + 1, total, e);
                accumulated
                    .warnings
                    .push(format!("Error processing chunk {}: {}", index + 1, e));
            }
        }
        on_chunk(index + 1, total);
    }

    if config.insight_scope == InsightScope::Run {
        generate_insights(&mut accumulated, config, provider);
    }

    Ok(accumulated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::column::SelectionReason;
    use crate::dataset::FEEDBACK_COLUMN;
    use crate::types::{Category, Sentiment};
    use anyhow::anyhow;
    use std::sync::Mutex;

    /// Keyword classifier that records every call it receives.
    #[derive(Default)]
    struct KeywordProvider {
        classified: Mutex<Vec<String>>,
        summary_samples: Mutex<Vec<usize>>,
    }

    impl AIProvider for KeywordProvider {
        fn classify_feedback(&self, text: &str) -> anyhow::Result<Enrichment> {
            self.classified.lock().unwrap().push(text.to_string());
            let lower = text.to_lowercase();
            if lower.contains("boom") {
                return Err(anyhow!("provider exploded"));
            }
            let sentiment = if lower.contains("great") {
                Sentiment::Positive
            } else if lower.contains("bad") {
                Sentiment::Negative
            } else {
                Sentiment::Neutral
            };
            let category = if lower.contains("hotel") {
                Category::Accommodation
            } else if lower.contains("bus") {
                Category::Transportation
            } else {
                Category::Other
            };
            Ok(Enrichment::new(sentiment, category, vec![lower]))
        }

        fn summarize_category(
            &self,
            category: Category,
            samples: &[String],
        ) -> anyhow::Result<String> {
            self.summary_samples.lock().unwrap().push(samples.len());
            Ok(format!("{} samples about {}", samples.len(), category))
        }

        fn suggest_improvements(
            &self,
            category: Category,
            _samples: &[String],
        ) -> anyhow::Result<Vec<Suggestion>> {
            if category == Category::Other {
                return Err(anyhow!("no ideas"));
            }
            Ok((0..8)
                .map(|i| Suggestion::new(format!("Idea {i}"), "Do it"))
                .collect())
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::builder().request_delay_ms(0).build().unwrap()
    }

    fn column() -> FeedbackColumn {
        FeedbackColumn {
            name: FEEDBACK_COLUMN.to_string(),
            reason: SelectionReason::Vocabulary,
        }
    }

    fn dataset(lines: &[&str]) -> Dataset {
        let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        Dataset::from_lines(FEEDBACK_COLUMN, &lines)
    }

    #[test]
    fn test_blank_rows_are_skipped_but_kept() {
        let provider = KeywordProvider::default();
        let data = dataset(&["Great hotel", "   ", "", "Bad bus"]);

        let result = enrich_and_aggregate(data, &column(), &config(), &provider).unwrap();

        assert_eq!(provider.classified.lock().unwrap().len(), 2);
        assert_eq!(result.total_classified(), 2);
        assert_eq!(result.processed_data.height(), 4);
        assert_eq!(
            result.processed_data.sentiments().unwrap(),
            vec![
                Sentiment::Positive,
                Sentiment::Neutral,
                Sentiment::Neutral,
                Sentiment::Negative
            ]
        );
        assert!(result.processed_data.key_points().unwrap()[1].is_empty());
    }

    #[test]
    fn test_failed_classification_uses_fallback() {
        let provider = KeywordProvider::default();
        let data = dataset(&["boom goes the hotel"]);

        let result = enrich_and_aggregate(data, &column(), &config(), &provider).unwrap();

        assert_eq!(result.category_count(Category::Other), 1);
        assert_eq!(result.sentiment_count(Sentiment::Neutral), 1);
        assert_eq!(
            result.processed_data.key_points().unwrap()[0],
            vec!["Could not extract key points"]
        );
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("provider exploded"));
    }

    #[test]
    fn test_insights_respect_limits_and_fallbacks() {
        let provider = KeywordProvider::default();
        let config = AnalysisConfig::builder()
            .request_delay_ms(0)
            .sample_limit(2)
            .build()
            .unwrap();
        let data = dataset(&["hotel one", "hotel two", "hotel three", "something else"]);

        let result = enrich_and_aggregate(data, &column(), &config, &provider).unwrap();

        assert_eq!(
            result.category_summaries[&Category::Accommodation],
            "2 samples about accommodation"
        );
        assert_eq!(
            result.improvement_suggestions[&Category::Accommodation].len(),
            5
        );
        assert_eq!(
            result.improvement_suggestions[&Category::Other],
            vec![Suggestion::fallback(Category::Other)]
        );
        assert_eq!(*provider.summary_samples.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_insights_disabled() {
        let provider = KeywordProvider::default();
        let config = AnalysisConfig::builder()
            .request_delay_ms(0)
            .include_summaries(false)
            .include_suggestions(false)
            .build()
            .unwrap();

        let result = enrich_and_aggregate(dataset(&["hotel"]), &column(), &config, &provider)
            .unwrap();
        assert!(result.category_summaries.is_empty());
        assert!(result.improvement_suggestions.is_empty());
    }

    #[test]
    fn test_chunking_does_not_change_distributions() {
        let lines = [
            "great hotel", "bad bus", "hotel", "great bus", "", "bad hotel", "meh", "great",
            "bus", "bad",
        ];
        let provider = KeywordProvider::default();

        let one = AnalysisConfig::builder()
            .request_delay_ms(0)
            .max_chunks(1)
            .build()
            .unwrap();
        let three = AnalysisConfig::builder()
            .request_delay_ms(0)
            .max_chunks(3)
            .build()
            .unwrap();

        let mut progress = Vec::new();
        let a = analyze_in_chunks(&dataset(&lines), &column(), &one, &provider, |_, _| {})
            .unwrap();
        let b = analyze_in_chunks(&dataset(&lines), &column(), &three, &provider, |done, total| {
            progress.push((done, total))
        })
        .unwrap();

        assert_eq!(a.sentiment_distribution, b.sentiment_distribution);
        assert_eq!(a.category_distribution, b.category_distribution);
        assert_eq!(a.category_samples, b.category_samples);
        assert_eq!(b.processed_data.height(), 10);
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_run_scope_sees_every_sample() {
        let provider = KeywordProvider::default();
        let config = AnalysisConfig::builder()
            .request_delay_ms(0)
            .max_chunks(3)
            .insight_scope(InsightScope::Run)
            .build()
            .unwrap();
        let data = dataset(&["hotel a", "hotel b", "hotel c"]);

        let result = analyze_in_chunks(&data, &column(), &config, &provider, |_, _| {}).unwrap();

        assert_eq!(
            result.category_summaries[&Category::Accommodation],
            "3 samples about accommodation"
        );
        assert_eq!(*provider.summary_samples.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_per_chunk_scope_last_chunk_wins() {
        let provider = KeywordProvider::default();
        let config = AnalysisConfig::builder()
            .request_delay_ms(0)
            .max_chunks(2)
            .build()
            .unwrap();
        let data = dataset(&["hotel a", "hotel b", "hotel c"]);

        let result = analyze_in_chunks(&data, &column(), &config, &provider, |_, _| {}).unwrap();

        // chunks of 2 and 1 rows
        assert_eq!(
            result.category_summaries[&Category::Accommodation],
            "1 samples about accommodation"
        );
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let provider = KeywordProvider::default();
        let missing = FeedbackColumn {
            name: "nope".to_string(),
            reason: SelectionReason::Explicit,
        };
        let err = analyze_in_chunks(&dataset(&["x"]), &missing, &config(), &provider, |_, _| {})
            .unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }
}
