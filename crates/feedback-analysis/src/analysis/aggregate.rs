//! Accumulated analysis results and how chunk results combine.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::types::{Category, Sentiment, Suggestion};

/// Everything produced by enriching one or more chunks.
///
/// The distribution maps and insight maps are always present, possibly empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccumulatedResult {
    pub sentiment_distribution: BTreeMap<Sentiment, usize>,
    pub category_distribution: BTreeMap<Category, usize>,
    pub category_summaries: BTreeMap<Category, String>,
    pub improvement_suggestions: BTreeMap<Category, Vec<Suggestion>>,
    /// Input rows plus `sentiment`, `category` and `key_points`.
    #[serde(skip)]
    pub processed_data: Dataset,
    /// Raw feedback texts grouped by assigned category, in row order.
    #[serde(skip)]
    pub category_samples: BTreeMap<Category, Vec<String>>,
    pub warnings: Vec<String>,
}

impl AccumulatedResult {
    /// Count one classified row and keep its text for insights.
    pub fn record(&mut self, sentiment: Sentiment, category: Category, text: &str) {
        *self.sentiment_distribution.entry(sentiment).or_default() += 1;
        *self.category_distribution.entry(category).or_default() += 1;
        self.category_samples
            .entry(category)
            .or_default()
            .push(text.to_string());
    }

    /// Number of rows that were classified (skipped rows are not counted).
    pub fn total_classified(&self) -> usize {
        self.sentiment_distribution.values().sum()
    }

    pub fn sentiment_count(&self, sentiment: Sentiment) -> usize {
        self.sentiment_distribution
            .get(&sentiment)
            .copied()
            .unwrap_or(0)
    }

    pub fn category_count(&self, category: Category) -> usize {
        self.category_distribution
            .get(&category)
            .copied()
            .unwrap_or(0)
    }

    /// Most frequent category; the first in category order wins ties.
    pub fn top_category(&self) -> Option<(Category, usize)> {
        self.category_distribution
            .iter()
            .filter(|(_, count)| **count > 0)
            .fold(None, |best: Option<(Category, usize)>, (&category, &count)| {
                match best {
                    Some((_, best_count)) if best_count >= count => best,
                    _ => Some((category, count)),
                }
            })
    }

    /// Fold `other` into `self`.
    ///
    /// Distributions add per key. Summaries and suggestions are replaced per
    /// key, so the later chunk wins. Annotated rows, samples and warnings are
    /// appended in call order.
    pub fn merge(&mut self, other: AccumulatedResult) -> Result<()> {
        for (sentiment, count) in other.sentiment_distribution {
            *self.sentiment_distribution.entry(sentiment).or_default() += count;
        }
        for (category, count) in other.category_distribution {
            *self.category_distribution.entry(category).or_default() += count;
        }
        self.category_summaries.extend(other.category_summaries);
        self.improvement_suggestions
            .extend(other.improvement_suggestions);
        for (category, samples) in other.category_samples {
            self.category_samples
                .entry(category)
                .or_default()
                .extend(samples);
        }
        self.processed_data.append(&other.processed_data)?;
        self.warnings.extend(other.warnings);
        Ok(())
    }

    /// Merge a sequence of chunk results, left to right.
    pub fn fold(results: impl IntoIterator<Item = AccumulatedResult>) -> Result<Self> {
        let mut acc = Self::default();
        for result in results {
            acc.merge(result)?;
        }
        Ok(acc)
    }
}
