use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{humanize_label, snake_label};

// ============================================================================
// Enrichment Labels
// ============================================================================

/// Overall sentiment of a single feedback entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Self::Positive, Self::Neutral, Self::Negative];

    /// Parse a provider label leniently. Unknown labels (including "mixed") map
    /// to `Neutral`.
    pub fn from_label(label: &str) -> Self {
        match snake_label(label).as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business area a feedback entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Accommodation,
    Transportation,
    FoodDining,
    ActivitiesGuides,
    BookingProcess,
    ValueForMoney,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Accommodation,
        Self::Transportation,
        Self::FoodDining,
        Self::ActivitiesGuides,
        Self::BookingProcess,
        Self::ValueForMoney,
        Self::Other,
    ];

    /// Parse a provider label leniently.
    ///
    /// "Food & Dining", "food-dining" and "food_dining" all map to
    /// `FoodDining`; anything unrecognized maps to `Other`.
    pub fn from_label(label: &str) -> Self {
        match snake_label(label).as_str() {
            "accommodation" | "accommodations" => Self::Accommodation,
            "transportation" | "transport" => Self::Transportation,
            "food_dining" | "food_and_dining" | "food" => Self::FoodDining,
            "activities_guides" | "activities_and_guides" | "activities" => {
                Self::ActivitiesGuides
            }
            "booking_process" | "booking" => Self::BookingProcess,
            "value_for_money" | "value" => Self::ValueForMoney,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accommodation => "accommodation",
            Self::Transportation => "transportation",
            Self::FoodDining => "food_dining",
            Self::ActivitiesGuides => "activities_guides",
            Self::BookingProcess => "booking_process",
            Self::ValueForMoney => "value_for_money",
            Self::Other => "other",
        }
    }

    /// Title-cased words, e.g. "Value For Money".
    pub fn display_name(&self) -> String {
        humanize_label(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Enrichment Results
// ============================================================================

/// Maximum number of key points kept per feedback entry.
pub const MAX_KEY_POINTS: usize = 3;

/// Per-row result of classifying one feedback entry.
///
/// The `Default` value is what skipped (empty) rows carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub sentiment: Sentiment,
    pub category: Category,
    pub key_points: Vec<String>,
}

impl Default for Enrichment {
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            category: Category::Other,
            key_points: Vec::new(),
        }
    }
}

impl Enrichment {
    pub fn new(sentiment: Sentiment, category: Category, key_points: Vec<String>) -> Self {
        let mut enrichment = Self {
            sentiment,
            category,
            key_points,
        };
        enrichment.key_points.truncate(MAX_KEY_POINTS);
        enrichment
    }

    /// Result used when classification of a non-empty row fails.
    pub fn fallback() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            category: Category::Other,
            key_points: vec!["Could not extract key points".to_string()],
        }
    }
}

/// An improvement suggestion for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default = "default_suggestion_title")]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
}

fn default_suggestion_title() -> String {
    "Suggestion".to_string()
}

impl Suggestion {
    pub fn new(title: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            explanation: explanation.into(),
        }
    }

    /// Suggestion used when the provider produced none for `category`.
    pub fn fallback(category: Category) -> Self {
        Self::new(
            "Improve based on feedback",
            format!(
                "Review customer feedback for {} to identify specific improvement areas.",
                category.as_str().replace('_', " ")
            ),
        )
    }
}

// ============================================================================
// Ingestion Labels
// ============================================================================

/// Which normalization path produced a dataset.
///
/// Informational only: shown in previews and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatLabel {
    Csv,
    CsvParsingError,
    Json,
    JsonLikeText,
    InvalidJson,
    JsonParsingError,
    CsvLikeText,
    Text,
    TextParsingError,
}

impl FormatLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::CsvParsingError => "csv with parsing error",
            Self::Json => "json",
            Self::JsonLikeText => "json-like text",
            Self::InvalidJson => "invalid json",
            Self::JsonParsingError => "json with parsing error",
            Self::CsvLikeText => "csv-like text",
            Self::Text => "text",
            Self::TextParsingError => "text with parsing error",
        }
    }

    /// Whether the dataset came from a terminal placeholder.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::CsvParsingError | Self::InvalidJson | Self::JsonParsingError | Self::TextParsingError
        )
    }
}

impl fmt::Display for FormatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_from_label() {
        assert_eq!(Sentiment::from_label("Positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label(" NEGATIVE "), Sentiment::Negative);
        assert_eq!(Sentiment::from_label("mixed"), Sentiment::Neutral);
        assert_eq!(Sentiment::from_label(""), Sentiment::Neutral);
    }

    #[test]
    fn test_category_from_label() {
        assert_eq!(Category::from_label("Food & Dining"), Category::FoodDining);
        assert_eq!(Category::from_label("food_dining"), Category::FoodDining);
        assert_eq!(
            Category::from_label("Activities/Guides"),
            Category::ActivitiesGuides
        );
        assert_eq!(Category::from_label("value-for-money"), Category::ValueForMoney);
        assert_eq!(Category::from_label("weather"), Category::Other);
    }

    #[test]
    fn test_category_display_name() {
        assert_eq!(Category::FoodDining.display_name(), "Food Dining");
        assert_eq!(Category::ValueForMoney.display_name(), "Value For Money");
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::BookingProcess).unwrap();
        assert_eq!(json, "\"booking_process\"");
    }

    #[test]
    fn test_enrichment_truncates_key_points() {
        let points = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let e = Enrichment::new(Sentiment::Positive, Category::Accommodation, points);
        assert_eq!(e.key_points.len(), MAX_KEY_POINTS);
    }

    #[test]
    fn test_enrichment_default_and_fallback() {
        let default = Enrichment::default();
        assert_eq!(default.sentiment, Sentiment::Neutral);
        assert!(default.key_points.is_empty());

        let fallback = Enrichment::fallback();
        assert_eq!(fallback.category, Category::Other);
        assert_eq!(fallback.key_points, vec!["Could not extract key points"]);
    }

    #[test]
    fn test_suggestion_defaults_on_deserialize() {
        let s: Suggestion = serde_json::from_str(r#"{"explanation": "Add shade"}"#).unwrap();
        assert_eq!(s.title, "Suggestion");
        assert_eq!(s.explanation, "Add shade");
    }

    #[test]
    fn test_suggestion_fallback() {
        let s = Suggestion::fallback(Category::FoodDining);
        assert_eq!(s.title, "Improve based on feedback");
        assert_eq!(
            s.explanation,
            "Review customer feedback for food dining to identify specific improvement areas."
        );
    }

    #[test]
    fn test_format_label() {
        assert_eq!(FormatLabel::CsvLikeText.to_string(), "csv-like text");
        assert!(FormatLabel::InvalidJson.is_degraded());
        assert!(!FormatLabel::JsonLikeText.is_degraded());
    }
}
