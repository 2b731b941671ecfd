//! Extraction of JSON payloads from free-form model responses.
//!
//! Models wrap JSON in Markdown fences, prepend commentary, or return it bare.
//! Candidates are tried in a fixed order and the first one that parses wins.

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::types::{Category, Enrichment, Sentiment, Suggestion};

// Response patterns - compiled once at startup
static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*\n(.*?)\n?\s*```").expect("Invalid regex: json fence"));
static ANY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").expect("Invalid regex: code fence"));
static BARE_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("Invalid regex: bare object"));
static BARE_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("Invalid regex: bare array"));

/// Find and parse the JSON value embedded in `response`.
///
/// Order: a ```` ```json ```` fence, any fence, the outermost `{...}` and
/// `[...]` spans (whichever opens first), then the whole trimmed text.
pub fn extract_json(response: &str) -> Result<Value> {
    let fenced = [&*JSON_FENCE, &*ANY_FENCE]
        .into_iter()
        .filter_map(|re| re.captures(response))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));

    let mut bare: Vec<regex::Match<'_>> = [&*BARE_OBJECT, &*BARE_ARRAY]
        .into_iter()
        .filter_map(|re| re.find(response))
        .collect();
    bare.sort_by_key(|m| m.start());

    fenced
        .chain(bare.into_iter().map(|m| m.as_str()))
        .chain(std::iter::once(response))
        .find_map(|candidate| serde_json::from_str::<Value>(candidate.trim()).ok())
        .ok_or_else(|| anyhow!("No JSON found in response: {}", preview(response)))
}

#[derive(Debug, Deserialize)]
struct RawEnrichment {
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    key_points: Option<Value>,
}

/// Parse a classification response into an [`Enrichment`].
///
/// Missing or unknown labels fall back to neutral / other; key points may be a
/// list or a single string.
pub fn parse_enrichment(response: &str) -> Result<Enrichment> {
    let value = extract_json(response)?;
    let raw: RawEnrichment =
        serde_json::from_value(value).context("Classification response is not an object")?;

    let key_points = match raw.key_points {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    };

    Ok(Enrichment::new(
        raw.sentiment
            .as_deref()
            .map_or(Sentiment::Neutral, Sentiment::from_label),
        raw.category
            .as_deref()
            .map_or(Category::Other, Category::from_label),
        key_points,
    ))
}

/// Parse a suggestions response: a JSON array, or an object with a
/// `suggestions` array.
pub fn parse_suggestions(response: &str) -> Result<Vec<Suggestion>> {
    let value = extract_json(response)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("suggestions") {
            Some(Value::Array(items)) => items,
            _ => return Err(anyhow!("Suggestions response has no array")),
        },
        _ => return Err(anyhow!("Suggestions response is not an array")),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(Suggestion::new("Suggestion", s)),
            other => serde_json::from_value::<Suggestion>(other).ok(),
        })
        .filter(|s| !s.explanation.trim().is_empty() || s.title != "Suggestion")
        .collect())
}

fn preview(text: &str) -> String {
    crate::utils::truncate_str(text.trim(), 80)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_fence() {
        let response = "Here you go:\n```json\n{\"sentiment\": \"positive\"}\n```\nThanks";
        assert_eq!(extract_json(response).unwrap(), json!({"sentiment": "positive"}));
    }

    #[test]
    fn test_generic_fence() {
        let response = "```\n[1, 2]\n```";
        assert_eq!(extract_json(response).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_bare_object_with_commentary() {
        let response = "Sure! {\"category\": \"booking_process\"} Hope that helps.";
        assert_eq!(
            extract_json(response).unwrap(),
            json!({"category": "booking_process"})
        );
    }

    #[test]
    fn test_whole_text() {
        assert_eq!(extract_json("  \"plain\"  ").unwrap(), json!("plain"));
    }

    #[test]
    fn test_no_json() {
        assert!(extract_json("I cannot help with that.").is_err());
    }

    #[test]
    fn test_parse_enrichment() {
        let response = r#"```json
{"sentiment": "Negative", "category": "Food & Dining", "key_points": ["cold food", "slow", "rude", "noisy"]}
```"#;
        let e = parse_enrichment(response).unwrap();
        assert_eq!(e.sentiment, Sentiment::Negative);
        assert_eq!(e.category, Category::FoodDining);
        assert_eq!(e.key_points, vec!["cold food", "slow", "rude"]);
    }

    #[test]
    fn test_parse_enrichment_defaults() {
        let e = parse_enrichment(r#"{"key_points": "only one"}"#).unwrap();
        assert_eq!(e.sentiment, Sentiment::Neutral);
        assert_eq!(e.category, Category::Other);
        assert_eq!(e.key_points, vec!["only one"]);
    }

    #[test]
    fn test_parse_enrichment_rejects_array() {
        assert!(parse_enrichment("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_parse_suggestions_array() {
        let response = r#"[{"title": "Add shade", "explanation": "Buy umbrellas."}, {"explanation": "Hire guides."}]"#;
        let s = parse_suggestions(response).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].title, "Add shade");
        assert_eq!(s[1].title, "Suggestion");
    }

    #[test]
    fn test_single_suggestion_array_is_not_mistaken_for_object() {
        let response = r#"Suggestions: [{"title": "Cooler buses", "explanation": "Fix the AC."}]"#;
        let s = parse_suggestions(response).unwrap();
        assert_eq!(s, vec![Suggestion::new("Cooler buses", "Fix the AC.")]);
    }

    #[test]
    fn test_parse_suggestions_wrapped() {
        let response = r#"{"suggestions": [{"title": "Faster booking", "explanation": "Cut steps."}]}"#;
        assert_eq!(parse_suggestions(response).unwrap()[0].title, "Faster booking");
    }

    #[test]
    fn test_parse_suggestions_not_array() {
        assert!(parse_suggestions(r#"{"advice": "none"}"#).is_err());
    }
}
