//! JSON ingestion.
//!
//! The chain tries strict JSON, then the Python-literal dialect, then treats
//! every non-blank line as one feedback entry. Once a value parses, its shape
//! decides how it becomes a table; shape problems end in a placeholder rather
//! than falling through to the next parser.

use anyhow::bail;
use polars::prelude::*;
use serde_json::{Map, Value};
use tracing::warn;

use super::Normalized;
use super::literal::parse_literal;
use super::strategy::{Strategy, Terminal, run_chain};
use super::text::non_blank_lines;
use crate::dataset::{Dataset, FEEDBACK_COLUMN};
use crate::types::FormatLabel;

/// Keys that usually hold the feedback list, in order of preference.
const PREFERRED_LIST_KEYS: [&str; 5] = ["feedback", "reviews", "comments", "responses", "data"];

const NO_USABLE_DATA_MESSAGE: &str =
    "JSON parsing resulted in no usable data - please check format";
const BUILD_ERROR_MESSAGE: &str = "Error in JSON parsing - this is a placeholder entry";

const JSON_TERMINAL: Terminal = Terminal {
    message: "Invalid JSON format - please check file structure",
    label: FormatLabel::InvalidJson,
};

/// Normalize a `.json` upload.
pub fn normalize_json(content: &str) -> Normalized {
    const CHAIN: [Strategy; 3] = [
        Strategy::new("strict json", strict_attempt),
        Strategy::new("python literal", literal_attempt),
        Strategy::new("json-like lines", lines_attempt),
    ];
    run_chain(content, &CHAIN, JSON_TERMINAL)
}

fn strict_attempt(content: &str) -> anyhow::Result<Normalized> {
    let value: Value = serde_json::from_str(content)?;
    Ok(from_value(value))
}

fn literal_attempt(content: &str) -> anyhow::Result<Normalized> {
    let value = parse_literal(content.trim())?;
    warn!("File is not valid JSON, parsed it as a Python-style literal");
    Ok(from_value(value))
}

fn lines_attempt(content: &str) -> anyhow::Result<Normalized> {
    let lines = non_blank_lines(content);
    if lines.is_empty() {
        bail!("no lines to salvage");
    }
    warn!("Could not parse JSON, treating each line as a feedback entry");
    Ok(Normalized::new(
        Dataset::from_lines(FEEDBACK_COLUMN, &lines),
        FormatLabel::JsonLikeText,
    ))
}

/// Turn a parsed value into a labelled dataset. Never fails.
pub fn from_value(value: Value) -> Normalized {
    match value_to_dataset(value) {
        Ok(dataset) if dataset.is_empty() => {
            warn!("JSON data could not be converted to a usable table");
            Normalized::new(
                Dataset::placeholder(NO_USABLE_DATA_MESSAGE),
                FormatLabel::Json,
            )
        }
        Ok(dataset) => Normalized::new(dataset, FormatLabel::Json),
        Err(e) => {
            warn!("Error building table from JSON: {e}");
            Normalized::new(
                Dataset::placeholder(BUILD_ERROR_MESSAGE),
                FormatLabel::JsonParsingError,
            )
        }
    }
}

/// Structural dispatch on the top-level value.
fn value_to_dataset(value: Value) -> PolarsResult<Dataset> {
    match value {
        Value::Array(items) => list_to_dataset(items),
        Value::Object(map) => object_to_dataset(map),
        scalar => Ok(Dataset::from_lines(
            FEEDBACK_COLUMN,
            &[stringify(&scalar)],
        )),
    }
}

fn list_to_dataset(items: Vec<Value>) -> PolarsResult<Dataset> {
    if items.is_empty() {
        return Ok(Dataset::default());
    }

    if items.iter().all(Value::is_object) {
        let records: Vec<Map<String, Value>> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        return records_to_dataset(&records);
    }

    // Strings, or a mix of scalars and containers: one entry per item.
    let entries: Vec<String> = items.iter().map(stringify).collect();
    Ok(Dataset::from_lines(FEEDBACK_COLUMN, &entries))
}

fn object_to_dataset(mut map: Map<String, Value>) -> PolarsResult<Dataset> {
    let list_keys: Vec<String> = map
        .iter()
        .filter(|(_, v)| v.is_array())
        .map(|(k, _)| k.clone())
        .collect();

    if list_keys.is_empty() {
        return records_to_dataset(&[map]);
    }

    if let Some(key) = PREFERRED_LIST_KEYS
        .iter()
        .find(|key| list_keys.iter().any(|k| k == *key))
        && let Some(Value::Array(items)) = map.remove(*key)
    {
        return list_to_dataset(items);
    }

    // Longest list, first one on ties.
    let mut longest: Option<(&str, usize)> = None;
    for key in &list_keys {
        let len = map.get(key).and_then(Value::as_array).map_or(0, Vec::len);
        if longest.is_none_or(|(_, best)| len > best) {
            longest = Some((key.as_str(), len));
        }
    }

    match longest {
        Some((key, len)) if len > 0 => {
            let key = key.to_string();
            match map.remove(&key) {
                Some(Value::Array(items)) => list_to_dataset(items),
                _ => records_to_dataset(&[map]),
            }
        }
        _ => records_to_dataset(&[map]),
    }
}

/// One row per record; columns are the union of keys in first-seen order.
fn records_to_dataset(records: &[Map<String, Value>]) -> PolarsResult<Dataset> {
    let mut keys: Vec<&String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let columns: Vec<Column> = keys
        .iter()
        .map(|key| {
            let values: Vec<Option<&Value>> = records
                .iter()
                .map(|record| record.get(*key).filter(|v| !v.is_null()))
                .collect();
            build_series(key, &values).into()
        })
        .collect();

    if columns.is_empty() {
        return Ok(Dataset::default());
    }
    Ok(Dataset::from_frame(DataFrame::new(columns)?))
}

/// Pick the narrowest dtype that holds every non-null value.
fn build_series(name: &str, values: &[Option<&Value>]) -> Series {
    let present = || values.iter().flatten();
    let any_present = present().next().is_some();

    if any_present && present().all(|v| v.is_boolean()) {
        let col: Vec<Option<bool>> = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
        return Series::new(name.into(), col);
    }
    if any_present && present().all(|v| v.is_i64()) {
        let col: Vec<Option<i64>> = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
        return Series::new(name.into(), col);
    }
    if any_present && present().all(|v| v.is_number()) {
        let col: Vec<Option<f64>> = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
        return Series::new(name.into(), col);
    }

    let col: Vec<Option<String>> = values.iter().map(|v| v.map(stringify)).collect();
    Series::new(name.into(), col)
}

/// Strings keep their content; everything else is JSON-encoded.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback(normalized: &Normalized) -> Vec<Option<String>> {
        normalized.dataset.text_values(FEEDBACK_COLUMN).unwrap()
    }

    #[test]
    fn test_list_of_objects() {
        let out = normalize_json(r#"[{"feedback": "a"}, {"feedback": "b"}]"#);
        assert_eq!(out.label, FormatLabel::Json);
        assert_eq!(out.dataset.height(), 2);
        assert_eq!(feedback(&out), vec![Some("a".into()), Some("b".into())]);
    }

    #[test]
    fn test_list_of_strings() {
        let out = normalize_json(r#"["loved it", "too hot"]"#);
        assert_eq!(out.dataset.column_names(), vec![FEEDBACK_COLUMN]);
        assert_eq!(out.dataset.height(), 2);
    }

    #[test]
    fn test_union_of_keys_with_nulls() {
        let out = normalize_json(r#"[{"id": 1, "text": "x"}, {"id": 2, "rating": 4.5}]"#);
        assert_eq!(out.dataset.column_names(), vec!["id", "text", "rating"]);
        assert_eq!(out.dataset.dtype("id").unwrap(), DataType::Int64);
        assert_eq!(out.dataset.dtype("rating").unwrap(), DataType::Float64);
        assert_eq!(out.dataset.text_values("text").unwrap()[1], None);
    }

    #[test]
    fn test_preferred_key_wins_over_longer_list() {
        let out = normalize_json(r#"{"other": ["z", "z", "z"], "reviews": ["x", "y"]}"#);
        assert_eq!(out.dataset.height(), 2);
        assert_eq!(feedback(&out), vec![Some("x".into()), Some("y".into())]);
    }

    #[test]
    fn test_longest_list_when_no_preferred_key() {
        let out = normalize_json(r#"{"a": [1], "b": [{"feedback": "p"}, {"feedback": "q"}]}"#);
        assert_eq!(out.dataset.height(), 2);
        assert_eq!(out.dataset.column_names(), vec![FEEDBACK_COLUMN]);
    }

    #[test]
    fn test_empty_lists_become_single_row() {
        let out = normalize_json(r#"{"a": [], "title": "survey"}"#);
        assert_eq!(out.label, FormatLabel::Json);
        assert_eq!(out.dataset.height(), 1);
        assert_eq!(out.dataset.column_names(), vec!["a", "title"]);
    }

    #[test]
    fn test_plain_object_single_row() {
        let out = normalize_json(r#"{"feedback": "only one", "stars": 5}"#);
        assert_eq!(out.dataset.height(), 1);
        assert_eq!(out.dataset.width(), 2);
    }

    #[test]
    fn test_scalar() {
        let out = normalize_json("42");
        assert_eq!(feedback(&out), vec![Some("42".into())]);
    }

    #[test]
    fn test_empty_list_placeholder() {
        let out = normalize_json("[]");
        assert_eq!(out.label, FormatLabel::Json);
        assert_eq!(feedback(&out), vec![Some(NO_USABLE_DATA_MESSAGE.into())]);
    }

    #[test]
    fn test_python_literal_fallback() {
        let out = normalize_json("[{'feedback': 'a'}, {'feedback': 'b', 'ok': True}]");
        assert_eq!(out.label, FormatLabel::Json);
        assert_eq!(out.dataset.height(), 2);
        assert_eq!(out.dataset.dtype("ok").unwrap(), DataType::Boolean);
    }

    #[test]
    fn test_json_like_lines() {
        let out = normalize_json("{feedback: great}\n\n{feedback: bad}\n");
        assert_eq!(out.label, FormatLabel::JsonLikeText);
        assert_eq!(out.dataset.height(), 2);
    }

    #[test]
    fn test_blank_input_is_invalid_json() {
        let out = normalize_json("   \n ");
        assert_eq!(out.label, FormatLabel::InvalidJson);
        assert_eq!(out.dataset.height(), 1);
    }

    #[test]
    fn test_nested_values_are_encoded() {
        let out = normalize_json(r#"[{"feedback": "a", "meta": {"k": 1}}]"#);
        assert_eq!(
            out.dataset.text_values("meta").unwrap(),
            vec![Some(r#"{"k":1}"#.to_string())]
        );
    }
}
