//! Shared utilities for the feedback analysis pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type, as far as feedback analysis cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Lists (e.g. the key points annotation)
    List,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else if matches!(dtype, DataType::List(_)) {
        DtypeCategory::List
    } else {
        DtypeCategory::Other
    }
}

/// Short dtype label used in column previews.
pub fn dtype_label(dtype: &DataType) -> &'static str {
    match get_dtype_category(dtype) {
        DtypeCategory::Numeric if dtype.is_float() => "float",
        DtypeCategory::Numeric => "integer",
        DtypeCategory::Datetime => "datetime",
        DtypeCategory::Boolean => "boolean",
        DtypeCategory::String => "string",
        DtypeCategory::List => "list",
        DtypeCategory::Other => "other",
    }
}

// =============================================================================
// String Utilities
// =============================================================================

/// Truncate a string to `max_len` characters, marking the cut with "...".
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Normalize a free-form label into `snake_case` tokens.
///
/// Every run of non-alphanumeric characters becomes a single `_`:
/// `"Food & Dining"` -> `"food_dining"`.
pub fn snake_label(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Turn a `snake_case` label into title-cased words: `"food_dining"` -> `"Food Dining"`.
pub fn humanize_label(s: &str) -> String {
    s.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Percentage of `part` in `total`, 0.0 when `total` is zero.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

// =============================================================================
// Tests
// =============================================================================
