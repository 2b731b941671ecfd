//! Feedback column inference.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::{AnalysisError, Result};
use crate::utils::{DtypeCategory, get_dtype_category};

/// Column names that usually hold free-text feedback (compared case-insensitively).
const FEEDBACK_COLUMN_NAMES: [&str; 10] = [
    "feedback",
    "review",
    "comment",
    "text",
    "description",
    "response",
    "comments",
    "reviews",
    "message",
    "content",
];

/// Sample values longer than this are treated as prose rather than identifiers.
const MIN_TEXT_SAMPLE_CHARS: usize = 10;

/// Which rule selected the feedback column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Header matched a known feedback column name.
    Vocabulary,
    /// First text column whose first value reads like prose.
    TextHeuristic,
    /// Nothing better found; the first column.
    FirstColumn,
    /// Chosen by the caller.
    Explicit,
}

/// The column whose values are analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackColumn {
    pub name: String,
    pub reason: SelectionReason,
}

impl FeedbackColumn {
    /// Use `name` as the feedback column; it must exist in `dataset`.
    pub fn explicit(dataset: &Dataset, name: &str) -> Result<Self> {
        if !dataset.has_column(name) {
            return Err(AnalysisError::ColumnNotFound(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            reason: SelectionReason::Explicit,
        })
    }
}

/// Pick the column most likely to hold feedback text.
///
/// Rules, first match wins:
/// 1. a header in the known vocabulary, in column order;
/// 2. the first string column whose first non-null value has more than ten characters;
/// 3. the first column.
pub fn infer_feedback_column(dataset: &Dataset) -> Result<FeedbackColumn> {
    let names = dataset.column_names();
    if names.is_empty() {
        return Err(AnalysisError::NoColumns);
    }

    if let Some(name) = names.iter().find(|name| {
        let lower = name.to_lowercase();
        FEEDBACK_COLUMN_NAMES.contains(&lower.as_str())
    }) {
        info!("Feedback column '{name}' matched by name");
        return Ok(FeedbackColumn {
            name: name.clone(),
            reason: SelectionReason::Vocabulary,
        });
    }

    for name in &names {
        if get_dtype_category(&dataset.dtype(name)?) != DtypeCategory::String {
            continue;
        }
        let sample = dataset.first_value(name)?;
        debug!("Column '{name}' first value: {sample:?}");
        if sample.is_some_and(|s| s.chars().count() > MIN_TEXT_SAMPLE_CHARS) {
            info!("Feedback column '{name}' chosen by text heuristic");
            return Ok(FeedbackColumn {
                name: name.clone(),
                reason: SelectionReason::TextHeuristic,
            });
        }
    }

    info!("No obvious feedback column, using first column '{}'", names[0]);
    Ok(FeedbackColumn {
        name: names[0].clone(),
        reason: SelectionReason::FirstColumn,
    })
}
