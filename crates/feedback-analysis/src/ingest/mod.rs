//! Ingestion normalizer.
//!
//! Turns an uploaded file of unknown shape into a rectangular [`Dataset`].
//! Normalization never fails: every format runs an ordered strategy chain
//! ending in a single-row placeholder, so callers always get at least one
//! row and one column plus a [`FormatLabel`] describing the path taken.
//!
//! | Extension | Chain |
//! |-----------|-------|
//! | `csv` | sniffed delimiter, comma, placeholder |
//! | `json` | strict JSON, Python literal, lines, placeholder |
//! | `txt`, other | CSV-like text, lines, placeholder |

pub mod delimited;
pub mod json;
pub mod literal;
pub mod strategy;
pub mod text;

use std::path::Path;

use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::error::{Result, ResultExt};
use crate::types::FormatLabel;

/// A normalized dataset and the path that produced it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub dataset: Dataset,
    pub label: FormatLabel,
}

impl Normalized {
    pub fn new(dataset: Dataset, label: FormatLabel) -> Self {
        Self { dataset, label }
    }
}

/// Declared file format, taken from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
    Text,
}

impl FileFormat {
    /// Case-insensitive; unknown extensions are read as text.
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Self::Csv,
            "json" => Self::Json,
            "txt" => Self::Text,
            other => {
                warn!("Unrecognized extension '{other}', reading file as text");
                Self::Text
            }
        }
    }
}

/// Uploaded bytes plus the declared extension.
#[derive(Debug, Clone)]
pub struct RawInput {
    pub bytes: Vec<u8>,
    pub extension: String,
}

impl RawInput {
    pub fn new(bytes: impl Into<Vec<u8>>, extension: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            extension: extension.into(),
        }
    }

    /// Read a file; the extension comes from the path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(format!("Reading {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { bytes, extension })
    }

    pub fn format(&self) -> FileFormat {
        FileFormat::from_extension(&self.extension)
    }
}

/// Normalize raw bytes into a dataset. Never fails.
pub fn normalize(raw: &RawInput) -> Normalized {
    let decoded = String::from_utf8_lossy(&raw.bytes);
    let content = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);
    let format = raw.format();

    let normalized = match format {
        FileFormat::Csv => delimited::normalize_csv(content),
        FileFormat::Json => json::normalize_json(content),
        FileFormat::Text => text::normalize_text(content),
    };

    info!(
        "Normalized {:?} input: {} rows x {} columns ({})",
        format,
        normalized.dataset.height(),
        normalized.dataset.width(),
        normalized.label
    );
    normalized
}
