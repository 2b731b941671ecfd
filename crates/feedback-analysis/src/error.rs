//! Custom error types for the feedback analysis pipeline.
//!
//! Malformed input never surfaces here: ingestion degrades to a placeholder
//! dataset and provider failures degrade to fallback values. What remains are
//! structural problems (no columns, a missing column, bad configuration) and
//! the IO/serialization errors of the surrounding plumbing.
//!
//! Errors are serializable as `{code, message}` so callers can forward them to
//! a UI or write them into a JSON report.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for feedback analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The dataset has no columns, so there is nothing to analyze.
    #[error("Dataset has no columns")]
    NoColumns,

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pipeline was built without an enrichment provider.
    #[error("No AI provider configured")]
    MissingProvider,

    /// Report generation failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP request error (for AI providers, only with "ai" feature).
    #[cfg(feature = "ai")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for machine consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoColumns => "NO_COLUMNS",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::MissingProvider => "MISSING_PROVIDER",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            #[cfg(feature = "ai")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the caller can fix this by changing inputs or settings.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::NoColumns
            | Self::ColumnNotFound(_)
            | Self::InvalidConfig(_)
            | Self::MissingProvider => true,
            Self::WithContext { source, .. } => source.is_user_error(),
            _ => false,
        }
    }
}

impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(AnalysisError::NoColumns.error_code(), "NO_COLUMNS");
        assert_eq!(
            AnalysisError::ColumnNotFound("feedback".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(AnalysisError::MissingProvider.error_code(), "MISSING_PROVIDER");
    }

    #[test]
    fn test_is_user_error() {
        assert!(AnalysisError::NoColumns.is_user_error());
        assert!(AnalysisError::InvalidConfig("x".to_string()).is_user_error());
        assert!(!AnalysisError::Internal("boom".to_string()).is_user_error());
        assert!(
            AnalysisError::MissingProvider
                .with_context("building pipeline")
                .is_user_error()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = AnalysisError::ColumnNotFound("review_text".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("review_text"));
    }

    #[test]
    fn test_with_context() {
        let error = AnalysisError::ColumnNotFound("text".to_string())
            .with_context("While selecting feedback column");
        assert!(error.to_string().contains("While selecting feedback column"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_io_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result.context("Reading input").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.to_string().starts_with("Reading input"));
    }
}
