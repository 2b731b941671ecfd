//! Schema-flexible feedback table.
//!
//! A [`Dataset`] wraps a polars [`DataFrame`] whose columns are whatever the
//! input file provided. Ingestion guarantees at least one row and one column;
//! the aggregation engine appends the `sentiment`, `category` and `key_points`
//! annotation columns, which are read back through typed accessors.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result, ResultExt};
use crate::types::{Category, Enrichment, Sentiment};
use crate::utils::{dtype_label, percentage, truncate_str};

/// Column used whenever ingestion produces one entry per line or item.
pub const FEEDBACK_COLUMN: &str = "feedback";

/// Annotation column names appended by the aggregation engine.
pub const SENTIMENT_COLUMN: &str = "sentiment";
pub const CATEGORY_COLUMN: &str = "category";
pub const KEY_POINTS_COLUMN: &str = "key_points";

/// Preview of a single column, as shown before analysis starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub non_null_count: usize,
    pub null_percentage: f64,
    /// First non-null value, truncated to 50 characters.
    pub sample_value: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    pub fn from_frame(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Single-row, single-column dataset carrying a diagnostic message.
    pub fn placeholder(message: &str) -> Self {
        let series = Series::new(FEEDBACK_COLUMN.into(), [message]);
        Self {
            frame: series.into_frame(),
        }
    }

    /// One-column dataset with one row per line.
    pub fn from_lines(column: &str, lines: &[String]) -> Self {
        let series = Series::new(column.into(), lines);
        Self {
            frame: series.into_frame(),
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.width() == 0 || self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    fn series(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map(|column| column.as_materialized_series())
            .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))
    }

    pub fn dtype(&self, name: &str) -> Result<DataType> {
        Ok(self.series(name)?.dtype().clone())
    }

    /// Per-column preview: dtype, non-null count, null share and a sample value.
    pub fn column_info(&self) -> Vec<ColumnInfo> {
        let height = self.frame.height();
        self.frame
            .get_columns()
            .iter()
            .map(|column| {
                let series = column.as_materialized_series();
                let null_count = series.null_count();
                let sample_value = first_non_null(series).map(|value| truncate_str(&value, 50));

                ColumnInfo {
                    name: series.name().to_string(),
                    dtype: dtype_label(series.dtype()).to_string(),
                    non_null_count: height - null_count,
                    null_percentage: percentage(null_count, height),
                    sample_value,
                }
            })
            .collect()
    }

    /// First non-null value of a column rendered as text.
    pub fn first_value(&self, name: &str) -> Result<Option<String>> {
        Ok(first_non_null(self.series(name)?))
    }

    /// Every value of a column rendered as text; nulls stay `None`.
    ///
    /// String columns are read directly, other dtypes are cast to string, and
    /// dtypes polars cannot cast fall back to their display form.
    pub fn text_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let series = self.series(name)?;

        if let Ok(strings) = series.str() {
            return Ok(strings.into_iter().map(|v| v.map(str::to_string)).collect());
        }

        if let Ok(cast) = series.cast(&DataType::String)
            && let Ok(strings) = cast.str()
        {
            return Ok(strings.into_iter().map(|v| v.map(str::to_string)).collect());
        }

        (0..series.len())
            .map(|i| {
                let value = series.get(i).context("Reading feedback value")?;
                Ok(if value.is_null() {
                    None
                } else {
                    Some(value.to_string())
                })
            })
            .collect()
    }

    /// Contiguous row range `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        Self {
            frame: self.frame.slice(offset as i64, len),
        }
    }

    /// Append the annotation columns, replacing any same-named columns.
    pub fn annotate(&mut self, enrichments: &[Enrichment]) -> Result<()> {
        if enrichments.len() != self.frame.height() {
            return Err(AnalysisError::Internal(format!(
                "{} annotations for {} rows",
                enrichments.len(),
                self.frame.height()
            )));
        }

        let sentiments: Vec<&str> = enrichments.iter().map(|e| e.sentiment.as_str()).collect();
        let categories: Vec<&str> = enrichments.iter().map(|e| e.category.as_str()).collect();
        let key_points = key_points_series(enrichments);

        self.frame
            .with_column(Series::new(SENTIMENT_COLUMN.into(), sentiments))
            .context("Adding sentiment column")?;
        self.frame
            .with_column(Series::new(CATEGORY_COLUMN.into(), categories))
            .context("Adding category column")?;
        self.frame
            .with_column(key_points)
            .context("Adding key points column")?;
        Ok(())
    }

    /// Concatenate `other`'s rows below this dataset's rows.
    pub fn append(&mut self, other: &Dataset) -> Result<()> {
        if self.frame.width() == 0 {
            self.frame = other.frame.clone();
            return Ok(());
        }
        self.frame
            .vstack_mut(&other.frame)
            .context("Concatenating annotated chunks")?;
        Ok(())
    }

    pub fn sentiments(&self) -> Result<Vec<Sentiment>> {
        Ok(self
            .text_values(SENTIMENT_COLUMN)?
            .into_iter()
            .map(|v| v.map_or(Sentiment::Neutral, |s| Sentiment::from_label(&s)))
            .collect())
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        Ok(self
            .text_values(CATEGORY_COLUMN)?
            .into_iter()
            .map(|v| v.map_or(Category::Other, |s| Category::from_label(&s)))
            .collect())
    }

    pub fn key_points(&self) -> Result<Vec<Vec<String>>> {
        let series = self.series(KEY_POINTS_COLUMN)?;
        let lists = series.list().context("Reading key points")?;

        let mut out = Vec::with_capacity(lists.len());
        for row in lists.into_iter() {
            let points = match row {
                Some(inner) => inner
                    .str()
                    .context("Reading key points")?
                    .into_iter()
                    .flatten()
                    .map(str::to_string)
                    .collect(),
                None => Vec::new(),
            };
            out.push(points);
        }
        Ok(out)
    }

    /// Frame with `key_points` flattened to `"; "`-joined strings, for CSV export.
    pub fn export_frame(&self) -> Result<DataFrame> {
        let mut frame = self.frame.clone();
        if self.has_column(KEY_POINTS_COLUMN) {
            let joined: Vec<String> = self
                .key_points()?
                .into_iter()
                .map(|points| points.join("; "))
                .collect();
            frame
                .with_column(Series::new(KEY_POINTS_COLUMN.into(), joined))
                .context("Flattening key points")?;
        }
        Ok(frame)
    }
}

fn first_non_null(series: &Series) -> Option<String> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return None;
    }
    if let Ok(strings) = non_null.str() {
        return strings.get(0).map(str::to_string);
    }
    non_null.get(0).ok().map(|value| value.to_string())
}

fn key_points_series(enrichments: &[Enrichment]) -> Series {
    if enrichments.is_empty() {
        return Series::new_empty(
            KEY_POINTS_COLUMN.into(),
            &DataType::List(Box::new(DataType::String)),
        );
    }
    let rows: Vec<Series> = enrichments
        .iter()
        .map(|e| Series::new(PlSmallStr::EMPTY, e.key_points.clone()))
        .collect();
    Series::new(KEY_POINTS_COLUMN.into(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let frame = df!(
            "id" => [1i64, 2, 3],
            "comment" => [Some("Great guide"), None, Some("Bus was late")],
        )
        .unwrap();
        Dataset::from_frame(frame)
    }

    #[test]
    fn test_placeholder_is_one_by_one() {
        let ds = Dataset::placeholder("nothing here");
        assert_eq!(ds.height(), 1);
        assert_eq!(ds.width(), 1);
        assert_eq!(ds.column_names(), vec![FEEDBACK_COLUMN]);
        assert_eq!(
            ds.text_values(FEEDBACK_COLUMN).unwrap(),
            vec![Some("nothing here".to_string())]
        );
    }

    #[test]
    fn test_text_values_casts_numbers() {
        let ds = sample();
        assert_eq!(
            ds.text_values("id").unwrap(),
            vec![Some("1".to_string()), Some("2".to_string()), Some("3".to_string())]
        );
        assert_eq!(ds.text_values("comment").unwrap()[1], None);
    }

    #[test]
    fn test_missing_column() {
        let err = sample().text_values("nope").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_column_info() {
        let info = sample().column_info();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].dtype, "integer");
        assert_eq!(info[1].non_null_count, 2);
        assert!((info[1].null_percentage - 33.333).abs() < 0.01);
        assert_eq!(info[1].sample_value.as_deref(), Some("Great guide"));
    }

    #[test]
    fn test_annotate_and_read_back() {
        let mut ds = sample();
        let enrichments = vec![
            Enrichment::new(
                Sentiment::Positive,
                Category::ActivitiesGuides,
                vec!["guide".to_string()],
            ),
            Enrichment::default(),
            Enrichment::new(Sentiment::Negative, Category::Transportation, vec![]),
        ];
        ds.annotate(&enrichments).unwrap();

        assert_eq!(ds.width(), 5);
        assert_eq!(
            ds.sentiments().unwrap(),
            vec![Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative]
        );
        assert_eq!(ds.categories().unwrap()[2], Category::Transportation);
        assert_eq!(
            ds.key_points().unwrap(),
            vec![vec!["guide".to_string()], vec![], vec![]]
        );
    }

    #[test]
    fn test_annotate_rejects_length_mismatch() {
        let mut ds = sample();
        assert!(ds.annotate(&[Enrichment::default()]).is_err());
    }

    #[test]
    fn test_slice_and_append() {
        let ds = sample();
        let mut head = ds.slice(0, 2);
        let tail = ds.slice(2, 1);
        assert_eq!(head.height(), 2);
        head.append(&tail).unwrap();
        assert_eq!(head.height(), 3);

        let mut empty = Dataset::default();
        empty.append(&tail).unwrap();
        assert_eq!(empty.height(), 1);
    }

    #[test]
    fn test_export_frame_flattens_key_points() {
        let mut ds = Dataset::from_lines(FEEDBACK_COLUMN, &["Nice".to_string()]);
        ds.annotate(&[Enrichment::new(
            Sentiment::Positive,
            Category::Other,
            vec!["a".to_string(), "b".to_string()],
        )])
        .unwrap();
        let frame = ds.export_frame().unwrap();
        let col = frame.column(KEY_POINTS_COLUMN).unwrap();
        assert_eq!(col.dtype(), &DataType::String);
        assert_eq!(col.as_materialized_series().str().unwrap().get(0), Some("a; b"));
    }
}
