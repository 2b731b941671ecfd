//! Delimited text ingestion.
//!
//! Records are read with the `csv` crate so ragged rows can be filtered or
//! rejected row by row, then the clean buffer is handed to polars' CSV reader
//! for schema inference, falling back to text columns when inference fails.

use std::collections::HashSet;
use std::io::Cursor;

use anyhow::{Context, anyhow, bail};
use polars::prelude::*;
use tracing::{info, warn};

use super::Normalized;
use super::strategy::{Strategy, Terminal, run_chain};
use crate::dataset::Dataset;
use crate::types::FormatLabel;

/// Bytes inspected when sniffing the delimiter.
const SNIFF_SAMPLE_BYTES: usize = 1024;

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Minimum share of sample lines that must agree on the modal field count.
const MIN_CONSISTENCY: f64 = 0.5;

const NO_DATA_MESSAGE: &str = "CSV parsing resulted in no data - please check file format";

const CSV_TERMINAL: Terminal = Terminal {
    message: "Error in CSV parsing - this is a placeholder entry",
    label: FormatLabel::CsvParsingError,
};

/// How ragged rows are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Skip rows with too many fields, pad short rows with nulls.
    Permissive,
    /// Fail on the first row with more fields than the header.
    Strict,
}

/// Normalize a `.csv` upload.
pub fn normalize_csv(content: &str) -> Normalized {
    const CHAIN: [Strategy; 2] = [
        Strategy::new("sniffed delimiter", sniffed_attempt),
        Strategy::new("comma delimiter", comma_attempt),
    ];
    run_chain(content, &CHAIN, CSV_TERMINAL)
}

fn sniffed_attempt(content: &str) -> anyhow::Result<Normalized> {
    let delimiter = match sniff_delimiter(content) {
        Some(d) => d,
        None => {
            info!("Could not detect CSV delimiter, using comma as default");
            b','
        }
    };
    permissive_result(content, delimiter)
}

fn comma_attempt(content: &str) -> anyhow::Result<Normalized> {
    permissive_result(content, b',')
}

fn permissive_result(content: &str, delimiter: u8) -> anyhow::Result<Normalized> {
    let dataset = parse_delimited(content, delimiter, Mode::Permissive)?;
    if dataset.height() == 0 {
        warn!("CSV file appears to be empty or could not be parsed");
        return Ok(Normalized::new(
            Dataset::placeholder(NO_DATA_MESSAGE),
            FormatLabel::Csv,
        ));
    }
    Ok(Normalized::new(dataset, FormatLabel::Csv))
}

/// Guess the field delimiter from the first KiB of `content`.
///
/// Each candidate is counted per line outside double-quoted sections. A
/// candidate qualifies when its most common non-zero per-line count is shared
/// by at least half of the sampled lines; the most consistent candidate wins,
/// earlier candidates win ties.
pub fn sniff_delimiter(content: &str) -> Option<u8> {
    let sample = sample_prefix(content, SNIFF_SAMPLE_BYTES);
    let lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, f64)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .collect();

        let Some((modal, agreeing)) = modal_count(&counts) else {
            continue;
        };
        if modal == 0 {
            continue;
        }

        let consistency = agreeing as f64 / counts.len() as f64;
        if consistency < MIN_CONSISTENCY {
            continue;
        }
        if best.is_none_or(|(_, score)| consistency > score) {
            best = Some((candidate, consistency));
        }
    }

    best.map(|(delimiter, _)| delimiter)
}

/// First `max_bytes` of `content`, cut on a char boundary; a partial last
/// line is dropped.
fn sample_prefix(content: &str, max_bytes: usize) -> &str {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    let sample = &content[..end];
    match sample.rfind('\n') {
        Some(pos) => &sample[..pos],
        None => sample,
    }
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Most frequent value and how many entries have it; smaller values win ties.
fn modal_count(counts: &[usize]) -> Option<(usize, usize)> {
    let mut tally: Vec<(usize, usize)> = Vec::new();
    for &c in counts {
        match tally.iter_mut().find(|(value, _)| *value == c) {
            Some((_, n)) => *n += 1,
            None => tally.push((c, 1)),
        }
    }
    tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
}

/// Parse delimited text with a header row into a dataset.
pub fn parse_delimited(content: &str, delimiter: u8, mode: Mode) -> anyhow::Result<Dataset> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("Reading CSV header")?.clone();
    if headers.is_empty() {
        bail!("no header row");
    }
    let names = unique_headers(headers.iter());
    let width = names.len();

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut skipped = 0usize;
    for (index, record) in reader.records().enumerate() {
        let record = match (record, mode) {
            (Ok(record), _) => record,
            (Err(e), Mode::Strict) => return Err(e).context(format!("Reading row {}", index + 1)),
            (Err(_), Mode::Permissive) => {
                skipped += 1;
                continue;
            }
        };

        if record.len() > width {
            match mode {
                Mode::Strict => bail!(
                    "row {} has {} fields, header has {}",
                    index + 1,
                    record.len(),
                    width
                ),
                Mode::Permissive => {
                    skipped += 1;
                    continue;
                }
            }
        }

        rows.push(
            (0..width)
                .map(|i| record.get(i).filter(|v| !v.is_empty()).map(str::to_string))
                .collect(),
        );
    }

    if skipped > 0 {
        warn!("Skipped {skipped} malformed CSV rows");
    }

    rows_to_dataset(&names, &rows)
}

/// Make header names non-empty and unique.
fn unique_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for (i, raw) in headers.enumerate() {
        let base = match raw.trim() {
            "" => format!("column_{}", i + 1),
            name => name.to_string(),
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while !seen.insert(name.clone()) {
            suffix += 1;
            name = format!("{base}_{suffix}");
        }
        names.push(name);
    }
    names
}

/// Re-emit clean records and let polars infer column types.
///
/// Values polars cannot type (integers wider than `i64`, for one) fall back to
/// an all-text frame built from the records.
fn rows_to_dataset(names: &[String], rows: &[Vec<Option<String>>]) -> anyhow::Result<Dataset> {
    if rows.is_empty() {
        return Ok(Dataset::default());
    }

    let mut writer = ::csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(names)?;
    for row in rows {
        writer.write_record(row.iter().map(|v| v.as_deref().unwrap_or("")))?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|e| anyhow!("Flushing cleaned CSV: {e}"))?;

    let inferred = CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(buffer))
        .finish();

    match inferred {
        Ok(frame) => Ok(Dataset::from_frame(frame)),
        Err(e) => {
            warn!("Type inference failed ({e}), reading every column as text");
            text_frame(names, rows)
        }
    }
}

fn text_frame(names: &[String], rows: &[Vec<Option<String>>]) -> anyhow::Result<Dataset> {
    let columns: Vec<Column> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<Option<&str>> = rows
                .iter()
                .map(|row| row.get(i).and_then(|v| v.as_deref()))
                .collect();
            Series::new(name.as_str().into(), values).into()
        })
        .collect();
    let frame = DataFrame::new(columns).context("Building text frame from CSV records")?;
    Ok(Dataset::from_frame(frame))
}
