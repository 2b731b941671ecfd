//! Plain text ingestion: one feedback entry per non-blank line, unless the
//! text is really comma-separated data saved with the wrong extension.

use anyhow::bail;

use super::Normalized;
use super::delimited::{Mode, parse_delimited};
use super::strategy::{Strategy, Terminal, run_chain};
use crate::dataset::{Dataset, FEEDBACK_COLUMN};
use crate::types::FormatLabel;

const EMPTY_FILE_MESSAGE: &str = "No content found in file";

/// Lines inspected when deciding whether text is CSV-like.
const CSV_PROBE_LINES: usize = 10;

const TEXT_TERMINAL: Terminal = Terminal {
    message: "Error in file parsing - this is a placeholder entry",
    label: FormatLabel::TextParsingError,
};

/// Normalize a `.txt` (or unrecognized) upload.
pub fn normalize_text(content: &str) -> Normalized {
    const CHAIN: [Strategy; 2] = [
        Strategy::new("csv-like text", csv_like_attempt),
        Strategy::new("lines", lines_attempt),
    ];
    run_chain(content, &CHAIN, TEXT_TERMINAL)
}

/// Trimmed, non-blank lines. Handles `\n` and `\r\n`.
pub fn non_blank_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// At least two lines and a strict majority of the first few contain a comma.
pub fn looks_comma_separated(lines: &[String]) -> bool {
    if lines.len() < 2 {
        return false;
    }
    let probe = &lines[..lines.len().min(CSV_PROBE_LINES)];
    let with_comma = probe.iter().filter(|line| line.contains(',')).count();
    with_comma * 2 > probe.len()
}

fn csv_like_attempt(content: &str) -> anyhow::Result<Normalized> {
    if !looks_comma_separated(&non_blank_lines(content)) {
        bail!("text does not look comma-separated");
    }
    let dataset = parse_delimited(content, b',', Mode::Strict)?;
    if dataset.height() == 0 {
        bail!("comma-separated text has no data rows");
    }
    Ok(Normalized::new(dataset, FormatLabel::CsvLikeText))
}

fn lines_attempt(content: &str) -> anyhow::Result<Normalized> {
    let mut lines = non_blank_lines(content);
    if lines.is_empty() {
        lines.push(EMPTY_FILE_MESSAGE.to_string());
    }
    Ok(Normalized::new(
        Dataset::from_lines(FEEDBACK_COLUMN, &lines),
        FormatLabel::Text,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_dropped() {
        let out = normalize_text("first\n\n  \nsecond\r\n\nthird\n");
        assert_eq!(out.label, FormatLabel::Text);
        assert_eq!(
            out.dataset.text_values(FEEDBACK_COLUMN).unwrap(),
            vec![
                Some("first".to_string()),
                Some("second".to_string()),
                Some("third".to_string())
            ]
        );
    }

    #[test]
    fn test_empty_file_message() {
        let out = normalize_text("\n \n");
        assert_eq!(out.label, FormatLabel::Text);
        assert_eq!(
            out.dataset.text_values(FEEDBACK_COLUMN).unwrap(),
            vec![Some(EMPTY_FILE_MESSAGE.to_string())]
        );
    }

    #[test]
    fn test_csv_like_text() {
        let out = normalize_text("name,comment\nAna,Loved the boat\nBo,Guide was late\n");
        assert_eq!(out.label, FormatLabel::CsvLikeText);
        assert_eq!(out.dataset.column_names(), vec!["name", "comment"]);
        assert_eq!(out.dataset.height(), 2);
    }

    #[test]
    fn test_ragged_csv_like_text_falls_back_to_lines() {
        let content = "The tour was fine, I guess\nFood was cold, bus late, guide rude\n";
        let out = normalize_text(content);
        assert_eq!(out.label, FormatLabel::Text);
        assert_eq!(out.dataset.height(), 2);
    }

    #[test]
    fn test_prose_with_few_commas_is_text() {
        let lines: Vec<String> = ["Great, thanks", "Lovely day", "Nice views"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(!looks_comma_separated(&lines));
    }
}
