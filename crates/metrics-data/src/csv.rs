//! Featured-content CSV parsing.
//!
//! The featured list is a small static asset with a header row and one item
//! per line. Quoted cells follow RFC 4180 (`""` is a literal quote, commas
//! inside quotes do not split) but a quoted cell may not span lines.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use metrics_core::error::{MetricsError, Result};
use metrics_core::models::FeaturedItem;
use regex::Regex;
use tracing::debug;

/// Columns a row must have non-empty to be kept.
pub const REQUIRED_FIELDS: &[&str] = &["title", "image_url"];

static CAMEL_BOUNDARY: OnceLock<Regex> = OnceLock::new();
static NON_ALNUM: OnceLock<Regex> = OnceLock::new();

fn camel_boundary() -> &'static Regex {
    CAMEL_BOUNDARY.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"))
}

fn non_alnum() -> &'static Regex {
    NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"))
}

/// Split one CSV line into trimmed cells.
///
/// A quote toggles quoted mode unless it is the first half of a doubled
/// quote inside a quoted cell, which yields a literal `"`.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Canonical column key: `"Image URL"` and `"imageUrl"` both become
/// `"image_url"`.
pub fn normalize_header(header: &str) -> String {
    let split = camel_boundary().replace_all(header.trim(), "${1}_${2}");
    let lower = split.to_lowercase();
    non_alnum()
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

/// Parse featured items from `text`.
///
/// The first non-blank line is the header. At most `max_rows` lines after it
/// are read; blank lines among them are skipped. Rows missing a title or
/// image URL are dropped without error. Returns an empty list when there is
/// no header.
pub fn parse_featured_csv(text: &str, max_rows: Option<usize>) -> Vec<FeaturedItem> {
    try_parse_featured_csv(text, max_rows).unwrap_or_default()
}

/// Like [`parse_featured_csv`] but reports a missing header.
pub fn try_parse_featured_csv(text: &str, max_rows: Option<usize>) -> Result<Vec<FeaturedItem>> {
    let mut lines = text.lines().skip_while(|l| l.trim().is_empty());
    let header_line = lines.next().ok_or(MetricsError::MissingCsvHeader)?;
    let headers: Vec<String> = parse_csv_line(header_line)
        .iter()
        .map(|h| normalize_header(h))
        .collect();

    let data_lines = lines.take(max_rows.unwrap_or(usize::MAX));

    let mut items = Vec::new();
    let mut dropped = 0usize;
    for line in data_lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut cells = parse_csv_line(line).into_iter();
        let fields: BTreeMap<String, String> = headers
            .iter()
            .map(|h| (h.clone(), cells.next().unwrap_or_default()))
            .collect();
        let item = FeaturedItem { fields };

        if REQUIRED_FIELDS.iter().any(|f| item.get(f).is_empty()) {
            dropped += 1;
            continue;
        }
        items.push(item);
    }

    debug!(
        kept = items.len(),
        dropped,
        columns = headers.len(),
        "parsed featured csv"
    );
    Ok(items)
}

/// Read and parse a featured-content CSV file.
pub fn load_featured_file(path: &Path, max_rows: Option<usize>) -> Result<Vec<FeaturedItem>> {
    if !path.exists() {
        return Err(MetricsError::DataPathNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| MetricsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    try_parse_featured_csv(&text, max_rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
