//! JSONL discovery and loading for event and episode exports.
//!
//! Each line holds one JSON record. A path may name a single file or a
//! directory, in which case every `.jsonl` file beneath it is read in path
//! order.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use metrics_core::error::{MetricsError, Result};
use metrics_core::models::{Episode, SentMessage};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.jsonl` files recursively under `data_path`, sorted by path.
pub fn find_jsonl_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "jsonl")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load sent messages with their events.
pub fn load_sent_messages(path: &Path) -> Result<Vec<SentMessage>> {
    load_records(path)
}

/// Load episode metadata.
pub fn load_episodes(path: &Path) -> Result<Vec<Episode>> {
    load_records(path)
}

/// Load every record of type `T` from `path` (file or directory).
///
/// Blank lines are ignored and lines that fail to parse are skipped with a
/// warning, so one bad export line never hides the rest of the file.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(MetricsError::DataPathNotFound(path.to_path_buf()));
    }

    let files = if path.is_dir() {
        let files = find_jsonl_files(path);
        if files.is_empty() {
            return Err(MetricsError::NoDataFiles(path.to_path_buf()));
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut records = Vec::new();
    for file in &files {
        records.extend(read_jsonl_file::<T>(file)?);
    }

    debug!(
        "Loaded {} records from {} files",
        records.len(),
        files.len()
    );
    Ok(records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_jsonl_file<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(file_path).map_err(|source| MetricsError::FileRead {
        path: file_path.to_path_buf(),
        source,
    })?;

    let reader = std::io::BufReader::new(file);
    let mut records = Vec::new();
    let mut skipped = 0u64;

    for (index, line_result) in reader.lines().enumerate() {
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    "Failed to read line {} of {}: {}",
                    index + 1,
                    file_path.display(),
                    e
                );
                skipped += 1;
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    "Skipping malformed line {} of {}: {}",
                    index + 1,
                    file_path.display(),
                    e
                );
                skipped += 1;
            }
        }
    }

    debug!(
        "File {}: {} parsed, {} skipped",
        file_path.display(),
        records.len(),
        skipped,
    );
    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
