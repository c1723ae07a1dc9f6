//! Export discovery and decoding
//!
//! Files are read whole. Decoding tries simd-json first and falls back to
//! serde_json, whose error message is the one surfaced to the log. The
//! fallback rereads the file instead of keeping a second copy in memory.

use crate::error::{LoadError, Result};
use crate::types::{Record, SourcedRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// List the `*.json` files directly inside `dir`, sorted by path
pub fn discover_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && has_json_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Read and decode a single export file
pub fn read_record<P: AsRef<Path>>(path: P) -> Result<Record> {
    let path = path.as_ref();
    let mut content = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if let Ok(record) = simd_json::serde::from_slice::<Record>(&mut content) {
        return Ok(record);
    }

    // simd-json parses in place, so the fallback needs the bytes from disk again
    let content = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode every path, logging and skipping the ones that fail
///
/// Returns the decoded records in input order and the number of skipped files.
pub fn load_records(paths: &[PathBuf]) -> (Vec<SourcedRecord>, usize) {
    let mut records = Vec::with_capacity(paths.len());
    let mut skipped = 0;

    for path in paths {
        match read_record(path) {
            Ok(record) => {
                debug!(
                    file = %path.display(),
                    columns = record.column_names.len(),
                    rows = record.rows.len(),
                    "decoded export"
                );
                records.push(SourcedRecord {
                    path: path.clone(),
                    record,
                });
            }
            Err(e) => {
                warn!(file = %path.display(), "skipping file: {}", e);
                skipped += 1;
            }
        }
    }

    (records, skipped)
}
