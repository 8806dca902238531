//! Export file discovery and loading.
//!
//! Finds candidate JSON export files under an input root, parses each one in
//! isolation and maps its objects into [`NormalizedRecord`]s. A file that
//! cannot be read or parsed is skipped without affecting the others.

use std::path::{Path, PathBuf};

use history_core::error::{HistoryError, Result};
use history_core::models::{CanonicalRecord, NormalizedRecord, SchemaKind};
use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::normalizer::{classify, normalize_all};
use crate::relation::build_relation;

/// File-name markers of every known export format.
pub const DISCOVERY_MARKERS: &[&str] = &["endsong", "streaminghistory", "streaming_history", "audio"];

/// Key under which some exports wrap their list of plays.
pub const WRAPPER_KEY: &str = "plays";

// ── Public types ──────────────────────────────────────────────────────────────

/// Records produced by one batch load, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<NormalizedRecord>,
    /// Files that were parsed successfully.
    pub files_read: usize,
    /// Files skipped because they could not be read or parsed.
    pub skipped: Vec<PathBuf>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all export files recursively under `root`, sorted by path.
///
/// A file qualifies when its extension is `json` and its lower-cased name
/// contains one of [`DISCOVERY_MARKERS`]. A missing root yields no files.
pub fn find_history_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        warn!("Input path does not exist: {}", root.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_history_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read and parse one export file, unwrapping it into a list of objects.
pub fn read_history_file(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let bytes = std::fs::read(path).map_err(|source| HistoryError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_slice(&bytes)?;
    Ok(unwrap_container(value))
}

/// Turn a parsed document into its sequence of record objects.
///
/// * an object holding a list under [`WRAPPER_KEY`] → that list
/// * any other object → a single record
/// * a list → used as-is
///
/// Elements that are not objects are dropped.
pub fn unwrap_container(value: Value) -> Vec<Map<String, Value>> {
    let items = match value {
        Value::Object(mut map) => match map.remove(WRAPPER_KEY) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert(WRAPPER_KEY.to_string(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Load and normalize every file in `files`.
///
/// Files are processed on a rayon pool (`jobs` threads, or the global pool
/// when `None`); results are merged back in the order of `files`.
pub fn load_normalized_records(files: &[PathBuf], jobs: Option<usize>) -> Result<LoadedRecords> {
    let results: Vec<Option<Vec<NormalizedRecord>>> = match jobs {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| HistoryError::Config(format!("cannot build worker pool: {}", e)))?;
            pool.install(|| files.par_iter().map(|p| process_single_file(p)).collect())
        }
        None => files.par_iter().map(|p| process_single_file(p)).collect(),
    };

    let mut loaded = LoadedRecords::default();
    for (path, result) in files.iter().zip(results) {
        match result {
            Some(records) => {
                loaded.files_read += 1;
                loaded.records.extend(records);
            }
            None => loaded.skipped.push(path.clone()),
        }
    }

    info!(
        "Normalized {} records from {} files ({} skipped)",
        loaded.records.len(),
        loaded.files_read,
        loaded.skipped.len()
    );

    Ok(loaded)
}

/// Read a canonical artifact back into cleaned records.
///
/// Rows go through the same cleaning as freshly normalized records; rows with
/// an unknown `source` label are dropped.
pub fn load_canonical_csv(path: &Path) -> Result<Vec<CanonicalRecord>> {
    let csv_err = |source: csv::Error| HistoryError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let (played_at, track, artist, ms_played, uri, source) = (
        column("played_at"),
        column("track"),
        column("artist"),
        column("ms_played"),
        column("spotify_uri"),
        column("source"),
    );

    let mut normalized = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

        let Some(kind) = SchemaKind::from_label(cell(source)) else {
            debug!("Dropping canonical row with unknown source {:?}", cell(source));
            continue;
        };
        let ts = cell(played_at);
        let uri_text = cell(uri);

        normalized.push(NormalizedRecord {
            played_at: (!ts.is_empty()).then(|| Value::String(ts.to_string())),
            track: cell(track).to_string(),
            artist: cell(artist).to_string(),
            ms_played: Value::String(cell(ms_played).to_string()),
            spotify_uri: (!uri_text.is_empty()).then(|| uri_text.to_string()),
            source: kind,
        });
    }

    Ok(build_relation(normalized).records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_history_file(path: &Path) -> bool {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if !is_json {
        return false;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    DISCOVERY_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Parse and normalize one file; `None` means the file was skipped.
fn process_single_file(path: &Path) -> Option<Vec<NormalizedRecord>> {
    let objects = match read_history_file(path) {
        Ok(objects) => objects,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return None;
        }
    };

    let kind = classify(path);
    let records = normalize_all(kind, &objects);

    debug!(
        "File {}: schema {}, {} records",
        path.display(),
        kind,
        records.len()
    );

    Some(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
