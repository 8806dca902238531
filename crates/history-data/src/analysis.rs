//! Main pipeline for listening-history exports.
//!
//! Discovery → per-file normalization → canonical relation → aggregate
//! views → CSV artifacts. Output directories are preconditions supplied by
//! the caller through [`OutputPaths`].

use std::path::{Path, PathBuf};

use history_core::error::{HistoryError, Result};
use history_core::models::ListeningSummary;
use history_core::settings::OutputPaths;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregator::ListeningAggregator;
use crate::reader::{find_history_files, load_normalized_records};
use crate::relation::build_relation;
use crate::writer::{
    write_canonical_csv, write_daily_csv, write_top_artists_csv, write_top_tracks_csv,
};

// ── Public types ──────────────────────────────────────────────────────────────

/// Tunables that do not change the artifacts' content.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Worker threads for per-file normalization; `None` uses the global pool.
    pub jobs: Option<usize>,
    /// Minimum daily minutes for the active-days figure.
    pub active_minutes: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            jobs: None,
            active_minutes: 10.0,
        }
    }
}

/// One artifact written by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub rows: usize,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub files_found: usize,
    pub files_skipped: usize,
    pub records_normalized: usize,
    /// Records dropped for a missing or unparseable timestamp.
    pub records_dropped: usize,
    pub canonical: ArtifactInfo,
    pub daily: ArtifactInfo,
    pub top_artists: ArtifactInfo,
    pub top_tracks: ArtifactInfo,
    pub summary: ListeningSummary,
}

impl RunReport {
    /// All artifacts in write order.
    pub fn artifacts(&self) -> [&ArtifactInfo; 4] {
        [&self.canonical, &self.daily, &self.top_artists, &self.top_tracks]
    }
}

/// Result of [`run_pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Artifacts were written.
    Written(RunReport),
    /// No qualifying records were found; nothing was written.
    NoData {
        files_found: usize,
        files_skipped: usize,
    },
}

impl PipelineOutcome {
    /// Number of artifacts the run produced.
    pub fn artifacts_written(&self) -> usize {
        match self {
            PipelineOutcome::Written(report) => report.artifacts().len(),
            PipelineOutcome::NoData { .. } => 0,
        }
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline over `input_root`.
///
/// 1. Discover export files.
/// 2. Normalize each file independently; broken files are skipped.
/// 3. Build and persist the canonical relation.
/// 4. Compute and persist the daily, artist and track views.
///
/// An empty relation is the [`PipelineOutcome::NoData`] outcome, not an
/// error. Write failures abort the run.
pub fn run_pipeline(
    input_root: &Path,
    outputs: &OutputPaths,
    options: &PipelineOptions,
) -> Result<PipelineOutcome> {
    for dir in outputs.directories() {
        if !dir.is_dir() {
            return Err(HistoryError::Config(format!(
                "output directory {} does not exist",
                dir.display()
            )));
        }
    }

    // ── Step 1: Discover ──────────────────────────────────────────────────────
    let files = find_history_files(input_root);
    info!("Found {} export files under {}", files.len(), input_root.display());

    // ── Step 2: Normalize ─────────────────────────────────────────────────────
    let loaded = load_normalized_records(&files, options.jobs)?;
    let records_normalized = loaded.records.len();

    // ── Step 3: Canonical relation ────────────────────────────────────────────
    let relation = build_relation(loaded.records);
    if relation.is_empty() {
        warn!(
            "No listening records found under {} ({} files, {} skipped)",
            input_root.display(),
            files.len(),
            loaded.skipped.len()
        );
        return Ok(PipelineOutcome::NoData {
            files_found: files.len(),
            files_skipped: loaded.skipped.len(),
        });
    }

    let canonical_path = outputs.canonical_csv();
    let canonical_rows = write_canonical_csv(&canonical_path, &relation.records)?;

    // ── Step 4: Aggregates ────────────────────────────────────────────────────
    let daily = ListeningAggregator::daily(&relation.records);
    let artists = ListeningAggregator::top_artists(&relation.records);
    let tracks = ListeningAggregator::top_tracks(&relation.records);

    let daily_path = outputs.daily_csv();
    let artists_path = outputs.top_artists_csv();
    let tracks_path = outputs.top_tracks_csv();
    let daily_rows = write_daily_csv(&daily_path, &daily)?;
    let artist_rows = write_top_artists_csv(&artists_path, &artists)?;
    let track_rows = write_top_tracks_csv(&tracks_path, &tracks)?;

    let summary = ListeningAggregator::summarize(&relation.records, &daily, options.active_minutes);

    info!(
        "Wrote {} canonical rows, {} days, {} artists, {} tracks",
        canonical_rows, daily_rows, artist_rows, track_rows
    );

    Ok(PipelineOutcome::Written(RunReport {
        files_found: files.len(),
        files_skipped: loaded.skipped.len(),
        records_normalized,
        records_dropped: relation.dropped,
        canonical: ArtifactInfo {
            path: canonical_path,
            rows: canonical_rows,
        },
        daily: ArtifactInfo {
            path: daily_path,
            rows: daily_rows,
        },
        top_artists: ArtifactInfo {
            path: artists_path,
            rows: artist_rows,
        },
        top_tracks: ArtifactInfo {
            path: tracks_path,
            rows: track_rows,
        },
        summary,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
