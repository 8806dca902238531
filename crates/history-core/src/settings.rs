use clap::Parser;
use std::path::{Path, PathBuf};

use crate::error::{HistoryError, Result};

/// File name of the canonical artifact inside the processed directory.
pub const CANONICAL_FILE_NAME: &str = "streaming_history_clean.csv";
/// Daily listening minutes artifact.
pub const DAILY_FILE_NAME: &str = "listening_minutes_by_day.csv";
/// Artist ranking artifact.
pub const TOP_ARTISTS_FILE_NAME: &str = "top_artists.csv";
/// Track ranking artifact.
pub const TOP_TRACKS_FILE_NAME: &str = "top_tracks.csv";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Normalize listening-history exports into a clean CSV plus analytics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "listening-history",
    about = "Normalize listening-history exports into a clean CSV plus analytics",
    version
)]
pub struct Settings {
    /// Folder containing the unzipped export JSON files
    #[arg(long, env = "LISTENING_HISTORY_INPUT", default_value = "data/raw")]
    pub input: PathBuf,

    /// Folder receiving the canonical CSV
    #[arg(long, default_value = "data/processed")]
    pub processed_dir: PathBuf,

    /// Folder receiving the analytics CSVs
    #[arg(long, default_value = "data/analytics")]
    pub analytics_dir: PathBuf,

    /// Minimum minutes per day for a day to count as active
    #[arg(long, default_value = "10")]
    pub active_minutes: f64,

    /// Worker threads used to normalize files (defaults to one per core)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=256))]
    pub jobs: Option<u32>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Output locations injected into the pipeline.
    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths::new(&self.processed_dir, &self.analytics_dir)
    }

    /// Reject values clap cannot range-check on its own.
    pub fn validate(&self) -> Result<()> {
        if !self.active_minutes.is_finite() || self.active_minutes < 0.0 {
            return Err(HistoryError::Config(format!(
                "active-minutes must be a non-negative number, got {}",
                self.active_minutes
            )));
        }
        Ok(())
    }
}

// ── OutputPaths ────────────────────────────────────────────────────────────────

/// Where the pipeline writes its artifacts.
///
/// Both directories must already exist when the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub processed_dir: PathBuf,
    pub analytics_dir: PathBuf,
}

impl OutputPaths {
    pub fn new(processed_dir: &Path, analytics_dir: &Path) -> Self {
        Self {
            processed_dir: processed_dir.to_path_buf(),
            analytics_dir: analytics_dir.to_path_buf(),
        }
    }

    pub fn canonical_csv(&self) -> PathBuf {
        self.processed_dir.join(CANONICAL_FILE_NAME)
    }

    pub fn daily_csv(&self) -> PathBuf {
        self.analytics_dir.join(DAILY_FILE_NAME)
    }

    pub fn top_artists_csv(&self) -> PathBuf {
        self.analytics_dir.join(TOP_ARTISTS_FILE_NAME)
    }

    pub fn top_tracks_csv(&self) -> PathBuf {
        self.analytics_dir.join(TOP_TRACKS_FILE_NAME)
    }

    /// The directories the pipeline expects to exist.
    pub fn directories(&self) -> [&Path; 2] {
        [self.processed_dir.as_path(), self.analytics_dir.as_path()]
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
