//! CSV persistence for the canonical relation and the aggregate views.
//!
//! Every artifact is UTF-8, comma-delimited, with a header row. Output
//! directories must already exist.

use std::path::Path;

use history_core::error::{HistoryError, Result};
use history_core::formatting::{format_csv_float, format_timestamp};
use history_core::models::{ArtistAggregate, CanonicalRecord, DailyAggregate, TrackAggregate};
use tracing::debug;

pub const CANONICAL_HEADER: [&str; 7] = [
    "played_at",
    "track",
    "artist",
    "ms_played",
    "spotify_uri",
    "source",
    "date",
];
pub const DAILY_HEADER: [&str; 2] = ["date", "minutes"];
pub const TOP_ARTISTS_HEADER: [&str; 3] = ["artist", "minutes", "plays"];
pub const TOP_TRACKS_HEADER: [&str; 4] = ["track", "artist", "minutes", "plays"];

/// Write the canonical relation, one row per record.
pub fn write_canonical_csv(path: &Path, records: &[CanonicalRecord]) -> Result<usize> {
    write_rows(
        path,
        &CANONICAL_HEADER,
        records.iter().map(|r| {
            vec![
                format_timestamp(&r.played_at),
                r.track.clone(),
                r.artist.clone(),
                r.ms_played.to_string(),
                r.spotify_uri.clone().unwrap_or_default(),
                r.source.as_str().to_string(),
                r.date().format("%Y-%m-%d").to_string(),
            ]
        }),
    )
}

pub fn write_daily_csv(path: &Path, daily: &[DailyAggregate]) -> Result<usize> {
    write_rows(
        path,
        &DAILY_HEADER,
        daily.iter().map(|d| {
            vec![
                d.date.format("%Y-%m-%d").to_string(),
                format_csv_float(d.minutes),
            ]
        }),
    )
}

pub fn write_top_artists_csv(path: &Path, artists: &[ArtistAggregate]) -> Result<usize> {
    write_rows(
        path,
        &TOP_ARTISTS_HEADER,
        artists.iter().map(|a| {
            vec![
                a.artist.clone(),
                format_csv_float(a.minutes),
                a.play_count.to_string(),
            ]
        }),
    )
}

pub fn write_top_tracks_csv(path: &Path, tracks: &[TrackAggregate]) -> Result<usize> {
    write_rows(
        path,
        &TOP_TRACKS_HEADER,
        tracks.iter().map(|t| {
            vec![
                t.track.clone(),
                t.artist.clone(),
                format_csv_float(t.minutes),
                t.play_count.to_string(),
            ]
        }),
    )
}

/// Write a header plus `rows` to `path`, returning the number of data rows.
fn write_rows<I>(path: &Path, header: &[&str], rows: I) -> Result<usize>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let csv_err = |source: csv::Error| HistoryError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(header).map_err(csv_err)?;

    let mut count = 0usize;
    for row in rows {
        writer.write_record(&row).map_err(csv_err)?;
        count += 1;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", count, path.display());
    Ok(count)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
