use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds per minute, used for every minutes conversion.
pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Which raw export schema a file (and every record in it) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Extended history export (`endsong_*.json`, `Streaming_History_Audio_*.json`).
    Endsong,
    /// Account-data export (`StreamingHistory*.json`) with `endTime` stamps.
    StreamingHistory,
}

impl SchemaKind {
    /// The label written to the `source` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Endsong => "endsong",
            SchemaKind::StreamingHistory => "streaming_history",
        }
    }

    /// Parse a `source` column value back into a kind.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "endsong" => Some(SchemaKind::Endsong),
            "streaming_history" => Some(SchemaKind::StreamingHistory),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record mapped out of a raw export object but not yet cleaned.
///
/// Timestamp and duration keep their raw JSON shape; the relation builder
/// coerces them.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Raw timestamp value, `None` when the source field was absent.
    pub played_at: Option<serde_json::Value>,
    pub track: String,
    pub artist: String,
    /// Raw duration value, `0` when the source field was absent.
    pub ms_played: serde_json::Value,
    pub spotify_uri: Option<String>,
    pub source: SchemaKind,
}

/// One row of the canonical relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Moment playback occurred (UTC).
    pub played_at: DateTime<Utc>,
    /// Track title, empty when unknown.
    pub track: String,
    /// Artist name, empty when unknown.
    pub artist: String,
    /// Milliseconds of playback.
    pub ms_played: u64,
    /// Stable track identifier, if the export carried one.
    pub spotify_uri: Option<String>,
    /// Raw schema that produced this record.
    pub source: SchemaKind,
}

impl CanonicalRecord {
    /// Calendar date of `played_at` in UTC, used as the daily group key.
    pub fn date(&self) -> NaiveDate {
        self.played_at.date_naive()
    }
}

/// Listening time for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub ms_played: u64,
    pub minutes: f64,
}

/// Listening time and play count for one artist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistAggregate {
    pub artist: String,
    pub ms_played: u64,
    pub minutes: f64,
    pub play_count: u64,
}

/// Listening time and play count for one (track, artist) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackAggregate {
    pub track: String,
    pub artist: String,
    pub ms_played: u64,
    pub minutes: f64,
    pub play_count: u64,
}

/// Headline figures for a cleaned relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListeningSummary {
    pub total_minutes: f64,
    pub total_plays: usize,
    /// Days whose minutes reach the active-day threshold.
    pub active_days: usize,
    pub unique_artists: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Mean daily minutes over the last seven rows of the daily series.
    pub recent_daily_average: Option<f64>,
}

/// Convert a millisecond total into minutes.
pub fn ms_to_minutes(ms: u64) -> f64 {
    ms as f64 / MS_PER_MINUTE
}
