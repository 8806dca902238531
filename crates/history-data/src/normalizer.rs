//! Schema classification and record normalization.
//!
//! A file's schema is decided once from its file name; every record in the
//! file is then mapped with the field chains of that schema.

use std::path::Path;

use history_core::data_processors::{rewrite_legacy_end_time, FieldResolver};
use history_core::models::{NormalizedRecord, SchemaKind};
use serde_json::{Map, Value};

/// File-name markers that identify the extended (`endsong`) export family.
pub const ENDSONG_MARKERS: &[&str] = &["endsong", "audio"];

// ── Field chains ──────────────────────────────────────────────────────────────

const ENDSONG_TIMESTAMP: &str = "ts";
const ENDSONG_DURATION: &[&str] = &["ms_played", "msPlayed"];
const ENDSONG_TRACK: &[&str] = &["master_metadata_track_name", "trackName", "track", "title"];
const ENDSONG_ARTIST: &[&str] = &[
    "master_metadata_album_artist_name",
    "artistName",
    "artist",
    "artist_name",
];
const ENDSONG_URI: &[&str] = &["spotify_track_uri", "spotifyTrackUri"];

const HISTORY_TIMESTAMP: &str = "endTime";
const HISTORY_DURATION: &[&str] = &["msPlayed", "ms_played"];
const HISTORY_TRACK: &[&str] = &["trackName", "master_metadata_track_name"];
const HISTORY_ARTIST: &[&str] = &["artistName", "master_metadata_album_artist_name"];
const HISTORY_URI: &[&str] = &["spotifyTrackUri", "spotify_track_uri"];

// ── Classification ────────────────────────────────────────────────────────────

/// Classify a file by its name (case-insensitive).
///
/// Names carrying an endsong-family marker are [`SchemaKind::Endsong`];
/// everything else is [`SchemaKind::StreamingHistory`].
pub fn classify(path: &Path) -> SchemaKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ENDSONG_MARKERS.iter().any(|marker| name.contains(marker)) {
        SchemaKind::Endsong
    } else {
        SchemaKind::StreamingHistory
    }
}

// ── Normalization ─────────────────────────────────────────────────────────────

/// Map one raw export object into a [`NormalizedRecord`] using `kind`'s fields.
pub fn normalize_record(kind: SchemaKind, obj: &Map<String, Value>) -> NormalizedRecord {
    match kind {
        SchemaKind::Endsong => normalize_endsong(obj),
        SchemaKind::StreamingHistory => normalize_streaming_history(obj),
    }
}

/// Map every object of a file, all with the same schema.
pub fn normalize_all(kind: SchemaKind, objects: &[Map<String, Value>]) -> Vec<NormalizedRecord> {
    objects
        .iter()
        .map(|obj| normalize_record(kind, obj))
        .collect()
}

fn normalize_endsong(obj: &Map<String, Value>) -> NormalizedRecord {
    NormalizedRecord {
        played_at: present(obj, ENDSONG_TIMESTAMP),
        track: FieldResolver::first_present_text(obj, ENDSONG_TRACK),
        artist: FieldResolver::first_present_text(obj, ENDSONG_ARTIST),
        ms_played: duration(obj, ENDSONG_DURATION),
        spotify_uri: FieldResolver::first_present_identifier(obj, ENDSONG_URI),
        source: SchemaKind::Endsong,
    }
}

fn normalize_streaming_history(obj: &Map<String, Value>) -> NormalizedRecord {
    NormalizedRecord {
        played_at: present(obj, HISTORY_TIMESTAMP).map(rewrite_legacy_end_time),
        track: FieldResolver::first_present_text(obj, HISTORY_TRACK),
        artist: FieldResolver::first_present_text(obj, HISTORY_ARTIST),
        ms_played: duration(obj, HISTORY_DURATION),
        spotify_uri: FieldResolver::first_present_identifier(obj, HISTORY_URI),
        source: SchemaKind::StreamingHistory,
    }
}

fn present(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    FieldResolver::first_present(obj, &[key]).cloned()
}

fn duration(obj: &Map<String, Value>, keys: &[&str]) -> Value {
    FieldResolver::first_present(obj, keys)
        .cloned()
        .unwrap_or_else(|| Value::from(0))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    // ── classify ──────────────────────────────────────────────────────────────

    #[test]
    fn test_classify_endsong_family() {
        assert_eq!(classify(Path::new("raw/endsong_0.json")), SchemaKind::Endsong);
        assert_eq!(
            classify(Path::new("raw/Streaming_History_Audio_2023.json")),
            SchemaKind::Endsong
        );
        assert_eq!(classify(Path::new("raw/EndSong_3.JSON")), SchemaKind::Endsong);
    }

    #[test]
    fn test_classify_streaming_history() {
        assert_eq!(
            classify(Path::new("raw/StreamingHistory0.json")),
            SchemaKind::StreamingHistory
        );
        assert_eq!(
            classify(Path::new("raw/streaming_history_music.json")),
            SchemaKind::StreamingHistory
        );
    }

    #[test]
    fn test_classify_ignores_directory_names() {
        assert_eq!(
            classify(Path::new("endsong-export/StreamingHistory0.json")),
            SchemaKind::StreamingHistory
        );
    }

    // ── endsong ───────────────────────────────────────────────────────────────

    #[test]
    fn test_endsong_primary_fields() {
        let obj = object(json!({
            "ts": "2023-01-01T10:00:00Z",
            "ms_played": 120000,
            "master_metadata_track_name": "X",
            "master_metadata_album_artist_name": "A",
            "spotify_track_uri": "spotify:track:x",
        }));
        let record = normalize_record(SchemaKind::Endsong, &obj);

        assert_eq!(record.played_at, Some(json!("2023-01-01T10:00:00Z")));
        assert_eq!(record.track, "X");
        assert_eq!(record.artist, "A");
        assert_eq!(record.ms_played, json!(120000));
        assert_eq!(record.spotify_uri.as_deref(), Some("spotify:track:x"));
        assert_eq!(record.source, SchemaKind::Endsong);
    }

    #[test]
    fn test_endsong_track_chain_priority() {
        let obj = object(json!({"title": "fourth", "track": "third", "trackName": "second"}));
        assert_eq!(normalize_record(SchemaKind::Endsong, &obj).track, "second");

        let obj = object(json!({"title": "fourth", "track": "third"}));
        assert_eq!(normalize_record(SchemaKind::Endsong, &obj).track, "third");

        let obj = object(json!({"title": "fourth"}));
        assert_eq!(normalize_record(SchemaKind::Endsong, &obj).track, "fourth");
    }

    #[test]
    fn test_endsong_artist_chain_priority() {
        let obj = object(json!({"artist_name": "fourth", "artist": "third"}));
        assert_eq!(normalize_record(SchemaKind::Endsong, &obj).artist, "third");

        let obj = object(json!({"artist_name": "fourth"}));
        assert_eq!(normalize_record(SchemaKind::Endsong, &obj).artist, "fourth");
    }

    #[test]
    fn test_endsong_empty_primary_still_wins() {
        let obj = object(json!({"master_metadata_track_name": "", "trackName": "fallback"}));
        assert_eq!(normalize_record(SchemaKind::Endsong, &obj).track, "");
    }

    #[test]
    fn test_endsong_null_primary_falls_through() {
        let obj = object(json!({"master_metadata_track_name": null, "trackName": "fallback"}));
        assert_eq!(normalize_record(SchemaKind::Endsong, &obj).track, "fallback");
    }

    #[test]
    fn test_endsong_secondary_duration_and_uri() {
        let obj = object(json!({"msPlayed": 5000, "spotifyTrackUri": "spotify:track:y"}));
        let record = normalize_record(SchemaKind::Endsong, &obj);
        assert_eq!(record.ms_played, json!(5000));
        assert_eq!(record.spotify_uri.as_deref(), Some("spotify:track:y"));
    }

    #[test]
    fn test_endsong_timestamp_is_verbatim() {
        let obj = object(json!({"ts": "2023-01-01 10:00"}));
        assert_eq!(
            normalize_record(SchemaKind::Endsong, &obj).played_at,
            Some(json!("2023-01-01 10:00"))
        );
    }

    #[test]
    fn test_absent_fields_get_defaults() {
        let record = normalize_record(SchemaKind::Endsong, &Map::new());
        assert_eq!(record.played_at, None);
        assert_eq!(record.track, "");
        assert_eq!(record.artist, "");
        assert_eq!(record.ms_played, json!(0));
        assert_eq!(record.spotify_uri, None);
    }

    // ── streaming_history ─────────────────────────────────────────────────────

    #[test]
    fn test_streaming_history_legacy_end_time() {
        let obj = object(json!({
            "endTime": "2023-01-01 10:00",
            "artistName": "A",
            "trackName": "X",
            "msPlayed": 90000,
        }));
        let record = normalize_record(SchemaKind::StreamingHistory, &obj);

        assert_eq!(record.played_at, Some(json!("2023-01-01T10:00:00Z")));
        assert_eq!(record.track, "X");
        assert_eq!(record.artist, "A");
        assert_eq!(record.ms_played, json!(90000));
        assert_eq!(record.spotify_uri, None);
        assert_eq!(record.source, SchemaKind::StreamingHistory);
    }

    #[test]
    fn test_streaming_history_full_timestamp_passes_through() {
        let obj = object(json!({"endTime": "2023-01-01T10:00:00Z"}));
        assert_eq!(
            normalize_record(SchemaKind::StreamingHistory, &obj).played_at,
            Some(json!("2023-01-01T10:00:00Z"))
        );
    }

    #[test]
    fn test_streaming_history_fallback_names() {
        let obj = object(json!({
            "endTime": "2023-01-01 10:00",
            "master_metadata_track_name": "X",
            "master_metadata_album_artist_name": "A",
            "ms_played": 1000,
            "spotify_track_uri": "spotify:track:x",
        }));
        let record = normalize_record(SchemaKind::StreamingHistory, &obj);
        assert_eq!(record.track, "X");
        assert_eq!(record.artist, "A");
        assert_eq!(record.ms_played, json!(1000));
        assert_eq!(record.spotify_uri.as_deref(), Some("spotify:track:x"));
    }

    #[test]
    fn test_streaming_history_ignores_endsong_timestamp() {
        let obj = object(json!({"ts": "2023-01-01T10:00:00Z"}));
        assert_eq!(normalize_record(SchemaKind::StreamingHistory, &obj).played_at, None);
    }

    #[test]
    fn test_normalize_all_uses_one_kind() {
        let objects = vec![
            object(json!({"ts": "2023-01-01T10:00:00Z"})),
            object(json!({"endTime": "2023-01-01 10:00"})),
        ];
        let records = normalize_all(SchemaKind::Endsong, &objects);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.source == SchemaKind::Endsong));
        assert_eq!(records[1].played_at, None);
    }
}
