//! Aggregate views over the canonical relation.
//!
//! Daily totals, artist ranking and track ranking are independent reductions.
//! Rankings group by key (sorted), then stable-sort by descending play time so
//! ties keep key order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use history_core::models::{
    ms_to_minutes, ArtistAggregate, CanonicalRecord, DailyAggregate, ListeningSummary,
    TrackAggregate,
};

/// Rows averaged for [`ListeningSummary::recent_daily_average`].
pub const RECENT_WINDOW: usize = 7;

// ── PlayTotals ────────────────────────────────────────────────────────────────

/// Milliseconds and play count accumulated for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PlayTotals {
    ms_played: u64,
    plays: u64,
}

impl PlayTotals {
    fn add_record(&mut self, record: &CanonicalRecord) {
        self.ms_played = self.ms_played.saturating_add(record.ms_played);
        self.plays += 1;
    }
}

// ── ListeningAggregator ───────────────────────────────────────────────────────

/// Stateless helper that reduces the canonical relation into aggregate views.
pub struct ListeningAggregator;

impl ListeningAggregator {
    /// Listening minutes per UTC calendar date, ascending by date.
    pub fn daily(records: &[CanonicalRecord]) -> Vec<DailyAggregate> {
        Self::group_by(records, |r| r.date())
            .into_iter()
            .map(|(date, totals)| DailyAggregate {
                date,
                ms_played: totals.ms_played,
                minutes: ms_to_minutes(totals.ms_played),
            })
            .collect()
    }

    /// Artists ranked by descending listening time.
    pub fn top_artists(records: &[CanonicalRecord]) -> Vec<ArtistAggregate> {
        let mut rows: Vec<ArtistAggregate> = Self::group_by(records, |r| r.artist.clone())
            .into_iter()
            .map(|(artist, totals)| ArtistAggregate {
                artist,
                ms_played: totals.ms_played,
                minutes: ms_to_minutes(totals.ms_played),
                play_count: totals.plays,
            })
            .collect();

        // `sort_by` is stable: equal totals keep artist order.
        rows.sort_by(|a, b| b.ms_played.cmp(&a.ms_played));
        rows
    }

    /// (track, artist) pairs ranked by descending listening time.
    pub fn top_tracks(records: &[CanonicalRecord]) -> Vec<TrackAggregate> {
        let mut rows: Vec<TrackAggregate> =
            Self::group_by(records, |r| (r.track.clone(), r.artist.clone()))
                .into_iter()
                .map(|((track, artist), totals)| TrackAggregate {
                    track,
                    artist,
                    ms_played: totals.ms_played,
                    minutes: ms_to_minutes(totals.ms_played),
                    play_count: totals.plays,
                })
                .collect();

        rows.sort_by(|a, b| b.ms_played.cmp(&a.ms_played));
        rows
    }

    /// Headline figures for a relation and its daily series.
    ///
    /// A day is active when its minutes reach `active_minutes`.
    pub fn summarize(
        records: &[CanonicalRecord],
        daily: &[DailyAggregate],
        active_minutes: f64,
    ) -> ListeningSummary {
        let total_ms = records
            .iter()
            .map(|r| r.ms_played)
            .fold(0, u64::saturating_add);
        let unique_artists: BTreeSet<&str> = records.iter().map(|r| r.artist.as_str()).collect();

        ListeningSummary {
            total_minutes: ms_to_minutes(total_ms),
            total_plays: records.len(),
            active_days: daily.iter().filter(|d| d.minutes >= active_minutes).count(),
            unique_artists: unique_artists.len(),
            first_date: daily.first().map(|d| d.date),
            last_date: daily.last().map(|d| d.date),
            recent_daily_average: Self::rolling_average(daily, RECENT_WINDOW)
                .last()
                .map(|(_, avg)| *avg),
        }
    }

    /// Trailing mean of daily minutes over up to `window` rows.
    ///
    /// The first rows average over however many rows are available, so the
    /// output has one entry per input row. A zero window is treated as one.
    pub fn rolling_average(daily: &[DailyAggregate], window: usize) -> Vec<(NaiveDate, f64)> {
        let window = window.max(1);
        daily
            .iter()
            .enumerate()
            .map(|(i, day)| {
                let start = (i + 1).saturating_sub(window);
                let slice = &daily[start..=i];
                let sum: f64 = slice.iter().map(|d| d.minutes).sum();
                (day.date, sum / slice.len() as f64)
            })
            .collect()
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Generic grouping driver; `BTreeMap` keeps groups sorted by key.
    fn group_by<K: Ord>(
        records: &[CanonicalRecord],
        key_fn: impl Fn(&CanonicalRecord) -> K,
    ) -> BTreeMap<K, PlayTotals> {
        let mut map: BTreeMap<K, PlayTotals> = BTreeMap::new();
        for record in records {
            map.entry(key_fn(record)).or_default().add_record(record);
        }
        map
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use history_core::models::SchemaKind;

    fn make_record(ts: &str, track: &str, artist: &str, ms: u64) -> CanonicalRecord {
        CanonicalRecord {
            played_at: DateTime::parse_from_rfc3339(ts)
                .unwrap()
                .with_timezone(&Utc),
            track: track.to_string(),
            artist: artist.to_string(),
            ms_played: ms,
            spotify_uri: None,
            source: SchemaKind::Endsong,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // ── daily ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_daily_groups_and_sorts_by_date() {
        let records = vec![
            make_record("2024-01-20T08:00:00Z", "X", "A", 60_000),
            make_record("2024-01-10T08:00:00Z", "X", "A", 30_000),
            make_record("2024-01-20T23:59:59Z", "Y", "B", 60_000),
        ];
        let daily = ListeningAggregator::daily(&records);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, date("2024-01-10"));
        assert_eq!(daily[0].minutes, 0.5);
        assert_eq!(daily[1].date, date("2024-01-20"));
        assert_eq!(daily[1].minutes, 2.0);
    }

    #[test]
    fn test_daily_empty() {
        assert!(ListeningAggregator::daily(&[]).is_empty());
    }

    // ── top_artists ───────────────────────────────────────────────────────────

    #[test]
    fn test_top_artists_ranked_by_minutes() {
        let records = vec![
            make_record("2023-01-01T10:00:00Z", "Y", "B", 30_000),
            make_record("2023-01-01T10:05:00Z", "X", "A", 120_000),
            make_record("2023-01-01T10:10:00Z", "X", "A", 90_000),
        ];
        let artists = ListeningAggregator::top_artists(&records);

        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].artist, "A");
        assert_eq!(artists[0].minutes, 3.5);
        assert_eq!(artists[0].play_count, 2);
        assert_eq!(artists[1].artist, "B");
        assert_eq!(artists[1].minutes, 0.5);
        assert_eq!(artists[1].play_count, 1);
    }

    #[test]
    fn test_top_artists_ties_keep_key_order() {
        let records = vec![
            make_record("2023-01-01T10:00:00Z", "t", "Zed", 1_000),
            make_record("2023-01-01T10:00:00Z", "t", "Abe", 1_000),
            make_record("2023-01-01T10:00:00Z", "t", "Mid", 1_000),
        ];
        let names: Vec<String> = ListeningAggregator::top_artists(&records)
            .into_iter()
            .map(|a| a.artist)
            .collect();
        assert_eq!(names, vec!["Abe", "Mid", "Zed"]);
    }

    #[test]
    fn test_top_artists_empty_artist_is_a_group() {
        let records = vec![
            make_record("2023-01-01T10:00:00Z", "t", "", 1_000),
            make_record("2023-01-01T10:00:00Z", "t", "", 2_000),
        ];
        let artists = ListeningAggregator::top_artists(&records);
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].artist, "");
        assert_eq!(artists[0].play_count, 2);
    }

    #[test]
    fn test_top_artists_conserves_minutes() {
        let records: Vec<CanonicalRecord> = (0..50u64)
            .map(|i| {
                make_record(
                    "2023-01-01T10:00:00Z",
                    &format!("t{}", i % 7),
                    &format!("a{}", i % 5),
                    i * 1_337,
                )
            })
            .collect();
        let total_ms: u64 = records.iter().map(|r| r.ms_played).sum();
        let artist_minutes: f64 = ListeningAggregator::top_artists(&records)
            .iter()
            .map(|a| a.minutes)
            .sum();
        assert!((artist_minutes - total_ms as f64 / 60_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_huge_durations_saturate() {
        let records = vec![
            make_record("2023-01-01T10:00:00Z", "X", "A", u64::MAX),
            make_record("2023-01-01T11:00:00Z", "X", "A", u64::MAX),
        ];

        let artists = ListeningAggregator::top_artists(&records);
        assert_eq!(artists[0].ms_played, u64::MAX);
        assert_eq!(artists[0].play_count, 2);
        assert_eq!(ListeningAggregator::top_tracks(&records)[0].ms_played, u64::MAX);
        assert_eq!(ListeningAggregator::daily(&records)[0].ms_played, u64::MAX);

        let daily = ListeningAggregator::daily(&records);
        let summary = ListeningAggregator::summarize(&records, &daily, 10.0);
        assert_eq!(summary.total_minutes, u64::MAX as f64 / 60_000.0);
    }

    // ── top_tracks ────────────────────────────────────────────────────────────

    #[test]
    fn test_top_tracks_groups_by_track_and_artist() {
        let records = vec![
            make_record("2023-01-01T10:00:00Z", "Song", "A", 60_000),
            make_record("2023-01-01T10:00:00Z", "Song", "B", 30_000),
            make_record("2023-01-01T10:00:00Z", "Song", "A", 60_000),
        ];
        let tracks = ListeningAggregator::top_tracks(&records);

        assert_eq!(tracks.len(), 2);
        assert_eq!((tracks[0].track.as_str(), tracks[0].artist.as_str()), ("Song", "A"));
        assert_eq!(tracks[0].minutes, 2.0);
        assert_eq!(tracks[0].play_count, 2);
        assert_eq!(tracks[1].artist, "B");
    }

    #[test]
    fn test_top_tracks_case_variants_are_distinct() {
        let records = vec![
            make_record("2023-01-01T10:00:00Z", "Song", "A", 1_000),
            make_record("2023-01-01T10:00:00Z", "song", "A", 1_000),
            make_record("2023-01-01T10:00:00Z", "Song ", "A", 1_000),
        ];
        assert_eq!(ListeningAggregator::top_tracks(&records).len(), 3);
    }

    // ── summarize ─────────────────────────────────────────────────────────────

    #[test]
    fn test_summarize() {
        let records = vec![
            make_record("2023-01-01T10:00:00Z", "X", "A", 600_000),
            make_record("2023-01-02T10:00:00Z", "Y", "B", 60_000),
            make_record("2023-01-03T10:00:00Z", "X", "A", 1_200_000),
        ];
        let daily = ListeningAggregator::daily(&records);
        let summary = ListeningAggregator::summarize(&records, &daily, 10.0);

        assert_eq!(summary.total_minutes, 31.0);
        assert_eq!(summary.total_plays, 3);
        assert_eq!(summary.active_days, 2);
        assert_eq!(summary.unique_artists, 2);
        assert_eq!(summary.first_date, Some(date("2023-01-01")));
        assert_eq!(summary.last_date, Some(date("2023-01-03")));
        let avg = summary.recent_daily_average.unwrap();
        assert!((avg - 31.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = ListeningAggregator::summarize(&[], &[], 10.0);
        assert_eq!(summary, ListeningSummary::default());
    }

    // ── rolling_average ───────────────────────────────────────────────────────

    #[test]
    fn test_rolling_average_trailing_window() {
        let daily: Vec<DailyAggregate> = [10.0, 20.0, 30.0, 40.0]
            .iter()
            .enumerate()
            .map(|(i, m)| DailyAggregate {
                date: date("2023-01-01") + chrono::Days::new(i as u64),
                ms_played: (*m * 60_000.0) as u64,
                minutes: *m,
            })
            .collect();

        let avg = ListeningAggregator::rolling_average(&daily, 2);
        let values: Vec<f64> = avg.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10.0, 15.0, 25.0, 35.0]);
        assert_eq!(avg[3].0, date("2023-01-04"));

        let zero_window = ListeningAggregator::rolling_average(&daily, 0);
        assert_eq!(zero_window[2].1, 30.0);
    }
}
