//! Canonical relation building.
//!
//! Cleans normalized records into [`CanonicalRecord`]s: records without a
//! usable timestamp are dropped, durations are coerced and never cause a drop.

use history_core::data_processors::{DurationCoercer, TimestampProcessor};
use history_core::models::{ms_to_minutes, CanonicalRecord, NormalizedRecord};
use tracing::debug;

/// The cleaned relation plus how many inputs were discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRelation {
    pub records: Vec<CanonicalRecord>,
    /// Inputs dropped for a missing or unparseable timestamp.
    pub dropped: usize,
}

impl CanonicalRelation {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Sum of `ms_played` over every record.
    pub fn total_ms_played(&self) -> u64 {
        self.records
            .iter()
            .map(|r| r.ms_played)
            .fold(0, u64::saturating_add)
    }

    pub fn total_minutes(&self) -> f64 {
        ms_to_minutes(self.total_ms_played())
    }
}

/// Clean `records` into the canonical relation, keeping their order.
pub fn build_relation(records: Vec<NormalizedRecord>) -> CanonicalRelation {
    let total = records.len();
    let cleaned: Vec<CanonicalRecord> = records.into_iter().filter_map(clean_record).collect();
    let dropped = total - cleaned.len();

    if dropped > 0 {
        debug!("Dropped {} of {} records without a usable timestamp", dropped, total);
    }

    CanonicalRelation {
        records: cleaned,
        dropped,
    }
}

/// Clean one record; `None` when its timestamp is absent or unparseable.
pub fn clean_record(record: NormalizedRecord) -> Option<CanonicalRecord> {
    let played_at = record.played_at.as_ref().and_then(TimestampProcessor::parse)?;

    Some(CanonicalRecord {
        played_at,
        track: record.track,
        artist: record.artist,
        ms_played: DurationCoercer::coerce(&record.ms_played),
        spotify_uri: record.spotify_uri,
        source: record.source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
