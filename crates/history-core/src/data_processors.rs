use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses timestamps from the variety of encodings found in export files.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Attempt to parse a [`serde_json::Value`] into a UTC [`DateTime`].
    ///
    /// Handles:
    /// * `null`       → `None`
    /// * JSON string  → ISO 8601 / RFC 3339 (including `Z`-suffix) or common
    ///   date-time patterns, naive values read as UTC.
    /// * JSON number  → Unix timestamp (integer or float seconds).
    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.trim()),
            Value::Number(n) => {
                if let Some(secs) = n.as_i64() {
                    DateTime::from_timestamp(secs, 0)
                } else if let Some(f) = n.as_f64() {
                    if !f.is_finite() {
                        return None;
                    }
                    let floor = f.floor();
                    let nanos = ((f - floor) * 1_000_000_000.0).round() as u32;
                    DateTime::from_timestamp(floor as i64, nanos.min(999_999_999))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Parse a string timestamp; see [`TimestampProcessor::parse`].
    pub fn parse_str(s: &str) -> Option<DateTime<Utc>> {
        if s.is_empty() {
            return None;
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }

        // Space-separated date/time with an explicit offset.
        if let Ok(dt) = DateTime::parse_from_str(&normalised, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(dt.with_timezone(&Utc));
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%d",
        ];

        for fmt in FORMATS {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
                let naive = date.and_hms_opt(0, 0, 0)?;
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        debug!("TimestampProcessor: could not parse timestamp string \"{}\"", s);
        None
    }
}

// ── Legacy end-time rewrite ───────────────────────────────────────────────────

fn legacy_end_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}$").expect("regex is valid")
    })
}

/// Rewrite a legacy `"YYYY-MM-DD HH:MM"` end time into `"YYYY-MM-DDTHH:MM:00Z"`.
///
/// Any other value, including strings of a different shape, is returned
/// unchanged.
pub fn rewrite_legacy_end_time(value: Value) -> Value {
    match value {
        Value::String(s) if s.len() == 16 && legacy_end_time_pattern().is_match(&s) => {
            Value::String(format!("{}:00Z", s.replacen(' ', "T", 1)))
        }
        other => other,
    }
}

// ── FieldResolver ─────────────────────────────────────────────────────────────

/// Ordered fallback lookups over a raw JSON object.
///
/// A key is "present" when it exists and is not JSON `null`; empty strings
/// count as present.
pub struct FieldResolver;

impl FieldResolver {
    /// First present value among `keys`, in order.
    pub fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| obj.get(*key))
            .find(|value| !value.is_null())
    }

    /// First present value rendered as text, or an empty string.
    pub fn first_present_text(obj: &Map<String, Value>, keys: &[&str]) -> String {
        Self::first_present(obj, keys)
            .map(value_to_text)
            .unwrap_or_default()
    }

    /// First present value rendered as an identifier; empty text counts as
    /// no identifier.
    pub fn first_present_identifier(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
        Self::first_present(obj, keys)
            .map(value_to_text)
            .filter(|s| !s.is_empty())
    }
}

/// Render a scalar JSON value as plain text; strings are taken without quotes.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── DurationCoercer ───────────────────────────────────────────────────────────

/// Coerces raw duration values into non-negative milliseconds.
pub struct DurationCoercer;

impl DurationCoercer {
    /// Largest duration a record can carry; larger values clamp to it.
    pub const MAX_MS: u64 = i64::MAX as u64;

    /// Integers pass through, floats truncate, numeric strings are parsed,
    /// booleans map to 1/0. Negative, non-finite or non-numeric values give 0.
    /// Results never exceed [`DurationCoercer::MAX_MS`].
    pub fn coerce(value: &Value) -> u64 {
        match value {
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    u.min(Self::MAX_MS)
                } else if n.is_i64() {
                    0
                } else {
                    n.as_f64().map(Self::from_float).unwrap_or(0)
                }
            }
            Value::String(s) => Self::coerce_str(s.trim()),
            Value::Bool(b) => u64::from(*b),
            _ => 0,
        }
    }

    /// Coerce a textual duration, as found in a CSV cell.
    pub fn coerce_str(s: &str) -> u64 {
        if let Ok(u) = s.parse::<u64>() {
            return u.min(Self::MAX_MS);
        }
        s.parse::<f64>().map(Self::from_float).unwrap_or(0)
    }

    fn from_float(f: f64) -> u64 {
        if f.is_finite() && f > 0.0 {
            (f.trunc() as u64).min(Self::MAX_MS)
        } else {
            0
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
