use chrono::{DateTime, SecondsFormat, Utc};

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use history_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    let factor = 10_f64.powi(decimals as i32);
    let rounded = (abs_value * factor).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        // "0.50" -> ".50"
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a listening duration in minutes as `"45m"`, `"3h"` or `"3h 45m"`.
///
/// # Examples
///
/// ```
/// use history_core::formatting::format_listening_time;
///
/// assert_eq!(format_listening_time(45.0),  "45m");
/// assert_eq!(format_listening_time(180.0), "3h");
/// assert_eq!(format_listening_time(225.0), "3h 45m");
/// ```
pub fn format_listening_time(minutes: f64) -> String {
    let total_mins = minutes.round() as i64;
    if total_mins < 60 {
        format!("{}m", total_mins)
    } else {
        let hours = total_mins / 60;
        let mins = total_mins % 60;
        if mins == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}

/// Format a float for a CSV cell: shortest round-trip digits, always with a
/// fractional part so `4` is written as `4.0`.
pub fn format_csv_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') && !text.contains('e') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Format a UTC timestamp for the canonical artifact, e.g. `2023-01-01T10:00:00Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
