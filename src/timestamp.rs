//! Timestamp normalization.
//!
//! Session logs carry timestamps in whatever shape the host process wrote
//! them in: ISO-8601 strings, epoch seconds, epoch milliseconds, or other
//! parseable date strings. [`normalize`] maps all of these onto a single
//! ISO-8601 UTC string, and never fails — an unrecognized value falls back
//! to the current time, matching the lenient posture the rest of the
//! classifier takes toward malformed input.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Normalize an arbitrary JSON timestamp value to an ISO-8601 UTC string.
///
/// Accepts, in order: an already-ISO-8601 string, a numeric epoch (seconds
/// if below the millisecond threshold, else milliseconds), or any other
/// string chrono can parse via RFC 3339 or a handful of common formats.
/// Never fails: unparseable input falls back to the current time.
pub fn normalize(value: &Value) -> String {
    match value {
        Value::String(s) => normalize_str(s),
        Value::Number(n) => n
            .as_f64()
            .and_then(from_epoch)
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        _ => Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    }
}

/// Idempotent: normalizing an already-normalized string returns it unchanged
/// up to formatting (same instant, same `SecondsFormat::Millis` precision).
fn normalize_str(s: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    }
    if let Ok(epoch) = s.parse::<f64>() {
        if let Some(dt) = from_epoch(epoch) {
            return dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%a %b %d %Y %H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Utc
                .from_utc_datetime(&naive)
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        }
    }
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch threshold above which a number is treated as milliseconds rather
/// than seconds: 1e12 is year 33658 in seconds, but 2001-09-09 in
/// milliseconds, so anything above it is unambiguously milliseconds for any
/// realistic session timestamp.
const EPOCH_MS_THRESHOLD: f64 = 1e12;

fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    let millis = if n.abs() >= EPOCH_MS_THRESHOLD {
        n
    } else {
        n * 1000.0
    };
    Utc.timestamp_millis_opt(millis as i64).single()
}
