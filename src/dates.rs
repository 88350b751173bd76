//! Tolerant timestamp parsing.
//!
//! Sources disagree on date formats, so parsing is an ordered list of pure
//! attempts. The first one that returns `Some` wins; when all of them fail the
//! caller substitutes the run's processing time. Nothing here returns an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

type Attempt = fn(&str) -> Option<DateTime<Utc>>;

/// Tried in order.
const ATTEMPTS: &[Attempt] = &[
    parse_rfc2822,
    parse_rfc3339,
    parse_iso_local,
    parse_space_separated,
    parse_compact_date,
];

/// Publish time as handed over by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimestamp {
    /// Free-form text in any of the supported formats.
    Text(String),
    /// Seconds since the unix epoch.
    Unix(i64),
}

/// Try every known format, `None` when nothing matches.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    ATTEMPTS.iter().find_map(|attempt| attempt(s))
}

/// Resolve to a point in time, falling back to `now`.
pub fn resolve(raw: Option<&RawTimestamp>, now: DateTime<Utc>) -> DateTime<Utc> {
    let parsed = match raw {
        Some(RawTimestamp::Text(s)) => parse_date(s),
        Some(RawTimestamp::Unix(secs)) => from_unix(*secs),
        None => None,
    };
    parsed.unwrap_or(now)
}

/// Unix seconds; 0 and negatives are treated as "unknown".
pub fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}

/// Hours between `published` and `now`. Negative for future timestamps.
pub fn age_hours(published: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - published).num_milliseconds() as f64 / 3_600_000.0
}

// `Tue, 10 Jun 2025 14:00:00 +0000`
fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    let dt = OffsetDateTime::parse(s, &Rfc2822).ok()?;
    Utc.timestamp_opt(dt.unix_timestamp(), dt.nanosecond()).single()
}

// `2025-06-10T14:00:00Z`, `2025-06-10T14:00:00.123+02:00`
fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            // `+0200` without the colon
            DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z")
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

// `2025-06-10T14:00:00`, assumed UTC
fn parse_iso_local(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}

// `2025-06-10 14:00:00`, assumed UTC
fn parse_space_separated(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|n| n.and_utc())
}

// `20250610`
fn parse_compact_date(s: &str) -> Option<DateTime<Utc>> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}
