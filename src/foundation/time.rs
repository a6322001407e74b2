use chrono::{DateTime, NaiveDateTime, TimeDelta};

/// Wall-clock instant on the activity-local clock.
///
/// Activity samples are shifted by the activity's UTC offset before they reach the pipeline, and
/// video capture stamps are read as wall-clock values, so both sides live on the same naive clock.
pub type Instant = NaiveDateTime;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y:%m:%d %H:%M:%S",
];

/// Parse a timestamp as written by activity providers and camera metadata.
///
/// Zoned values (RFC 3339, including a trailing `Z`) are normalized to their UTC reading. Naive
/// values are taken as-is.
pub fn parse_instant(raw: &str) -> Option<Instant> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Some(zoned.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Largest shift accepted by [`offset_secs`], about 100 000 years.
pub const MAX_OFFSET_SECS: f64 = 3.2e12;

/// `t` shifted by a (possibly fractional, possibly negative) number of seconds.
///
/// `None` when `secs` is not finite or the result leaves the representable calendar.
pub fn offset_secs(t: Instant, secs: f64) -> Option<Instant> {
    if !secs.is_finite() || secs.abs() > MAX_OFFSET_SECS {
        return None;
    }
    t.checked_add_signed(TimeDelta::microseconds((secs * 1_000_000.0).round() as i64))
}

/// Signed seconds elapsed from `from` to `to`.
pub fn secs_between(from: Instant, to: Instant) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/time.rs"]
mod tests;
