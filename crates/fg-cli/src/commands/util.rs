//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use regex::Regex;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(second|minute|hour|day|week)s?\s+ago$")
        .expect("relative time pattern is valid")
});

/// Conservative bounds for relative time parsing (~1000 years in seconds).
const MAX_RELATIVE_SECONDS: i64 = 1000 * 365 * 24 * 60 * 60;

/// Parse a datetime string as ISO 8601, relative time or `now`.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "90 seconds ago", "2 hours ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    parse_datetime_at(s, Utc::now())
}

/// Like [`parse_datetime`], resolving relative times against `now`.
pub fn parse_datetime_at(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let seconds_per_unit = match &caps[2] {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        "day" => 60 * 60 * 24,
        "week" => 60 * 60 * 24 * 7,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > MAX_RELATIVE_SECONDS / seconds_per_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::seconds(n * seconds_per_unit))
}

/// Resolves `--start` / `--end` arguments to epoch milliseconds.
/// A missing end means now.
pub fn resolve_range(start: &str, end: Option<&str>) -> anyhow::Result<(i64, i64)> {
    let now = Utc::now();
    let start = parse_datetime_at(start, now).context("invalid --start")?;
    let end = match end {
        Some(end) => parse_datetime_at(end, now).context("invalid --end")?,
        None => now,
    };
    Ok((start.timestamp_millis(), end.timestamp_millis()))
}

/// Formats milliseconds as a duration string.
/// Returns "Xh Ym" from one hour, "Xm Ys" from one minute, "Ys" below.
/// Negative durations are shown as 0s.
pub fn format_duration(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else if minutes >= 1 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Formats an epoch-millisecond timestamp at the given offset.
pub fn format_timestamp(ms: i64, offset: &FixedOffset, fmt: &str) -> String {
    DateTime::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |dt| dt.with_timezone(offset).format(fmt).to_string(),
    )
}

/// IANA name of the local time zone, or "UTC" if it cannot be determined.
pub fn local_timezone_name() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_iso8601() {
        let dt = parse_datetime_at("2025-03-10T08:30:00+02:00", now()).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 10, 6, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(
            parse_datetime_at("2 hours ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime_at("1 day ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime_at("90 seconds ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 10, 11, 58, 30).unwrap()
        );
    }

    #[test]
    fn test_parse_now() {
        assert_eq!(parse_datetime_at(" now ", now()).unwrap(), now());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_datetime_at("yesterday-ish", now()).is_err());
        assert!(parse_datetime_at("2 fortnights ago", now()).is_err());
    }

    #[test]
    fn test_parse_rejects_huge_relative_value() {
        assert!(parse_datetime_at("99999999 weeks ago", now()).is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59_999), "59s");
        assert_eq!(format_duration(125_000), "2m 5s");
        assert_eq!(format_duration(3_600_000), "1h 0m");
        assert_eq!(format_duration(5_430_000), "1h 30m");
        assert_eq!(format_duration(-5), "0s");
    }

    #[test]
    fn test_format_timestamp() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let ms = now().timestamp_millis();
        assert_eq!(format_timestamp(ms, &offset, "%Y-%m-%d %H:%M"), "2025-03-10 13:00");
    }
}
