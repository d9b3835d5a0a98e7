//! Today command: usage since local midnight.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use fg_core::today_window;

use super::SnapshotEngine;
use super::usage::{Profile, UsageReport, write_report};
use super::util::local_timezone_name;

/// Runs the today command against the device clock.
pub fn run<W: Write>(writer: &mut W, engine: &SnapshotEngine<'_>, json: bool) -> Result<()> {
    run_at(writer, engine, &Local::now(), json)
}

/// Runs the today command for the day containing `now`.
pub fn run_at<W: Write>(
    writer: &mut W,
    engine: &SnapshotEngine<'_>,
    now: &DateTime<Local>,
    json: bool,
) -> Result<()> {
    let window = today_window(now, engine.policy().today.max_range_ms)
        .context("cannot determine today's window")?;

    let usage = engine
        .try_compute_today_usage_at(now)
        .context("failed to compute today's usage")?;

    let report = UsageReport {
        profile: Profile::Today,
        window,
        utc_offset: *now.offset(),
        timezone: local_timezone_name(),
        entries: engine.usage_entries(&usage),
    };
    write_report(writer, &report, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use fg_core::UsagePolicy;
    use tempfile::TempDir;

    use crate::commands::snapshot_engine;
    use crate::snapshot::{AGGREGATES_FILE, PACKAGES_FILE, SnapshotSource};

    #[test]
    fn test_today_reads_aggregates_only() {
        let temp = TempDir::new().unwrap();
        let now = Local.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).single().unwrap()
            + Duration::milliseconds(250);
        let day_start = now.timestamp_millis() - 12 * 3_600_000;
        let day_end = day_start + 24 * 3_600_000;

        std::fs::write(
            temp.path().join(AGGREGATES_FILE),
            format!(
                "{{\"app\":\"com.x\",\"duration_ms\":65432,\"bucket_start_ms\":{day_start},\"bucket_end_ms\":{day_end}}}\n\
                 {{\"app\":\"com.x\",\"duration_ms\":20000,\"bucket_start_ms\":{day_start},\"bucket_end_ms\":{day_end}}}\n\
                 {{\"app\":\"com.y\",\"duration_ms\":1500,\"bucket_start_ms\":{day_start},\"bucket_end_ms\":{day_end}}}\n"
            ),
        )
        .unwrap();
        std::fs::write(
            temp.path().join(PACKAGES_FILE),
            r#"[{"app": "com.x", "launcher": true}, {"app": "com.y", "launcher": true}]"#,
        )
        .unwrap();
        let source = SnapshotSource::open(temp.path()).unwrap();
        let engine = snapshot_engine(&source, UsagePolicy::default());

        let mut output = Vec::new();
        run_at(&mut output, &engine, &now, true).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(json["profile"], "today");
        assert_eq!(json["apps"].as_array().unwrap().len(), 1);
        assert_eq!(json["apps"][0]["app"], "com.x");
        assert_eq!(json["apps"][0]["usage_ms"], 65_000);
        assert_eq!(json["window"]["end_ms"].as_i64().unwrap() % 1000, 0);
    }
}
