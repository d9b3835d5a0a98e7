//! Usage command and the per-app usage report shared with `today`.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local};
use serde::Serialize;

use fg_core::{UsageEntry, Window, range_window};

use super::SnapshotEngine;
use super::util::{format_duration, format_timestamp, local_timezone_name, resolve_range};

/// Which query produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Range,
    Today,
}

impl Profile {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::Today => "today",
        }
    }
}

/// Computed usage report.
#[derive(Debug)]
pub struct UsageReport {
    pub profile: Profile,
    pub window: Window,
    /// Offset used to display the window bounds.
    pub utc_offset: FixedOffset,
    pub timezone: String,
    /// Final usage, largest first.
    pub entries: Vec<UsageEntry>,
}

impl UsageReport {
    pub fn total_ms(&self) -> i64 {
        self.entries.iter().map(|e| e.usage_ms).sum()
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    profile: Profile,
    timezone: &'a str,
    window: Window,
    apps: &'a [UsageEntry],
    total_ms: i64,
}

/// Writes the human-readable report.
pub fn format_usage<W: Write>(writer: &mut W, report: &UsageReport) -> Result<()> {
    let start = format_timestamp(report.window.start_ms, &report.utc_offset, "%Y-%m-%d %H:%M");
    let end = format_timestamp(report.window.end_ms, &report.utc_offset, "%Y-%m-%d %H:%M");
    writeln!(
        writer,
        "APP USAGE ({}): {start} - {end}",
        report.profile.as_str()
    )?;
    writeln!(writer)?;

    if report.entries.is_empty() {
        writeln!(writer, "No usage recorded in this window.")?;
        return Ok(());
    }

    for entry in &report.entries {
        let duration = format_duration(entry.usage_ms);
        writeln!(writer, "  {:<32} {duration:>8}", entry.display_name)?;
    }

    writeln!(writer)?;
    writeln!(
        writer,
        "Total: {} across {} apps",
        format_duration(report.total_ms()),
        report.entries.len()
    )?;
    Ok(())
}

/// Writes the report as pretty-printed JSON.
pub fn format_usage_json<W: Write>(writer: &mut W, report: &UsageReport) -> Result<()> {
    let json = JsonReport {
        profile: report.profile,
        timezone: &report.timezone,
        window: report.window,
        apps: &report.entries,
        total_ms: report.total_ms(),
    };
    serde_json::to_writer_pretty(&mut *writer, &json)?;
    writeln!(writer)?;
    Ok(())
}

pub(crate) fn write_report<W: Write>(writer: &mut W, report: &UsageReport, json: bool) -> Result<()> {
    if json {
        format_usage_json(writer, report)
    } else {
        format_usage(writer, report)
    }
}

/// Runs the usage command.
pub fn run<W: Write>(
    writer: &mut W,
    engine: &SnapshotEngine<'_>,
    start: &str,
    end: Option<&str>,
    json: bool,
) -> Result<()> {
    let (start_ms, end_ms) = resolve_range(start, end)?;
    let window = range_window(start_ms, end_ms, engine.policy().max_range_ms)
        .context("invalid time range")?;

    let usage = engine
        .try_compute_usage(window.start_ms, window.end_ms)
        .context("failed to compute usage")?;

    let report = UsageReport {
        profile: Profile::Range,
        window,
        utc_offset: *Local::now().offset(),
        timezone: local_timezone_name(),
        entries: engine.usage_entries(&usage),
    };
    write_report(writer, &report, json)
}
