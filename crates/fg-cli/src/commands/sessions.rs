//! Sessions command: merged foreground sessions per app.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local};

use fg_core::{AppId, MergedSessions, Window, range_window};

use super::SnapshotEngine;
use super::util::{format_duration, format_timestamp, resolve_range};

/// Writes the session listing. Apps are listed in id order.
pub fn format_sessions<W: Write>(
    writer: &mut W,
    window: Window,
    offset: &FixedOffset,
    breakdown: &BTreeMap<AppId, MergedSessions>,
) -> Result<()> {
    let start = format_timestamp(window.start_ms, offset, "%Y-%m-%d %H:%M");
    let end = format_timestamp(window.end_ms, offset, "%Y-%m-%d %H:%M");
    writeln!(writer, "SESSIONS: {start} - {end}")?;

    if breakdown.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "No sessions recorded in this window.")?;
        return Ok(());
    }

    for (app, merged) in breakdown {
        let count = merged.sessions.len();
        let noun = if count == 1 { "session" } else { "sessions" };
        writeln!(writer)?;
        writeln!(
            writer,
            "{app} ({count} {noun}, {})",
            format_duration(merged.total_ms)
        )?;
        for session in &merged.sessions {
            writeln!(
                writer,
                "  {} - {}  {}",
                format_timestamp(session.start_ms, offset, "%H:%M:%S"),
                format_timestamp(session.end_ms, offset, "%H:%M:%S"),
                format_duration(session.duration_ms())
            )?;
        }
    }
    Ok(())
}

/// Runs the sessions command.
pub fn run<W: Write>(
    writer: &mut W,
    engine: &SnapshotEngine<'_>,
    start: &str,
    end: Option<&str>,
) -> Result<()> {
    let (start_ms, end_ms) = resolve_range(start, end)?;
    let window = range_window(start_ms, end_ms, engine.policy().max_range_ms)
        .context("invalid time range")?;

    let breakdown = engine
        .session_breakdown(window.start_ms, window.end_ms)
        .context("failed to rebuild sessions")?;

    format_sessions(writer, window, Local::now().offset(), &breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use fg_core::Session;
    use insta::assert_snapshot;

    fn at(h: u32, m: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, s)
            .unwrap()
            .timestamp_millis()
    }

    fn merged(app: &AppId, spans: &[(i64, i64)]) -> MergedSessions {
        let sessions: Vec<Session> = spans
            .iter()
            .map(|&(start_ms, end_ms)| Session {
                app: app.clone(),
                start_ms,
                end_ms,
            })
            .collect();
        let total_ms = sessions.iter().map(Session::duration_ms).sum();
        MergedSessions { sessions, total_ms }
    }

    fn render(breakdown: &BTreeMap<AppId, MergedSessions>) -> String {
        let window = Window::new(at(8, 0, 0), at(9, 0, 0)).unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();
        let mut output = Vec::new();
        format_sessions(&mut output, window, &offset, breakdown).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_sessions_listing() {
        let x = AppId::new("com.x").unwrap();
        let y = AppId::new("com.y").unwrap();
        let breakdown = BTreeMap::from([
            (
                x.clone(),
                merged(&x, &[(at(8, 0, 0), at(8, 0, 20)), (at(8, 1, 0), at(8, 1, 10))]),
            ),
            (y.clone(), merged(&y, &[(at(8, 10, 0), at(8, 32, 5))])),
        ]);

        assert_snapshot!(render(&breakdown), @r"
        SESSIONS: 2025-03-10 08:00 - 2025-03-10 09:00

        com.x (2 sessions, 30s)
          08:00:00 - 08:00:20  20s
          08:01:00 - 08:01:10  10s

        com.y (1 session, 22m 5s)
          08:10:00 - 08:32:05  22m 5s
        ");
    }

    #[test]
    fn test_sessions_listing_empty() {
        assert_snapshot!(render(&BTreeMap::new()), @r"
        SESSIONS: 2025-03-10 08:00 - 2025-03-10 09:00

        No sessions recorded in this window.
        ");
    }
}
