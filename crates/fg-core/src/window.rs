//! Query window validation and clamping.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A half-open query interval `[start_ms, end_ms)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Window {
    /// Creates a window, rejecting empty or inverted ranges.
    pub const fn new(start_ms: i64, end_ms: i64) -> Result<Self, EngineError> {
        if end_ms <= start_ms {
            return Err(EngineError::InvalidWindow { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }

    /// Length of the window. Spans beyond `i64::MAX` saturate.
    pub const fn span_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Clamps a timestamp into the window.
    pub fn clamp(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.clamp(self.start_ms, self.end_ms)
    }

    /// Keeps the end and moves the start forward so the span is at most
    /// `max_span_ms`.
    fn limit_span(self, max_span_ms: i64) -> Self {
        if self.span_ms() <= max_span_ms {
            return self;
        }
        tracing::warn!(
            start_ms = self.start_ms,
            end_ms = self.end_ms,
            requested_hours = self.span_ms() / 3_600_000,
            limit_hours = max_span_ms / 3_600_000,
            "window too large, keeping only its most recent part"
        );
        Self {
            start_ms: self.end_ms - max_span_ms,
            end_ms: self.end_ms,
        }
    }
}

/// Validates an arbitrary range request.
///
/// Overlong ranges are clamped to their most recent `max_span_ms`; that loses
/// history but is not an error.
pub fn range_window(start_ms: i64, end_ms: i64, max_span_ms: i64) -> Result<Window, EngineError> {
    Window::new(start_ms, end_ms).map(|window| window.limit_span(max_span_ms))
}

/// Computes `[local midnight, now]` for the day containing `now`.
///
/// `now` is truncated to the whole second. The time zone is taken from `now`
/// itself, so callers pass `Local::now()` to follow the device setting.
pub fn today_window<Tz: TimeZone>(now: &DateTime<Tz>, max_span_ms: i64) -> Result<Window, EngineError> {
    let today = now.date_naive();
    let midnight = local_midnight(&now.timezone(), today)?;
    let end_ms = now.timestamp_millis().div_euclid(1000) * 1000;

    Window::new(midnight.timestamp_millis(), end_ms).map(|window| window.limit_span(max_span_ms))
}

/// Resolves local midnight of `date` in `tz`.
/// Ambiguous midnights (DST fall-back) pick the earlier instant. A midnight
/// skipped by a DST gap resolves to 01:00.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Tz>, EngineError> {
    match tz.from_local_datetime(&date.and_time(NaiveTime::MIN)) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt),
        LocalResult::None => NaiveTime::from_hms_opt(1, 0, 0)
            .and_then(|one_am| tz.from_local_datetime(&date.and_time(one_am)).earliest())
            .ok_or(EngineError::UnresolvableMidnight { date }),
    }
}
