//! Collaborator contracts consumed by the engine.
//!
//! The engine never talks to the operating system itself. Callers inject
//! implementations of these traits (the OS usage service on a device, file
//! snapshots in the CLI, fixtures in tests).

use thiserror::Error;

use crate::event::Event;
use crate::types::AppId;

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("usage access not granted")]
    PermissionDenied,

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of the OS aggregate usage counter.
///
/// A source may legitimately return several rows for the same app (one per
/// bucket it keeps internally).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    pub app: AppId,
    pub duration_ms: i64,
}

impl AggregateRow {
    pub const fn new(app: AppId, duration_ms: i64) -> Self {
        Self { app, duration_ms }
    }
}

/// Ordered stream of foreground/background transitions.
pub trait EventSource {
    /// Returns the events with `start_ms <= timestamp < end_ms`, ascending by
    /// timestamp.
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<Event>, SourceError>;
}

/// OS-provided per-app foreground totals.
pub trait AggregateSource {
    /// Returns the daily-bucketed rows overlapping `[start_ms, end_ms)`.
    fn query_aggregate(&self, start_ms: i64, end_ms: i64)
    -> Result<Vec<AggregateRow>, SourceError>;

    /// Returns rows from the source's finest available bucketing, used to
    /// cross-check the daily rows for current-day queries.
    ///
    /// Sources without a finer bucketing report nothing.
    fn query_aggregate_fine(
        &self,
        _start_ms: i64,
        _end_ms: i64,
    ) -> Result<Vec<AggregateRow>, SourceError> {
        Ok(Vec::new())
    }
}

/// Installed-package facts used to decide which apps are user-facing.
///
/// Unknown packages report no launcher entry, no system flag and no label.
pub trait PackageMetadata {
    fn has_launcher_entry(&self, app: &AppId) -> bool;

    fn is_system_package(&self, app: &AppId) -> bool;

    fn display_name(&self, app: &AppId) -> Option<String>;
}

impl<T: EventSource + ?Sized> EventSource for &T {
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<Event>, SourceError> {
        (**self).query_events(start_ms, end_ms)
    }
}

impl<T: AggregateSource + ?Sized> AggregateSource for &T {
    fn query_aggregate(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<AggregateRow>, SourceError> {
        (**self).query_aggregate(start_ms, end_ms)
    }

    fn query_aggregate_fine(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<AggregateRow>, SourceError> {
        (**self).query_aggregate_fine(start_ms, end_ms)
    }
}

impl<T: PackageMetadata + ?Sized> PackageMetadata for &T {
    fn has_launcher_entry(&self, app: &AppId) -> bool {
        (**self).has_launcher_entry(app)
    }

    fn is_system_package(&self, app: &AppId) -> bool {
        (**self).is_system_package(app)
    }

    fn display_name(&self, app: &AppId) -> Option<String> {
        (**self).display_name(app)
    }
}
