//! Raw foreground/background transition events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::AppId;

/// A single transition reported by the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// When the transition occurred, in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// What happened.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The type of transition captured.
///
/// Foreground/background transitions are the primary signals. Activity
/// resumed/paused are secondary hints that only apply when the primary
/// signals have not already put the app in the implied state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The app became the visible foreground app.
    ForegroundEntered { app: AppId },
    /// The app left the foreground.
    BackgroundEntered { app: AppId },
    /// One of the app's activities resumed.
    ActivityResumed { app: AppId },
    /// One of the app's activities paused.
    ActivityPaused { app: AppId },
    /// The display stopped being interactive.
    ScreenOff,
    /// The display became interactive again.
    ScreenOn,
}

impl EventKind {
    /// Returns the app this transition belongs to, if any.
    ///
    /// Screen power events are device-wide and carry no app.
    pub const fn app(&self) -> Option<&AppId> {
        match self {
            Self::ForegroundEntered { app }
            | Self::BackgroundEntered { app }
            | Self::ActivityResumed { app }
            | Self::ActivityPaused { app } => Some(app),
            Self::ScreenOff | Self::ScreenOn => None,
        }
    }

    /// Wire name of the transition type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ForegroundEntered { .. } => "foreground_entered",
            Self::BackgroundEntered { .. } => "background_entered",
            Self::ActivityResumed { .. } => "activity_resumed",
            Self::ActivityPaused { .. } => "activity_paused",
            Self::ScreenOff => "screen_off",
            Self::ScreenOn => "screen_on",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    /// Shorthand constructors, mostly useful for sources and fixtures.
    pub const fn new(timestamp_ms: i64, kind: EventKind) -> Self {
        Self { timestamp_ms, kind }
    }

    pub const fn foreground(app: AppId, timestamp_ms: i64) -> Self {
        Self::new(timestamp_ms, EventKind::ForegroundEntered { app })
    }

    pub const fn background(app: AppId, timestamp_ms: i64) -> Self {
        Self::new(timestamp_ms, EventKind::BackgroundEntered { app })
    }

    pub const fn resumed(app: AppId, timestamp_ms: i64) -> Self {
        Self::new(timestamp_ms, EventKind::ActivityResumed { app })
    }

    pub const fn paused(app: AppId, timestamp_ms: i64) -> Self {
        Self::new(timestamp_ms, EventKind::ActivityPaused { app })
    }

    pub const fn screen_off(timestamp_ms: i64) -> Self {
        Self::new(timestamp_ms, EventKind::ScreenOff)
    }

    pub const fn screen_on(timestamp_ms: i64) -> Self {
        Self::new(timestamp_ms, EventKind::ScreenOn)
    }
}
