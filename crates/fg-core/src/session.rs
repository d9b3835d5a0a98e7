//! Foreground session reconstruction.
//!
//! Replays an ordered transition stream through a per-app state machine and
//! emits the raw foreground intervals it implies.
//!
//! # Algorithm Summary
//!
//! 1. Primary foreground/background transitions open and close sessions
//! 2. Activity resumed/paused hints only apply when they would change state
//! 3. Screen off closes every open session; no session opens while it is off
//! 4. Sessions still open at the end of the stream close at the window end
//! 5. Every session is clamped to the window; short ones are dropped

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind};
use crate::filter::AppFilter;
use crate::source::PackageMetadata;
use crate::types::AppId;
use crate::window::Window;

/// A contiguous interval during which one app was in the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub app: AppId,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Session {
    pub const fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Foreground/background phase of one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Foreground,
    Background,
}

/// Tracked app state.
#[derive(Debug, Clone, Copy)]
struct AppState {
    phase: Phase,
    /// When the app entered its current phase.
    since_ms: i64,
}

/// Rebuilds raw foreground sessions for a single window.
///
/// All state lives for one [`reconstruct`](Self::reconstruct) call.
#[derive(Debug)]
pub struct SessionReconstructor<'a, M> {
    window: Window,
    min_session_ms: i64,
    filter: &'a AppFilter<M>,
}

/// Mutable state of one reconstruction pass.
struct Pass {
    window: Window,
    min_session_ms: i64,
    screen_interactive: bool,
    app_states: HashMap<AppId, AppState>,
    sessions: BTreeMap<AppId, Vec<Session>>,
}

impl<'a, M: PackageMetadata> SessionReconstructor<'a, M> {
    pub const fn new(window: Window, min_session_ms: i64, filter: &'a AppFilter<M>) -> Self {
        Self {
            window,
            min_session_ms,
            filter,
        }
    }

    /// Rebuilds raw sessions per app.
    ///
    /// Events should be sorted by timestamp ascending; an unsorted stream is
    /// re-sorted (stably) before replay. The returned sessions may still
    /// overlap or touch; run them through [`crate::merge_sessions`].
    pub fn reconstruct(&self, events: &[Event]) -> BTreeMap<AppId, Vec<Session>> {
        let mut sorted;
        let events = if events.is_sorted_by_key(|e| e.timestamp_ms) {
            events
        } else {
            tracing::warn!(count = events.len(), "event stream out of order, re-sorting");
            sorted = events.to_vec();
            sorted.sort_by_key(|e| e.timestamp_ms);
            &sorted
        };

        let mut pass = Pass {
            window: self.window,
            min_session_ms: self.min_session_ms,
            screen_interactive: true,
            app_states: HashMap::new(),
            sessions: BTreeMap::new(),
        };
        let mut verdicts: HashMap<&AppId, bool> = HashMap::new();

        for event in events {
            if let Some(app) = event.kind.app() {
                let tracked = *verdicts
                    .entry(app)
                    .or_insert_with(|| self.filter.is_tracked(app));
                if !tracked {
                    continue;
                }
            }
            pass.apply(event);
        }

        pass.finish()
    }
}

impl Pass {
    fn phase(&self, app: &AppId) -> Option<Phase> {
        self.app_states.get(app).map(|state| state.phase)
    }

    fn apply(&mut self, event: &Event) {
        let t = event.timestamp_ms;
        match &event.kind {
            EventKind::ForegroundEntered { app } => {
                if self.screen_interactive {
                    self.enter_foreground(app, t);
                }
            }
            EventKind::BackgroundEntered { app } => self.enter_background(app, t),
            EventKind::ActivityResumed { app } => {
                if self.screen_interactive && self.phase(app) != Some(Phase::Foreground) {
                    self.enter_foreground(app, t);
                }
            }
            EventKind::ActivityPaused { app } => {
                if self.phase(app) == Some(Phase::Foreground) {
                    self.enter_background(app, t);
                }
            }
            EventKind::ScreenOff => {
                self.screen_interactive = false;
                let open: Vec<(AppId, i64)> = self
                    .app_states
                    .iter()
                    .filter(|(_, state)| state.phase == Phase::Foreground)
                    .map(|(app, state)| (app.clone(), state.since_ms))
                    .collect();
                for (app, since_ms) in open {
                    tracing::debug!(app = %app, open_ms = t - since_ms, "screen off closed session");
                    self.finalize(&app, since_ms, t);
                    self.app_states.insert(
                        app,
                        AppState {
                            phase: Phase::Background,
                            since_ms: t,
                        },
                    );
                }
            }
            EventKind::ScreenOn => {
                self.screen_interactive = true;
                tracing::trace!(at_ms = t, "screen on");
            }
        }
    }

    fn enter_foreground(&mut self, app: &AppId, t: i64) {
        // A second foreground without a background in between means the
        // background event went missing; close what we have.
        if let Some(AppState {
            phase: Phase::Foreground,
            since_ms,
        }) = self.app_states.get(app).copied()
        {
            self.finalize(app, since_ms, t);
        }
        self.app_states.insert(
            app.clone(),
            AppState {
                phase: Phase::Foreground,
                since_ms: t,
            },
        );
    }

    fn enter_background(&mut self, app: &AppId, t: i64) {
        if let Some(AppState {
            phase: Phase::Foreground,
            since_ms,
        }) = self.app_states.get(app).copied()
        {
            self.finalize(app, since_ms, t);
            self.app_states.insert(
                app.clone(),
                AppState {
                    phase: Phase::Background,
                    since_ms: t,
                },
            );
        }
    }

    fn finalize(&mut self, app: &AppId, start_ms: i64, end_ms: i64) {
        let start_ms = self.window.clamp(start_ms);
        let end_ms = self.window.clamp(end_ms);
        let duration_ms = end_ms - start_ms;

        if duration_ms < self.min_session_ms {
            tracing::trace!(app = %app, duration_ms, "session too short, dropped");
            return;
        }

        tracing::debug!(app = %app, start_ms, end_ms, duration_ms, "session finalized");
        self.sessions.entry(app.clone()).or_default().push(Session {
            app: app.clone(),
            start_ms,
            end_ms,
        });
    }

    fn finish(mut self) -> BTreeMap<AppId, Vec<Session>> {
        let end_ms = self.window.end_ms;
        let open: Vec<(AppId, i64)> = self
            .app_states
            .iter()
            .filter(|(_, state)| state.phase == Phase::Foreground)
            .map(|(app, state)| (app.clone(), state.since_ms))
            .collect();
        for (app, since_ms) in open {
            self.finalize(&app, since_ms, end_ms);
        }
        self.sessions
    }
}
