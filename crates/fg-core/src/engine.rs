//! The usage engine.
//!
//! [`UsageEngine`] owns its collaborators and a policy and nothing else. Each
//! call queries the collaborators for one window, runs the pipeline and
//! returns; no state carries over between calls.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::aggregate::{UsageMap, read_aggregate, read_today_aggregate};
use crate::error::EngineError;
use crate::filter::AppFilter;
use crate::merge::{MergedSessions, merge_sessions};
use crate::policy::UsagePolicy;
use crate::reconcile::reconcile;
use crate::session::SessionReconstructor;
use crate::source::{AggregateSource, EventSource, PackageMetadata};
use crate::types::AppId;
use crate::window::{Window, range_window, today_window};

/// One app's final usage, enriched for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub app: AppId,
    /// Human-readable label, or the app id when none is known.
    pub display_name: String,
    pub usage_ms: i64,
    pub usage_seconds: i64,
}

/// Computes per-app foreground usage from injected collaborators.
#[derive(Debug, Clone)]
pub struct UsageEngine<E, A, M> {
    events: E,
    aggregates: A,
    packages: M,
    policy: UsagePolicy,
}

impl<E, A, M> UsageEngine<E, A, M>
where
    E: EventSource,
    A: AggregateSource,
    M: PackageMetadata,
{
    /// Creates an engine. The policy is used as given; validate it first.
    pub const fn new(events: E, aggregates: A, packages: M, policy: UsagePolicy) -> Self {
        Self {
            events,
            aggregates,
            packages,
            policy,
        }
    }

    pub const fn policy(&self) -> &UsagePolicy {
        &self.policy
    }

    /// Per-app usage over `[start_ms, end_ms)`.
    ///
    /// Any failure is logged and yields an empty map.
    pub fn compute_usage(&self, start_ms: i64, end_ms: i64) -> UsageMap {
        self.try_compute_usage(start_ms, end_ms)
            .unwrap_or_else(|err| empty_on_failure("range", &err))
    }

    /// Like [`compute_usage`](Self::compute_usage), but reports failures.
    pub fn try_compute_usage(&self, start_ms: i64, end_ms: i64) -> Result<UsageMap, EngineError> {
        let window = range_window(start_ms, end_ms, self.policy.max_range_ms)?;
        let filter = AppFilter::new(&self.packages);

        let event_totals: UsageMap = self
            .merged_sessions(window, &filter)?
            .into_iter()
            .filter(|(_, merged)| merged.total_ms > 0)
            .map(|(app, merged)| (app, merged.total_ms))
            .collect();

        let rows = self
            .aggregates
            .query_aggregate(window.start_ms, window.end_ms)
            .map_err(EngineError::collaborator("aggregate source"))?;
        let aggregate_totals = read_aggregate(&rows, window, &filter, &self.policy);

        let usage = reconcile(&event_totals, &aggregate_totals, &self.policy);
        tracing::debug!(
            start_ms = window.start_ms,
            end_ms = window.end_ms,
            event_apps = event_totals.len(),
            aggregate_apps = aggregate_totals.len(),
            apps = usage.len(),
            "range usage computed"
        );
        Ok(usage)
    }

    /// Per-app usage since local midnight, using the device clock and zone.
    pub fn compute_today_usage(&self) -> UsageMap {
        self.compute_today_usage_at(&Local::now())
    }

    /// Per-app usage from local midnight of `now`'s day until `now`.
    ///
    /// Any failure is logged and yields an empty map.
    pub fn compute_today_usage_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> UsageMap {
        self.try_compute_today_usage_at(now)
            .unwrap_or_else(|err| empty_on_failure("today", &err))
    }

    /// Like [`compute_today_usage_at`](Self::compute_today_usage_at), but
    /// reports failures.
    ///
    /// Today queries trust the aggregate counter only.
    pub fn try_compute_today_usage_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<UsageMap, EngineError> {
        let window = today_window(now, self.policy.today.max_range_ms)?;
        let filter = AppFilter::new(&self.packages);

        let daily = self
            .aggregates
            .query_aggregate(window.start_ms, window.end_ms)
            .map_err(EngineError::collaborator("aggregate source"))?;
        let fine = self
            .aggregates
            .query_aggregate_fine(window.start_ms, window.end_ms)
            .map_err(EngineError::collaborator("aggregate source"))?;

        let usage = read_today_aggregate(&daily, &fine, window, &filter, &self.policy.today);
        tracing::debug!(
            start_ms = window.start_ms,
            end_ms = window.end_ms,
            daily_rows = daily.len(),
            fine_rows = fine.len(),
            apps = usage.len(),
            "today usage computed"
        );
        Ok(usage)
    }

    /// Merged foreground sessions per app over `[start_ms, end_ms)`.
    pub fn session_breakdown(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<BTreeMap<AppId, MergedSessions>, EngineError> {
        let window = range_window(start_ms, end_ms, self.policy.max_range_ms)?;
        self.merged_sessions(window, &AppFilter::new(&self.packages))
    }

    /// Attaches display names to a usage map, largest usage first.
    pub fn usage_entries(&self, usage: &UsageMap) -> Vec<UsageEntry> {
        let mut entries: Vec<UsageEntry> = usage
            .iter()
            .map(|(app, &usage_ms)| UsageEntry {
                display_name: self
                    .packages
                    .display_name(app)
                    .unwrap_or_else(|| app.to_string()),
                app: app.clone(),
                usage_ms,
                usage_seconds: usage_ms / 1000,
            })
            .collect();
        entries.sort_by(|a, b| b.usage_ms.cmp(&a.usage_ms).then_with(|| a.app.cmp(&b.app)));
        entries
    }

    fn merged_sessions(
        &self,
        window: Window,
        filter: &AppFilter<&M>,
    ) -> Result<BTreeMap<AppId, MergedSessions>, EngineError> {
        let events = self
            .events
            .query_events(window.start_ms, window.end_ms)
            .map_err(EngineError::collaborator("event source"))?;

        let raw = SessionReconstructor::new(window, self.policy.min_session_ms, filter)
            .reconstruct(&events);

        Ok(raw
            .into_iter()
            .map(|(app, sessions)| {
                let merged = merge_sessions(&sessions, self.policy.merge_window_ms);
                (app, merged)
            })
            .collect())
    }
}

fn empty_on_failure(profile: &str, err: &EngineError) -> UsageMap {
    match err {
        EngineError::Collaborator { .. } => {
            tracing::error!(profile, error = %err, "usage computation failed");
        }
        EngineError::InvalidWindow { .. } | EngineError::UnresolvableMidnight { .. } => {
            tracing::warn!(profile, error = %err, "usage computation skipped");
        }
    }
    UsageMap::new()
}
