//! Event/aggregate reconciliation.
//!
//! The event-based and aggregate-based totals fail in different directions.
//! Reconstructed sessions over-count when background events go missing; the
//! aggregate counter over-counts when it folds in background time. Comparing
//! their ratio tells which one to trust.

use std::collections::BTreeSet;

use crate::aggregate::UsageMap;
use crate::policy::UsagePolicy;

/// Which rule picked the final value for one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Event total is implausibly high; the aggregate total was used.
    EventsInflated,
    /// Aggregate total is implausibly high; the event total was used.
    AggregateInflated,
    /// Both totals agree within tolerance; their mean was used.
    Averaged,
    /// No rule applied; the larger total was used.
    Larger,
    /// Only the event total was available.
    EventsOnly,
    /// Only the aggregate total was available.
    AggregateOnly,
}

/// Picks one duration from an app's two totals.
///
/// Returns `None` when neither total is positive.
#[allow(clippy::cast_precision_loss)]
pub fn reconcile_app(
    event_ms: i64,
    aggregate_ms: i64,
    policy: &UsagePolicy,
) -> Option<(i64, Decision)> {
    match (event_ms > 0, aggregate_ms > 0) {
        (true, true) => {
            let high = policy.inflated_ratio;
            let low = policy.deflated_ratio;
            let ratio = event_ms as f64 / aggregate_ms as f64;

            let picked = if ratio > high {
                (aggregate_ms, Decision::EventsInflated)
            } else if ratio < low && aggregate_ms as f64 > event_ms as f64 * high {
                (event_ms, Decision::AggregateInflated)
            } else if (low..=high).contains(&ratio) {
                ((event_ms + aggregate_ms) / 2, Decision::Averaged)
            } else {
                (event_ms.max(aggregate_ms), Decision::Larger)
            };
            Some(picked)
        }
        (true, false) => Some((event_ms, Decision::EventsOnly)),
        (false, true) => Some((aggregate_ms, Decision::AggregateOnly)),
        (false, false) => None,
    }
}

/// Combines per-app event and aggregate totals into one final map.
///
/// Apps with no positive total on either side are omitted. The result only
/// depends on the two maps and the policy.
pub fn reconcile(event_totals: &UsageMap, aggregate_totals: &UsageMap, policy: &UsagePolicy) -> UsageMap {
    let apps: BTreeSet<_> = event_totals.keys().chain(aggregate_totals.keys()).collect();

    apps.into_iter()
        .filter_map(|app| {
            let event_ms = event_totals.get(app).copied().unwrap_or(0);
            let aggregate_ms = aggregate_totals.get(app).copied().unwrap_or(0);
            let (final_ms, decision) = reconcile_app(event_ms, aggregate_ms, policy)?;
            tracing::debug!(
                app = %app,
                event_ms,
                aggregate_ms,
                final_ms,
                ?decision,
                "reconciled"
            );
            Some((app.clone(), final_ms))
        })
        .collect()
}
