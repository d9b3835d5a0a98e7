//! Aggregate counter reading.
//!
//! The OS counter is independent of the event stream but unreliable in its
//! own ways: it repeats rows for one app, and occasionally reports totals
//! that cannot be true. Everything here is summation, filtering and capping.

use std::collections::BTreeMap;

use crate::filter::AppFilter;
use crate::policy::{TodayProfile, UsagePolicy};
use crate::source::{AggregateRow, PackageMetadata};
use crate::types::AppId;
use crate::window::Window;

/// Per-app duration in milliseconds.
pub type UsageMap = BTreeMap<AppId, i64>;

/// Sums aggregate rows per app and caps each total.
///
/// Rows for the same app are summed before the cap is applied. The cap is the
/// smaller of `max_daily_usage_ms` and the window span. Non-positive rows are
/// ignored.
pub fn read_aggregate<M: PackageMetadata>(
    rows: &[AggregateRow],
    window: Window,
    filter: &AppFilter<M>,
    policy: &UsagePolicy,
) -> UsageMap {
    let summed = sum_tracked(rows, filter, |total, row| total.saturating_add(row));
    let ceiling = policy.max_daily_usage_ms.min(window.span_ms());

    summed
        .into_iter()
        .map(|(app, total)| {
            if total > ceiling {
                tracing::debug!(app = %app, total_ms = total, ceiling_ms = ceiling, "aggregate total capped");
            }
            (app, total.min(ceiling))
        })
        .collect()
}

/// Reads the current-day aggregate with the stricter today profile.
///
/// Daily rows repeat the same bucket rather than splitting it, so an app's
/// daily value is its largest row. Fine-grained rows are summed and only used
/// when the daily counter has nothing for the app.
pub fn read_today_aggregate<M: PackageMetadata>(
    daily: &[AggregateRow],
    fine: &[AggregateRow],
    window: Window,
    filter: &AppFilter<M>,
    profile: &TodayProfile,
) -> UsageMap {
    let daily = sum_tracked(daily, filter, i64::max);
    let mut fine = sum_tracked(fine, filter, |total, row| total.saturating_add(row));

    let mut chosen = UsageMap::new();
    for (app, daily_ms) in daily {
        if let Some(fine_ms) = fine.remove(&app) {
            let drift = relative_drift(daily_ms, fine_ms);
            if drift > profile.cross_check_tolerance {
                tracing::debug!(app = %app, daily_ms, fine_ms, drift, "daily and fine aggregates disagree, keeping daily");
            }
        }
        chosen.insert(app, daily_ms);
    }
    chosen.extend(fine);

    chosen
        .into_iter()
        .filter_map(|(app, ms)| {
            let filtered = apply_today_limits(ms, window, profile);
            if filtered != ms {
                tracing::debug!(app = %app, raw_ms = ms, final_ms = filtered, "today limits applied");
            }
            (filtered > 0).then_some((app, filtered))
        })
        .collect()
}

/// Applies the today profile to one app's value: clamp to the window span, cap,
/// drop short values, truncate to whole seconds.
pub fn apply_today_limits(usage_ms: i64, window: Window, profile: &TodayProfile) -> i64 {
    let capped = usage_ms
        .min(window.span_ms())
        .min(profile.max_daily_usage_ms);
    if capped < profile.min_usage_ms || capped <= 0 {
        return 0;
    }
    if profile.truncate_to_second {
        capped - capped % 1000
    } else {
        capped
    }
}

/// Folds positive rows of tracked apps into one value per app.
fn sum_tracked<M: PackageMetadata>(
    rows: &[AggregateRow],
    filter: &AppFilter<M>,
    fold: impl Fn(i64, i64) -> i64,
) -> UsageMap {
    let mut verdicts: BTreeMap<&AppId, bool> = BTreeMap::new();
    let mut totals = UsageMap::new();

    for row in rows.iter().filter(|row| row.duration_ms > 0) {
        let tracked = *verdicts
            .entry(&row.app)
            .or_insert_with(|| filter.is_tracked(&row.app));
        if !tracked {
            continue;
        }
        totals
            .entry(row.app.clone())
            .and_modify(|total| *total = fold(*total, row.duration_ms))
            .or_insert(row.duration_ms);
    }

    totals
}

#[allow(clippy::cast_precision_loss)]
fn relative_drift(reference: i64, other: i64) -> f64 {
    ((other - reference) as f64 / reference as f64).abs()
}
