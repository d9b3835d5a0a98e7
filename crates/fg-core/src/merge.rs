//! Session deduplication.

use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Minimal non-overlapping cover of one app's sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedSessions {
    /// Merged sessions, sorted by start.
    pub sessions: Vec<Session>,
    /// Sum of the merged durations.
    pub total_ms: i64,
}

/// Merges one app's raw sessions.
///
/// Sessions that overlap, or start within `merge_window_ms` of the previous
/// session's end, are folded into it. A session nested inside another adds
/// nothing. Launch flicker collapses while separate bursts of use stay apart.
///
/// A bridged gap becomes part of the merged session and counts towards
/// `total_ms`, so the total may exceed the raw union by at most
/// `merge_window_ms` per fold.
pub fn merge_sessions(sessions: &[Session], merge_window_ms: i64) -> MergedSessions {
    let mut sorted: Vec<Session> = sessions
        .iter()
        .filter(|s| s.end_ms > s.start_ms)
        .cloned()
        .collect();
    sorted.sort_by_key(|s| s.start_ms);

    let mut merged: Vec<Session> = Vec::with_capacity(sorted.len());
    for session in sorted {
        if let Some(current) = merged.last_mut() {
            if session.start_ms <= current.end_ms.saturating_add(merge_window_ms) {
                current.end_ms = current.end_ms.max(session.end_ms);
                continue;
            }
        }
        merged.push(session);
    }

    let total_ms = merged.iter().map(Session::duration_ms).sum();
    if merged.len() != sessions.len() {
        if let Some(first) = merged.first() {
            tracing::debug!(
                app = %first.app,
                raw = sessions.len(),
                merged = merged.len(),
                total_ms,
                "sessions merged"
            );
        }
    }

    MergedSessions {
        sessions: merged,
        total_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::policy::UsagePolicy;
    use crate::types::AppId;

    fn s(start: i64, end: i64) -> Session {
        Session {
            app: AppId::new("com.x").unwrap(),
            start_ms: start,
            end_ms: end,
        }
    }

    fn spans(merged: &MergedSessions) -> Vec<(i64, i64)> {
        merged
            .sessions
            .iter()
            .map(|s| (s.start_ms, s.end_ms))
            .collect()
    }

    /// Total length of the union of the given intervals, in ms.
    fn union_ms(sessions: &[Session]) -> i64 {
        let mut points: Vec<(i64, i64)> = sessions.iter().map(|s| (s.start_ms, s.end_ms)).collect();
        points.sort_unstable();
        let mut total = 0;
        let mut cursor = i64::MIN;
        for (start, end) in points {
            let from = start.max(cursor);
            if end > from {
                total += end - from;
            }
            cursor = cursor.max(end);
        }
        total
    }

    #[test]
    fn empty_input() {
        let merged = merge_sessions(&[], 1000);
        assert!(merged.sessions.is_empty());
        assert_eq!(merged.total_ms, 0);
    }

    #[test]
    fn single_session_is_unchanged() {
        let merged = merge_sessions(&[s(0, 125_000)], 1000);
        assert_eq!(spans(&merged), vec![(0, 125_000)]);
        assert_eq!(merged.total_ms, 125_000);
    }

    #[test]
    fn overlapping_sessions_merge() {
        let merged = merge_sessions(&[s(0, 10_000), s(5_000, 20_000)], 1000);
        assert_eq!(spans(&merged), vec![(0, 20_000)]);
        assert_eq!(merged.total_ms, 20_000);
    }

    #[test]
    fn nested_session_adds_nothing() {
        let merged = merge_sessions(&[s(0, 30_000), s(5_000, 10_000)], 1000);
        assert_eq!(spans(&merged), vec![(0, 30_000)]);
    }

    #[test]
    fn gap_within_merge_window_merges() {
        let merged = merge_sessions(&[s(0, 10_000), s(11_000, 20_000)], 1000);
        assert_eq!(spans(&merged), vec![(0, 20_000)]);
        // The bridged gap counts as usage.
        assert_eq!(merged.total_ms, 20_000);
    }

    #[test]
    fn gap_beyond_merge_window_stays_separate() {
        let merged = merge_sessions(&[s(0, 10_000), s(11_001, 20_000)], 1000);
        assert_eq!(spans(&merged), vec![(0, 10_000), (11_001, 20_000)]);
        assert_eq!(merged.total_ms, 18_999);
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let merged = merge_sessions(&[s(50_000, 60_000), s(0, 10_000)], 1000);
        assert_eq!(spans(&merged), vec![(0, 10_000), (50_000, 60_000)]);
    }

    #[test]
    fn overlap_only_merge_never_inflates_and_preserves_union() {
        let raw = vec![
            s(0, 10_000),
            s(2_000, 4_000),
            s(9_000, 15_000),
            s(40_000, 41_000),
            s(40_500, 45_000),
            s(100_000, 130_000),
        ];
        let raw_sum: i64 = raw.iter().map(Session::duration_ms).sum();

        let merged = merge_sessions(&raw, 0);

        assert!(merged.total_ms <= raw_sum);
        assert_eq!(merged.total_ms, union_ms(&raw));
        assert_eq!(union_ms(&merged.sessions), union_ms(&raw));
        for pair in merged.sessions.windows(2) {
            assert!(pair[0].end_ms < pair[1].start_ms);
        }
    }

    #[test]
    fn bridged_gaps_are_bounded_by_merge_window() {
        let merge_window_ms = UsagePolicy::default().merge_window_ms;
        let raw = vec![
            s(0, 1_000),
            s(2_000, 3_000),
            s(4_000, 5_000),
            s(4_500, 4_800),
            s(20_000, 30_000),
            s(30_400, 31_000),
            s(60_000, 61_000),
        ];
        let raw_sum: i64 = raw.iter().map(Session::duration_ms).sum();
        let raw_union = union_ms(&raw);

        let merged = merge_sessions(&raw, merge_window_ms);

        let folds = i64::try_from(raw.len() - merged.sessions.len()).unwrap();
        assert!(merged.total_ms <= raw_sum + folds * merge_window_ms);
        assert!(merged.total_ms >= raw_union);
        assert!(merged.total_ms <= raw_union + folds * merge_window_ms);
        // Every raw session lies inside exactly one merged session.
        for session in &raw {
            let covering = merged
                .sessions
                .iter()
                .filter(|m| m.start_ms <= session.start_ms && session.end_ms <= m.end_ms)
                .count();
            assert_eq!(covering, 1, "{session:?}");
        }
        // Merged sessions stay more than a merge window apart.
        for pair in merged.sessions.windows(2) {
            assert!(pair[1].start_ms - pair[0].end_ms > merge_window_ms);
        }
        assert_eq!(
            spans(&merged),
            vec![(0, 5_000), (20_000, 31_000), (60_000, 61_000)]
        );
        assert_eq!(merged.total_ms, 17_000);
    }
}
