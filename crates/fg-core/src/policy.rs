//! Versioned reconciliation policy.
//!
//! Every threshold the engine uses lives here so that one policy set is
//! authoritative at a time. Bump [`POLICY_VERSION`] whenever a default
//! changes meaning.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version of the default policy set.
pub const POLICY_VERSION: u32 = 1;

const SECOND_MS: i64 = 1_000;
const HOUR_MS: i64 = 60 * 60 * SECOND_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Errors from validating a policy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("unsupported policy version {found} (expected {expected})", expected = POLICY_VERSION)]
    UnsupportedVersion { found: u32 },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    #[error("{field} cannot be negative, got {value}")]
    Negative { field: &'static str, value: i64 },

    #[error("invalid ratio bounds: deflated {deflated} must be in (0, {inflated}]")]
    RatioBounds { deflated: f64, inflated: f64 },

    #[error("cross-check tolerance must be within [0, 1), got {value}")]
    Tolerance { value: f64 },
}

/// Thresholds for general range queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsagePolicy {
    /// Policy set version. Only [`POLICY_VERSION`] is accepted.
    pub version: u32,

    /// Longest window a range query may cover. Longer requests keep their end
    /// and move their start forward. Default: 7 days.
    pub max_range_ms: i64,

    /// Reconstructed sessions shorter than this are dropped as
    /// instrumentation noise. Default: 1000 (1 second).
    pub min_session_ms: i64,

    /// Sessions starting within this distance of the previous session's end
    /// are merged into it. Default: 1000 (1 second).
    pub merge_window_ms: i64,

    /// Ceiling applied to each app's summed aggregate total. Default: 12 hours.
    pub max_daily_usage_ms: i64,

    /// Event/aggregate ratio above which the event total is considered
    /// inflated. Default: 1.5.
    pub inflated_ratio: f64,

    /// Event/aggregate ratio below which the aggregate total may be inflated.
    /// Default: 0.67.
    pub deflated_ratio: f64,

    /// Stricter profile for current-day queries.
    pub today: TodayProfile,
}

/// Aggregate-only profile used for "today" queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodayProfile {
    /// Longest span a today window may cover. Default: 24 hours.
    pub max_range_ms: i64,

    /// Final values below this are dropped. Default: 2000 (2 seconds).
    pub min_usage_ms: i64,

    /// Per-app ceiling. Default: 8 hours.
    pub max_daily_usage_ms: i64,

    /// Round final values down to whole seconds. Default: true.
    pub truncate_to_second: bool,

    /// Relative disagreement between the daily and fine-grained aggregates
    /// that is tolerated silently. Default: 0.1.
    pub cross_check_tolerance: f64,
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self {
            version: POLICY_VERSION,
            max_range_ms: 7 * DAY_MS,
            min_session_ms: SECOND_MS,
            merge_window_ms: SECOND_MS,
            max_daily_usage_ms: 12 * HOUR_MS,
            inflated_ratio: 1.5,
            deflated_ratio: 0.67,
            today: TodayProfile::default(),
        }
    }
}

impl Default for TodayProfile {
    fn default() -> Self {
        Self {
            max_range_ms: DAY_MS,
            min_usage_ms: 2 * SECOND_MS,
            max_daily_usage_ms: 8 * HOUR_MS,
            truncate_to_second: true,
            cross_check_tolerance: 0.1,
        }
    }
}

impl UsagePolicy {
    /// Checks that the policy is internally consistent.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.version != POLICY_VERSION {
            return Err(PolicyError::UnsupportedVersion {
                found: self.version,
            });
        }

        positive("max_range_ms", self.max_range_ms)?;
        positive("min_session_ms", self.min_session_ms)?;
        positive("max_daily_usage_ms", self.max_daily_usage_ms)?;
        non_negative("merge_window_ms", self.merge_window_ms)?;

        if !(self.deflated_ratio > 0.0 && self.deflated_ratio <= self.inflated_ratio) {
            return Err(PolicyError::RatioBounds {
                deflated: self.deflated_ratio,
                inflated: self.inflated_ratio,
            });
        }

        positive("today.max_range_ms", self.today.max_range_ms)?;
        positive("today.max_daily_usage_ms", self.today.max_daily_usage_ms)?;
        non_negative("today.min_usage_ms", self.today.min_usage_ms)?;

        let tolerance = self.today.cross_check_tolerance;
        if !(0.0..1.0).contains(&tolerance) {
            return Err(PolicyError::Tolerance { value: tolerance });
        }

        Ok(())
    }
}

const fn positive(field: &'static str, value: i64) -> Result<(), PolicyError> {
    if value > 0 {
        Ok(())
    } else {
        Err(PolicyError::NotPositive { field, value })
    }
}

const fn non_negative(field: &'static str, value: i64) -> Result<(), PolicyError> {
    if value >= 0 {
        Ok(())
    } else {
        Err(PolicyError::Negative { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        assert_eq!(UsagePolicy::default().validate(), Ok(()));
    }

    #[test]
    fn default_constants() {
        let policy = UsagePolicy::default();
        assert_eq!(policy.max_range_ms, 604_800_000);
        assert_eq!(policy.max_daily_usage_ms, 43_200_000);
        assert_eq!(policy.today.max_range_ms, 86_400_000);
        assert_eq!(policy.today.max_daily_usage_ms, 28_800_000);
    }

    #[test]
    fn rejects_unknown_version() {
        let policy = UsagePolicy {
            version: 2,
            ..Default::default()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::UnsupportedVersion { found: 2 })
        );
    }

    #[test]
    fn rejects_inverted_ratios() {
        let policy = UsagePolicy {
            deflated_ratio: 2.0,
            inflated_ratio: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::RatioBounds { .. })
        ));
    }

    #[test]
    fn rejects_zero_min_session() {
        let policy = UsagePolicy {
            min_session_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::NotPositive {
                field: "min_session_ms",
                value: 0
            })
        );
    }

    #[test]
    fn rejects_out_of_range_tolerance() {
        let mut policy = UsagePolicy::default();
        policy.today.cross_check_tolerance = 1.5;
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::Tolerance { .. })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let policy: UsagePolicy =
            serde_json::from_str(r#"{"merge_window_ms": 5000, "today": {"min_usage_ms": 0}}"#)
                .unwrap();

        assert_eq!(policy.merge_window_ms, 5000);
        assert_eq!(policy.min_session_ms, 1000);
        assert_eq!(policy.today.min_usage_ms, 0);
        assert_eq!(policy.today.max_daily_usage_ms, 8 * HOUR_MS);
        assert_eq!(policy.validate(), Ok(()));
    }
}
