//! Engine error types.

use chrono::NaiveDate;
use thiserror::Error;

use crate::source::SourceError;

/// Reasons a usage computation produced no data.
///
/// These never escape `compute_usage` / `compute_today_usage`; they are
/// logged there and turned into an empty result. The `try_` variants return
/// them to callers that need to tell "no usage" from "no data".
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid window: end {end_ms} is not after start {start_ms}")]
    InvalidWindow { start_ms: i64, end_ms: i64 },

    #[error("cannot resolve local midnight for {date}")]
    UnresolvableMidnight { date: NaiveDate },

    #[error("{collaborator} query failed: {source}")]
    Collaborator {
        collaborator: &'static str,
        #[source]
        source: SourceError,
    },
}

impl EngineError {
    /// Wraps a collaborator failure, for use with `map_err`.
    pub(crate) fn collaborator(collaborator: &'static str) -> impl FnOnce(SourceError) -> Self {
        move |source| Self::Collaborator {
            collaborator,
            source,
        }
    }
}
