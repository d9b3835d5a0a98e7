//! Foreground usage reconstruction.
//!
//! This crate turns two imperfect usage sources into one duration per app:
//! - Session reconstruction: replaying foreground/background transitions
//! - Session merging: collapsing overlaps and launch flicker
//! - Aggregate reading: summing and capping the OS usage counter
//! - Reconciliation: choosing between the two totals per app
//!
//! It performs no I/O. Callers supply the event stream, the aggregate counter
//! and package metadata through the traits in [`source`].

mod aggregate;
mod engine;
mod error;
pub mod event;
pub mod filter;
mod merge;
pub mod policy;
mod reconcile;
mod session;
pub mod source;
pub mod types;
pub mod window;

pub use aggregate::{UsageMap, apply_today_limits, read_aggregate, read_today_aggregate};
pub use engine::{UsageEntry, UsageEngine};
pub use error::EngineError;
pub use event::{Event, EventKind};
pub use filter::{AppFilter, is_tracked_app};
pub use merge::{MergedSessions, merge_sessions};
pub use policy::{POLICY_VERSION, PolicyError, TodayProfile, UsagePolicy};
pub use reconcile::{Decision, reconcile, reconcile_app};
pub use session::{Session, SessionReconstructor};
pub use source::{AggregateRow, AggregateSource, EventSource, PackageMetadata, SourceError};
pub use types::{AppId, ValidationError};
pub use window::{Window, range_window, today_window};
