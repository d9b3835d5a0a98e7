//! CLI subcommand implementations.

pub mod policy;
pub mod sessions;
pub mod today;
pub mod usage;
pub mod util;

use fg_core::{UsageEngine, UsagePolicy};

use crate::snapshot::SnapshotSource;

/// Engine whose three collaborators are one snapshot directory.
pub type SnapshotEngine<'a> =
    UsageEngine<&'a SnapshotSource, &'a SnapshotSource, &'a SnapshotSource>;

pub const fn snapshot_engine(source: &SnapshotSource, policy: UsagePolicy) -> SnapshotEngine<'_> {
    UsageEngine::new(source, source, source, policy)
}
