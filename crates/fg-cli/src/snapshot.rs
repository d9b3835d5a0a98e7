//! File-backed collaborators.
//!
//! A snapshot directory holds data exported from a device:
//!
//! - `events.jsonl`: one transition event per line
//! - `aggregates.jsonl`: one aggregate counter row per line
//! - `packages.json`: installed package facts
//!
//! Missing files mean "no data". Events and aggregates are re-read on every
//! query so that each engine call sees the directory as it is now.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use fg_core::{AggregateRow, AggregateSource, AppId, Event, EventSource, PackageMetadata, SourceError};

pub const EVENTS_FILE: &str = "events.jsonl";
pub const AGGREGATES_FILE: &str = "aggregates.jsonl";
pub const PACKAGES_FILE: &str = "packages.json";

/// Bucketing of an aggregate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Fine,
}

/// One line of `aggregates.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub app: AppId,
    pub duration_ms: i64,
    pub bucket_start_ms: i64,
    pub bucket_end_ms: i64,
    #[serde(default = "default_granularity")]
    pub granularity: Granularity,
}

const fn default_granularity() -> Granularity {
    Granularity::Daily
}

impl AggregateRecord {
    const fn overlaps(&self, start_ms: i64, end_ms: i64) -> bool {
        self.bucket_start_ms < end_ms && self.bucket_end_ms > start_ms
    }
}

/// One entry of `packages.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub app: AppId,
    #[serde(default)]
    pub launcher: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Event, aggregate and package collaborator backed by a snapshot directory.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    dir: PathBuf,
    packages: HashMap<AppId, PackageRecord>,
}

impl SnapshotSource {
    /// Opens a snapshot directory and loads its package list.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let dir = dir.into();
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "snapshot directory does not exist");
        }

        let packages = match read_file(&dir.join(PACKAGES_FILE))? {
            Some(content) => serde_json::from_str::<Vec<PackageRecord>>(&content)
                .map_err(|e| SourceError::Malformed {
                    line: e.line(),
                    reason: e.to_string(),
                })?
                .into_iter()
                .map(|package| (package.app.clone(), package))
                .collect(),
            None => HashMap::new(),
        };
        tracing::debug!(dir = %dir.display(), packages = packages.len(), "snapshot opened");

        Ok(Self { dir, packages })
    }

    fn aggregate_rows(
        &self,
        granularity: Granularity,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<AggregateRow>, SourceError> {
        let records: Vec<AggregateRecord> = read_lines(&self.dir.join(AGGREGATES_FILE))?;
        Ok(records
            .into_iter()
            .filter(|r| r.granularity == granularity && r.overlaps(start_ms, end_ms))
            .map(|r| AggregateRow::new(r.app, r.duration_ms))
            .collect())
    }
}

impl EventSource for SnapshotSource {
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<Event>, SourceError> {
        let mut events: Vec<Event> = read_lines(&self.dir.join(EVENTS_FILE))?;
        events.retain(|e| e.timestamp_ms >= start_ms && e.timestamp_ms < end_ms);
        events.sort_by_key(|e| e.timestamp_ms);
        Ok(events)
    }
}

impl AggregateSource for SnapshotSource {
    fn query_aggregate(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<AggregateRow>, SourceError> {
        self.aggregate_rows(Granularity::Daily, start_ms, end_ms)
    }

    fn query_aggregate_fine(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<AggregateRow>, SourceError> {
        self.aggregate_rows(Granularity::Fine, start_ms, end_ms)
    }
}

impl PackageMetadata for SnapshotSource {
    fn has_launcher_entry(&self, app: &AppId) -> bool {
        self.packages.get(app).is_some_and(|p| p.launcher)
    }

    fn is_system_package(&self, app: &AppId) -> bool {
        self.packages.get(app).is_some_and(|p| p.system)
    }

    fn display_name(&self, app: &AppId) -> Option<String> {
        self.packages.get(app).and_then(|p| p.label.clone())
    }
}

/// Reads a whole file, treating a missing file as `None`.
fn read_file(path: &Path) -> Result<Option<String>, SourceError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "snapshot file missing");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Parses a JSON Lines file. Blank lines are skipped; line numbers in errors
/// are 1-based.
fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
    let Some(content) = read_file(path)? else {
        return Ok(Vec::new());
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| SourceError::Malformed {
                line: idx + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn app(id: &str) -> AppId {
        AppId::new(id).unwrap()
    }

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn missing_files_mean_no_data() {
        let dir = TempDir::new().unwrap();
        let source = SnapshotSource::open(dir.path()).unwrap();

        assert!(source.query_events(0, i64::MAX).unwrap().is_empty());
        assert!(source.query_aggregate(0, i64::MAX).unwrap().is_empty());
        assert!(!source.has_launcher_entry(&app("com.x")));
        assert_eq!(source.display_name(&app("com.x")), None);
    }

    #[test]
    fn events_are_filtered_to_window() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            EVENTS_FILE,
            r#"{"timestamp_ms":500,"type":"foreground_entered","app":"com.x"}

{"timestamp_ms":100,"type":"screen_on"}
{"timestamp_ms":1000,"type":"background_entered","app":"com.x"}
"#,
        );
        let source = SnapshotSource::open(dir.path()).unwrap();

        let events = source.query_events(100, 1000).unwrap();

        assert_eq!(
            events,
            vec![Event::screen_on(100), Event::foreground(app("com.x"), 500)]
        );
    }

    #[test]
    fn malformed_event_line_is_reported() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            EVENTS_FILE,
            "{\"timestamp_ms\":1,\"type\":\"screen_on\"}\n{\"timestamp_ms\":2,\"type\":\"teleported\"}\n",
        );
        let source = SnapshotSource::open(dir.path()).unwrap();

        let err = source.query_events(0, 10).unwrap_err();

        assert!(matches!(err, SourceError::Malformed { line: 2, .. }));
    }

    #[test]
    fn aggregates_split_by_granularity_and_bucket() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            AGGREGATES_FILE,
            r#"{"app":"com.y","duration_ms":500000,"bucket_start_ms":0,"bucket_end_ms":86400000}
{"app":"com.y","duration_ms":300000,"bucket_start_ms":0,"bucket_end_ms":86400000,"granularity":"daily"}
{"app":"com.y","duration_ms":7000,"bucket_start_ms":0,"bucket_end_ms":3600000,"granularity":"fine"}
{"app":"com.old","duration_ms":9000,"bucket_start_ms":-86400000,"bucket_end_ms":0}
"#,
        );
        let source = SnapshotSource::open(dir.path()).unwrap();

        let daily = source.query_aggregate(1000, 2000).unwrap();
        let fine = source.query_aggregate_fine(1000, 2000).unwrap();

        assert_eq!(
            daily,
            vec![
                AggregateRow::new(app("com.y"), 500_000),
                AggregateRow::new(app("com.y"), 300_000),
            ]
        );
        assert_eq!(fine, vec![AggregateRow::new(app("com.y"), 7_000)]);
    }

    #[test]
    fn packages_provide_metadata() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            PACKAGES_FILE,
            r#"[
  {"app": "com.x", "launcher": true, "label": "Example"},
  {"app": "com.vendor.daemon", "system": true}
]"#,
        );
        let source = SnapshotSource::open(dir.path()).unwrap();

        assert!(source.has_launcher_entry(&app("com.x")));
        assert!(!source.is_system_package(&app("com.x")));
        assert_eq!(source.display_name(&app("com.x")).as_deref(), Some("Example"));
        assert!(!source.has_launcher_entry(&app("com.vendor.daemon")));
        assert!(source.is_system_package(&app("com.vendor.daemon")));
    }

    #[test]
    fn malformed_packages_fail_to_open() {
        let dir = TempDir::new().unwrap();
        write(&dir, PACKAGES_FILE, r#"[{"app": ""}]"#);

        assert!(matches!(
            SnapshotSource::open(dir.path()),
            Err(SourceError::Malformed { line: 1, .. })
        ));
    }
}
