use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ReportError, Result};
use crate::models::{Record, RecordActivity, Snapshot, MISSING};

/// Upstream tracker data: the record set and, per record, its activity.
pub trait RecordSource {
    async fn fetch_records(&self) -> Result<Vec<Record>>;

    async fn fetch_activity(&self, ids: &[u64]) -> Result<BTreeMap<u64, RecordActivity>>;
}

pub async fn load_snapshot<S: RecordSource>(source: &S) -> Result<Snapshot> {
    let records = source.fetch_records().await?;
    let ids: Vec<u64> = records.iter().map(|record| record.id).collect();
    let activity = source.fetch_activity(&ids).await?;
    Ok(Snapshot { records, activity })
}

/// A tracker export on disk: `records.csv` plus an optional `activity.json`.
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    root: PathBuf,
    milestone_sentinel: String,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    id: u64,
    creation_time: String,
    status: Option<String>,
    resolution: Option<String>,
    priority: Option<String>,
    assigned_to: Option<String>,
    component: Option<String>,
    milestone: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivityEntry {
    id: u64,
    #[serde(flatten)]
    activity: RecordActivity,
}

fn or_missing(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => MISSING.to_string(),
    }
}

impl CsvRow {
    fn into_record(self) -> Result<Record> {
        let creation_time = DateTime::parse_from_rfc3339(self.creation_time.trim())
            .map_err(|_| ReportError::Timestamp {
                id: self.id,
                value: self.creation_time.clone(),
            })?
            .with_timezone(&Utc);

        Ok(Record {
            id: self.id,
            creation_time,
            status: or_missing(self.status),
            resolution: or_missing(self.resolution),
            priority: or_missing(self.priority),
            assigned_to: or_missing(self.assigned_to),
            component: or_missing(self.component),
            milestone: or_missing(self.milestone),
            summary: or_missing(self.summary),
        })
    }
}

impl SnapshotDir {
    pub fn new(root: impl Into<PathBuf>, milestone_sentinel: &str) -> Self {
        Self {
            root: root.into(),
            milestone_sentinel: milestone_sentinel.to_string(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl RecordSource for SnapshotDir {
    async fn fetch_records(&self) -> Result<Vec<Record>> {
        let path = self.path("records.csv");
        let raw = Self::read(&path)?;
        let mut reader = csv::Reader::from_reader(raw.as_bytes());
        let mut records = Vec::new();

        for row in reader.deserialize::<CsvRow>() {
            let record = row?.into_record()?;
            if record.milestone == self.milestone_sentinel {
                continue;
            }
            records.push(record);
        }

        Ok(records)
    }

    async fn fetch_activity(&self, ids: &[u64]) -> Result<BTreeMap<u64, RecordActivity>> {
        let path = self.path("activity.json");
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no activity file, records keep creation history only");
            return Ok(BTreeMap::new());
        }

        let entries: Vec<ActivityEntry> = serde_json::from_str(&Self::read(&path)?)?;
        let wanted: HashSet<u64> = ids.iter().copied().collect();
        let mut activity = BTreeMap::new();
        for entry in entries {
            if wanted.contains(&entry.id) {
                activity.insert(entry.id, entry.activity);
            }
        }
        Ok(activity)
    }
}
