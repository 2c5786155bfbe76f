use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder stored in place of a missing attribute.
pub const MISSING: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: u64,
    pub creation_time: DateTime<Utc>,
    pub status: String,
    pub resolution: String,
    pub priority: String,
    pub assigned_to: String,
    pub component: String,
    pub milestone: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    pub at: DateTime<Utc>,
    pub resolved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldChange {
    pub field_name: String,
    #[serde(default)]
    pub removed: String,
    #[serde(default)]
    pub added: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSet {
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub content_type: String,
    #[serde(default)]
    pub is_obsolete: bool,
}

/// Change log and attachments of one record, as supplied by the tracker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordActivity {
    #[serde(default)]
    pub history: Vec<ChangeSet>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub activity: BTreeMap<u64, RecordActivity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub resolved: u64,
    pub unresolved: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doughnut {
    pub labels: Vec<String>,
    pub data: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurndownLinks {
    pub all: String,
    pub unresolved: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Burndown {
    pub labels: Vec<String>,
    pub totals: Vec<Option<u64>>,
    pub unresolved: Vec<Option<u64>>,
    pub forecasted: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<BurndownLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsView {
    Count(u64),
    Doughnut(Doughnut),
    Burndown(Burndown),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    pub milestones: BTreeMap<String, Table>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub generated_at: DateTime<Utc>,
    pub stats: BTreeMap<String, StatsView>,
    pub tables: Tables,
}
