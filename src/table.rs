use serde_json::Value;

use crate::models::{Record, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Priority,
    Summary,
    Resolution,
    Assignee,
    Id,
    Milestone,
    Status,
}

pub const DEFAULT_COLUMNS: [Column; 7] = [
    Column::Priority,
    Column::Summary,
    Column::Resolution,
    Column::Assignee,
    Column::Id,
    Column::Milestone,
    Column::Status,
];

impl Column {
    /// The milestone column is titled by the caller.
    pub fn header(self, milestone_header: &str) -> &str {
        match self {
            Column::Priority => "Priority",
            Column::Summary => "Summary",
            Column::Resolution => "Resolution",
            Column::Assignee => "Assignee",
            Column::Id => "Bug Number",
            Column::Milestone => milestone_header,
            Column::Status => "Status",
        }
    }

    pub fn value(self, record: &Record) -> Value {
        match self {
            Column::Priority => Value::from(record.priority.as_str()),
            Column::Summary => Value::from(record.summary.as_str()),
            Column::Resolution => Value::from(record.resolution.as_str()),
            Column::Assignee => Value::from(record.assigned_to.as_str()),
            Column::Id => Value::from(record.id),
            Column::Milestone => Value::from(record.milestone.as_str()),
            Column::Status => Value::from(record.status.as_str()),
        }
    }
}

/// Newest records first.
pub fn project<'a, I>(records: I, columns: &[Column], milestone_header: &str) -> Table
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut selected: Vec<&Record> = records.into_iter().collect();
    selected.sort_by(|a, b| b.id.cmp(&a.id));

    Table {
        header: columns.iter().map(|c| c.header(milestone_header).to_string()).collect(),
        rows: selected
            .into_iter()
            .map(|record| columns.iter().map(|c| c.value(record)).collect())
            .collect(),
    }
}
