use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed records file: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record {id}: invalid creation time {value:?}")]
    Timestamp { id: u64, value: String },
    #[error("snapshot store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("no report published after waiting {waited:?}")]
    NotReady { waited: Duration },
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
