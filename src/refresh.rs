use chrono::{NaiveDate, Utc};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::config::ReportConfig;
use crate::error::Result;
use crate::models::ReportDocument;
use crate::report::build_report;
use crate::source::{load_snapshot, RecordSource};
use crate::store::SnapshotStore;

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub snapshot_id: Uuid,
    pub record_count: usize,
    pub document: ReportDocument,
}

/// Fetches, rebuilds and publishes the report once.
///
/// Nothing is published when fetching fails, so readers keep the last good
/// report.
pub async fn run_cycle<S, T>(
    config: &ReportConfig,
    source: &S,
    store: &T,
    today: NaiveDate,
) -> Result<RefreshOutcome>
where
    S: RecordSource,
    T: SnapshotStore,
{
    tracing::info!(%today, "refreshing report");
    let snapshot = load_snapshot(source).await?;
    let record_count = snapshot.records.len();

    let document = build_report(config, &snapshot, today, Utc::now());
    let snapshot_id = store.publish(&document).await?;
    tracing::info!(%snapshot_id, record_count, views = document.stats.len(), "report published");

    Ok(RefreshOutcome {
        snapshot_id,
        record_count,
        document,
    })
}

/// Refreshes on a fixed interval until the process stops.
///
/// Cycles run back to back in this task, so a slow cycle delays the next
/// tick instead of overlapping it.
pub async fn schedule<S, T>(config: &ReportConfig, source: &S, store: &T)
where
    S: RecordSource,
    T: SnapshotStore,
{
    let mut ticker = tokio::time::interval(config.refresh.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let today = Utc::now().date_naive();
        if let Err(err) = run_cycle(config, source, store, today).await {
            tracing::warn!(error = %err, "refresh failed, keeping previous report");
        }
    }
}
