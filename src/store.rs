use std::time::Duration;

use uuid::Uuid;

use crate::error::{ReportError, Result};
use crate::models::ReportDocument;

/// Holds the latest published report. Publishing replaces it wholesale.
pub trait SnapshotStore {
    async fn publish(&self, document: &ReportDocument) -> Result<Uuid>;

    async fn fetch(&self) -> Result<Option<ReportDocument>>;

    async fn clear(&self) -> Result<()>;
}


pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

/// Polls the store until a report has been published.
///
/// Gives up with [`ReportError::NotReady`] once the accumulated sleep
/// reaches `max_wait`.
pub async fn wait_for_document<S, T>(
    store: &S,
    policy: WaitPolicy,
    sleeper: &T,
) -> Result<ReportDocument>
where
    S: SnapshotStore,
    T: Sleeper,
{
    let mut waited = Duration::ZERO;
    loop {
        if let Some(document) = store.fetch().await? {
            return Ok(document);
        }
        if waited >= policy.max_wait {
            return Err(ReportError::NotReady { waited });
        }
        tracing::debug!(?waited, "report not published yet");
        sleeper.sleep(policy.poll_interval).await;
        waited += policy.poll_interval;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};

    use super::*;
    use super::memory::MemoryStore;
    use crate::models::{StatsView, Tables};

    fn document(count: u64) -> ReportDocument {
        let mut stats = BTreeMap::new();
        stats.insert("totalMilestones".to_string(), StatsView::Count(count));
        ReportDocument {
            generated_at: Utc.with_ymd_and_hms(2019, 7, 1, 12, 0, 0).unwrap(),
            stats,
            tables: Tables::default(),
        }
    }

    /// Publishes into the store after a fixed number of naps.
    struct PublishingSleeper<'a> {
        store: &'a MemoryStore,
        naps: AtomicUsize,
        publish_after: usize,
    }

    impl Sleeper for PublishingSleeper<'_> {
        async fn sleep(&self, _duration: Duration) {
            let naps = self.naps.fetch_add(1, Ordering::SeqCst) + 1;
            if naps == self.publish_after {
                self.store.publish(&document(3)).await.unwrap();
            }
        }
    }

    fn policy(max_wait_ms: u64) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_millis(max_wait_ms),
        }
    }

    #[tokio::test]
    async fn publish_replaces_previous_document() {
        let store = MemoryStore::default();
        assert_eq!(store.fetch().await.unwrap(), None);

        let first = store.publish(&document(1)).await.unwrap();
        let second = store.publish(&document(2)).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.fetch().await.unwrap(), Some(document(2)));

        store.clear().await.unwrap();
        assert_eq!(store.fetch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn returns_immediately_when_published() {
        let store = MemoryStore::default();
        store.publish(&document(1)).await.unwrap();
        let sleeper = PublishingSleeper {
            store: &store,
            naps: AtomicUsize::new(0),
            publish_after: usize::MAX,
        };

        let found = wait_for_document(&store, policy(1_000), &sleeper).await.unwrap();
        assert_eq!(found, document(1));
        assert_eq!(sleeper.naps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn waits_until_first_publish() {
        let store = MemoryStore::default();
        let sleeper = PublishingSleeper {
            store: &store,
            naps: AtomicUsize::new(0),
            publish_after: 4,
        };

        let found = wait_for_document(&store, policy(1_000), &sleeper).await.unwrap();
        assert_eq!(found, document(3));
        assert_eq!(sleeper.naps.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gives_up_after_max_wait() {
        let store = MemoryStore::default();
        let sleeper = PublishingSleeper {
            store: &store,
            naps: AtomicUsize::new(0),
            publish_after: usize::MAX,
        };

        let err = wait_for_document(&store, policy(500), &sleeper)
            .await
            .unwrap_err();
        match err {
            ReportError::NotReady { waited } => assert_eq!(waited, Duration::from_millis(500)),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sleeper.naps.load(Ordering::SeqCst), 5);
    }
}
