use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::db::OnsenLogRepository;
use crate::error::AppResult;
use crate::models::onsen_log::{NewOnsenLog, OnsenLog, OnsenLogPatch};

/// Size of the window every list, map and subscriber sees.
pub const RECENT_WINDOW: i64 = 100;

const FEED_CAPACITY: usize = 16;

/// Full replacement of the visible record set.
pub type Snapshot = Arc<Vec<OnsenLog>>;

/// Client for the onsen log collection with a live snapshot feed.
#[derive(Clone)]
pub struct RecordStore {
    repo: Arc<dyn OnsenLogRepository>,
    feed: broadcast::Sender<Snapshot>,
    /// Held across read-and-send so snapshots go out in read order.
    publish_lock: Arc<Mutex<()>>,
}

impl RecordStore {
    pub fn new(repo: Arc<dyn OnsenLogRepository>) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            repo,
            feed,
            publish_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create(&self, log: NewOnsenLog) -> AppResult<OnsenLog> {
        let created = self.repo.insert(&log).await?;
        tracing::info!(log_id = %created.id, onsen = %created.onsen_name, "Onsen log created");
        self.publish().await;
        Ok(created)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<OnsenLog>> {
        Ok(self.repo.find(id).await?)
    }

    /// Writes only the fields present in `patch`.
    pub async fn update(&self, id: Uuid, patch: &OnsenLogPatch) -> AppResult<Option<OnsenLog>> {
        let updated = self.repo.update(id, patch).await?;
        if updated.is_some() {
            tracing::info!(log_id = %id, "Onsen log updated");
            self.publish().await;
        }
        Ok(updated)
    }

    pub async fn recent(&self) -> AppResult<Vec<OnsenLog>> {
        Ok(self.repo.recent(RECENT_WINDOW).await?)
    }

    pub async fn ping(&self) -> AppResult<()> {
        Ok(self.repo.ping().await?)
    }

    /// Opens a live query. The first event is the current window.
    pub async fn subscribe(&self) -> AppResult<Subscription> {
        // Subscribe before reading so a write racing the read is not lost.
        let rx = self.feed.subscribe();
        let initial = Arc::new(self.recent().await?);
        Ok(Subscription {
            initial: Some(initial),
            rx,
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.feed.receiver_count()
    }

    async fn publish(&self) {
        if self.feed.receiver_count() == 0 {
            return;
        }
        let _guard = self.publish_lock.lock().await;
        match self.recent().await {
            Ok(logs) => {
                // Send only fails when every subscriber has gone away.
                let _ = self.feed.send(Arc::new(logs));
            }
            Err(e) => tracing::warn!(error = %e, "Could not refresh subscribers after write"),
        }
    }
}

/// Stream of full snapshots. Dropping it ends the live query.
pub struct Subscription {
    initial: Option<Snapshot>,
    rx: broadcast::Receiver<Snapshot>,
}

impl Subscription {
    /// Next snapshot, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        let mut latest = loop {
            match self.rx.recv().await {
                Ok(snapshot) => break snapshot,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        };
        // Each snapshot supersedes the previous one, so drain to the newest.
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => latest = snapshot,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return Some(latest),
            }
        }
    }
}
