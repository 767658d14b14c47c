//! In-process repository used by tests in place of Postgres.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::OnsenLogRepository;
use crate::models::onsen_log::{NewOnsenLog, OnsenLog, OnsenLogPatch};

#[derive(Default)]
pub struct MemoryOnsenLogRepository {
    rows: Mutex<Vec<OnsenLog>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryOnsenLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert/update fail as if the store were down.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of write attempts, successful or not.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn all(&self) -> Vec<OnsenLog> {
        self.rows.lock().await.clone()
    }

    fn check_writable(&self) -> Result<(), sqlx::Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

#[async_trait]
impl OnsenLogRepository for MemoryOnsenLogRepository {
    async fn insert(&self, log: &NewOnsenLog) -> Result<OnsenLog, sqlx::Error> {
        self.check_writable()?;
        let now = Utc::now();
        let row = OnsenLog {
            id: Uuid::new_v4(),
            date: log.date,
            onsen_name: log.onsen_name.clone(),
            sleep_score: log.sleep_score,
            memo: log.memo.clone(),
            rating: log.rating,
            lat: log.coordinates.map(|c| c.lat),
            lng: log.coordinates.map(|c| c.lng),
            photo_url: log.photo_url.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().await.push(row.clone());
        Ok(row)
    }

    async fn find(&self, id: Uuid) -> Result<Option<OnsenLog>, sqlx::Error> {
        Ok(self.rows.lock().await.iter().find(|r| r.id == id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &OnsenLogPatch,
    ) -> Result<Option<OnsenLog>, sqlx::Error> {
        self.check_writable()?;
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        apply_patch(patch, row);
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn recent(&self, limit: i64) -> Result<Vec<OnsenLog>, sqlx::Error> {
        let mut rows = self.rows.lock().await.clone();
        rows.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

fn apply_patch(patch: &OnsenLogPatch, log: &mut OnsenLog) {
    if let Some(date) = patch.date {
        log.date = date;
    }
    if let Some(name) = &patch.onsen_name {
        log.onsen_name = name.clone();
    }
    if let Some(score) = patch.sleep_score {
        log.sleep_score = score;
    }
    if let Some(rating) = patch.rating {
        log.rating = rating;
    }
    if let Some(memo) = &patch.memo {
        log.memo = memo.clone();
    }
    if let Some(coordinates) = patch.coordinates {
        log.lat = coordinates.map(|c| c.lat);
        log.lng = coordinates.map(|c| c.lng);
    }
    if let Some(photo_url) = &patch.photo_url {
        log.photo_url = photo_url.clone();
    }
}
