use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::onsen_log::{NewOnsenLog, OnsenLog, OnsenLogPatch};

/// Persistence seam for the `onsen_logs` collection.
#[async_trait]
pub trait OnsenLogRepository: Send + Sync {
    async fn insert(&self, log: &NewOnsenLog) -> Result<OnsenLog, sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<OnsenLog>, sqlx::Error>;

    /// Returns `None` when no record has this id.
    async fn update(&self, id: Uuid, patch: &OnsenLogPatch)
        -> Result<Option<OnsenLog>, sqlx::Error>;

    /// Newest first by `(date, created_at)`, at most `limit` rows.
    async fn recent(&self, limit: i64) -> Result<Vec<OnsenLog>, sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;
}

pub struct PgOnsenLogRepository {
    db: PgPool,
}

impl PgOnsenLogRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OnsenLogRepository for PgOnsenLogRepository {
    async fn insert(&self, log: &NewOnsenLog) -> Result<OnsenLog, sqlx::Error> {
        sqlx::query_as::<_, OnsenLog>(
            r#"
            INSERT INTO onsen_logs (id, date, onsen_name, sleep_score, memo, rating, lat, lng, photo_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(log.date)
        .bind(&log.onsen_name)
        .bind(log.sleep_score)
        .bind(&log.memo)
        .bind(log.rating)
        .bind(log.coordinates.map(|c| c.lat))
        .bind(log.coordinates.map(|c| c.lng))
        .bind(&log.photo_url)
        .fetch_one(&self.db)
        .await
    }

    async fn find(&self, id: Uuid) -> Result<Option<OnsenLog>, sqlx::Error> {
        sqlx::query_as::<_, OnsenLog>("SELECT * FROM onsen_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &OnsenLogPatch,
    ) -> Result<Option<OnsenLog>, sqlx::Error> {
        // Nullable columns carry a "touch" flag so NULL can mean "clear".
        let coordinates = patch.coordinates.flatten();

        sqlx::query_as::<_, OnsenLog>(
            r#"
            UPDATE onsen_logs SET
                date = COALESCE($2, date),
                onsen_name = COALESCE($3, onsen_name),
                sleep_score = COALESCE($4, sleep_score),
                rating = COALESCE($5, rating),
                memo = CASE WHEN $6::boolean THEN $7 ELSE memo END,
                lat = CASE WHEN $8::boolean THEN $9 ELSE lat END,
                lng = CASE WHEN $8::boolean THEN $10 ELSE lng END,
                photo_url = CASE WHEN $11::boolean THEN $12 ELSE photo_url END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.date)
        .bind(&patch.onsen_name)
        .bind(patch.sleep_score)
        .bind(patch.rating)
        .bind(patch.memo.is_some())
        .bind(patch.memo.clone().flatten())
        .bind(patch.coordinates.is_some())
        .bind(coordinates.map(|c| c.lat))
        .bind(coordinates.map(|c| c.lng))
        .bind(patch.photo_url.is_some())
        .bind(patch.photo_url.clone().flatten())
        .fetch_optional(&self.db)
        .await
    }

    async fn recent(&self, limit: i64) -> Result<Vec<OnsenLog>, sqlx::Error> {
        sqlx::query_as::<_, OnsenLog>(
            r#"
            SELECT * FROM onsen_logs
            ORDER BY date DESC, created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await
            .map(|_| ())
    }
}
