use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::ReportDocument;
use crate::store::SnapshotStore;

/// Key of the published report row.
pub const REPORT_KEY: &str = "data";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
    name: String,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            name: REPORT_KEY.to_string(),
        }
    }

    pub async fn published_at(&self) -> Result<Option<(Uuid, DateTime<Utc>)>> {
        let row = sqlx::query(
            "SELECT snapshot_id, generated_at FROM burndown.report_snapshots WHERE name = $1",
        )
        .bind(&self.name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some((row.try_get("snapshot_id")?, row.try_get("generated_at")?))),
            None => Ok(None),
        }
    }
}

impl SnapshotStore for PgSnapshotStore {
    async fn publish(&self, document: &ReportDocument) -> Result<Uuid> {
        let snapshot_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO burndown.report_snapshots (name, snapshot_id, generated_at, document)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET snapshot_id = EXCLUDED.snapshot_id,
                generated_at = EXCLUDED.generated_at,
                document = EXCLUDED.document
            "#,
        )
        .bind(&self.name)
        .bind(snapshot_id)
        .bind(document.generated_at)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;

        Ok(snapshot_id)
    }

    async fn fetch(&self) -> Result<Option<ReportDocument>> {
        let row = sqlx::query("SELECT document FROM burndown.report_snapshots WHERE name = $1")
            .bind(&self.name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(document): Json<ReportDocument> = row.try_get("document")?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM burndown.report_snapshots WHERE name = $1")
            .bind(&self.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
