use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::integrations::models::Integration;
use crate::integrations::repositories::IntegrationRepository;
use tally_common::error::{TallyError, TallyResult};

const INTEGRATION_COLUMNS: &str = "id, client_id, platform, credentials, config, status, \
     last_sync_at, sync_frequency, error_message, sync_started_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgIntegrationRepository {
    pool: PgPool,
}

impl PgIntegrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: sqlx::postgres::PgRow) -> TallyResult<Integration> {
        let status: String = row.get("status");
        Ok(Integration {
            id: row.get("id"),
            client_id: row.get("client_id"),
            platform: row.get("platform"),
            credentials: row.get("credentials"),
            config: row.get("config"),
            status: status.parse()?,
            last_sync_at: row.get("last_sync_at"),
            sync_frequency: row.get("sync_frequency"),
            error_message: row.get("error_message"),
            sync_started_at: row.get("sync_started_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl IntegrationRepository for PgIntegrationRepository {
    async fn list_all(&self) -> TallyResult<Vec<Integration>> {
        let rows = sqlx::query(&format!(
            "select {INTEGRATION_COLUMNS} from integrations
             order by last_sync_at asc nulls first, created_at asc"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TallyError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_row).collect()
    }

    async fn get_by_id(&self, id: Uuid) -> TallyResult<Option<Integration>> {
        let row = sqlx::query(&format!(
            "select {INTEGRATION_COLUMNS} from integrations where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TallyError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    async fn try_claim(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> TallyResult<Option<Integration>> {
        let row = sqlx::query(&format!(
            "update integrations
             set sync_started_at = $1, updated_at = now()
             where id = $2 and (sync_started_at is null or sync_started_at < $3)
             returning {INTEGRATION_COLUMNS}"
        ))
        .bind(now)
        .bind(id)
        .bind(now - lease)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TallyError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    async fn release_claim(&self, id: Uuid) -> TallyResult<()> {
        sqlx::query("update integrations set sync_started_at = null where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TallyError::Database(e.to_string()))?;
        Ok(())
    }

    async fn mark_synced(&self, id: Uuid, synced_at: DateTime<Utc>) -> TallyResult<Integration> {
        let row = sqlx::query(&format!(
            "update integrations
             set status = 'active', last_sync_at = $1, error_message = null,
                 sync_started_at = null, updated_at = now()
             where id = $2
             returning {INTEGRATION_COLUMNS}"
        ))
        .bind(synced_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TallyError::Database(e.to_string()))?
        .ok_or_else(|| TallyError::NotFound(format!("integration not found: {id}")))?;

        Self::map_row(row)
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> TallyResult<Integration> {
        let row = sqlx::query(&format!(
            "update integrations
             set status = 'error', error_message = $1, sync_started_at = null,
                 updated_at = now()
             where id = $2
             returning {INTEGRATION_COLUMNS}"
        ))
        .bind(error_message)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TallyError::Database(e.to_string()))?
        .ok_or_else(|| TallyError::NotFound(format!("integration not found: {id}")))?;

        Self::map_row(row)
    }
}
