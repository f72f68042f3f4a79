use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::map_db_error;
use crate::snapshots::models::{MetricsSnapshot, SnapshotDeleteFilter, SnapshotFilter};
use crate::snapshots::repositories::SnapshotRepository;
use tally_common::error::{TallyError, TallyResult};
use tally_common::types::Platform;

const UPSERT_SNAPSHOT_SQL: &str = "insert into metrics_snapshots
     (id, client_id, integration_id, platform, metric_type, date, metrics, created_at)
     values ($1, $2, $3, $4, $5, $6, $7, $8)
     on conflict (client_id, integration_id, platform, metric_type, date)
     do update set
       metrics = excluded.metrics,
       created_at = excluded.created_at
     returning id, client_id, integration_id, platform, metric_type, date, metrics, created_at";

#[derive(Clone)]
pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn upsert_query(snapshot: &MetricsSnapshot) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(UPSERT_SNAPSHOT_SQL)
        .bind(snapshot.id)
        .bind(snapshot.client_id)
        .bind(snapshot.integration_id)
        .bind(snapshot.platform.as_str())
        .bind(&snapshot.metric_type)
        .bind(snapshot.date)
        .bind(&snapshot.metrics)
        .bind(snapshot.created_at)
}

fn map_snapshot_row(row: &PgRow) -> TallyResult<MetricsSnapshot> {
    let platform: String = row.get("platform");
    let platform: Platform = platform
        .parse()
        .map_err(|e: TallyError| TallyError::Database(e.to_string()))?;

    Ok(MetricsSnapshot {
        id: row.get("id"),
        client_id: row.get("client_id"),
        integration_id: row.get("integration_id"),
        platform,
        metric_type: row.get("metric_type"),
        date: row.get("date"),
        metrics: row.get("metrics"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn upsert(&self, snapshot: MetricsSnapshot) -> TallyResult<MetricsSnapshot> {
        let row = upsert_query(&snapshot)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        map_snapshot_row(&row)
    }

    async fn bulk_upsert(&self, snapshots: Vec<MetricsSnapshot>) -> TallyResult<usize> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        for snapshot in &snapshots {
            upsert_query(snapshot)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        tracing::debug!(count = snapshots.len(), "snapshots upserted");
        Ok(snapshots.len())
    }

    async fn delete_range(&self, filter: SnapshotDeleteFilter) -> TallyResult<u64> {
        filter.validate()?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "delete from metrics_snapshots where client_id = ",
        );
        qb.push_bind(filter.client_id);
        qb.push(" and date >= ").push_bind(filter.date_from);
        qb.push(" and date <= ").push_bind(filter.date_to);

        if let Some(integration_id) = filter.integration_id {
            qb.push(" and integration_id = ").push_bind(integration_id);
        }
        if let Some(platform) = filter.platform {
            qb.push(" and platform = ").push_bind(platform.as_str());
        }

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        tracing::info!(
            client_id = %filter.client_id,
            date_from = %filter.date_from,
            date_to = %filter.date_to,
            deleted = result.rows_affected(),
            "snapshot range deleted"
        );
        Ok(result.rows_affected())
    }

    async fn list(&self, filter: SnapshotFilter) -> TallyResult<Vec<MetricsSnapshot>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "select id, client_id, integration_id, platform, metric_type, date, metrics, created_at \
             from metrics_snapshots where 1=1",
        );

        if let Some(client_id) = filter.client_id {
            qb.push(" and client_id = ").push_bind(client_id);
        }
        if let Some(integration_id) = filter.integration_id {
            qb.push(" and integration_id = ").push_bind(integration_id);
        }
        if let Some(platform) = filter.platform {
            qb.push(" and platform = ").push_bind(platform.as_str());
        }
        if let Some(metric_type) = filter.metric_type {
            qb.push(" and metric_type = ").push_bind(metric_type);
        }
        if let Some(from) = filter.date_from {
            qb.push(" and date >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            qb.push(" and date <= ").push_bind(to);
        }

        qb.push(" order by date desc, metric_type asc");
        qb.push(" limit ").push_bind(filter.limit.unwrap_or(100));
        qb.push(" offset ").push_bind(filter.offset.unwrap_or(0));

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.iter().map(map_snapshot_row).collect()
    }
}
