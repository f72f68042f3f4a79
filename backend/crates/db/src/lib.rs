pub mod integrations;
pub mod snapshots;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tally_common::error::{TallyError, TallyResult};

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> TallyResult<PgPool> {
    tracing::info!("connecting to database");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| TallyError::Database(e.to_string()))
}

/// Map a sqlx error, surfacing unique-key collisions as invariant violations.
///
/// `23505` is a unique violation; `42P10` means the `on conflict` target has no
/// matching unique index. Both indicate the snapshot key is not being enforced.
pub(crate) fn map_db_error(err: sqlx::Error) -> TallyError {
    if let Some(db_err) = err.as_database_error() {
        if matches!(db_err.code().as_deref(), Some("23505") | Some("42P10")) {
            return TallyError::InvariantViolation(db_err.message().to_string());
        }
    }
    TallyError::Database(err.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::create_pool;

    /// Connect to `TEST_DATABASE_URL` and apply the schema, or `None` when unset.
    pub async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = create_pool(&url).await.expect("db should connect");

        for migration in [
            include_str!("../../../migrations/0001_clients_integrations.sql"),
            include_str!("../../../migrations/0002_metrics_snapshots.sql"),
            include_str!("../../../migrations/0003_integration_sync_claim.sql"),
        ] {
            sqlx::raw_sql(migration)
                .execute(&pool)
                .await
                .expect("apply migration");
        }

        Some(pool)
    }

    pub async fn insert_client(pool: &PgPool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("insert into clients (id, name) values ($1, 'test-client')")
            .bind(id)
            .execute(pool)
            .await
            .expect("insert client");
        id
    }

    pub async fn insert_integration(
        pool: &PgPool,
        client_id: Uuid,
        platform: &str,
        sync_frequency: i32,
    ) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "insert into integrations (id, client_id, platform, sync_frequency)
             values ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(client_id)
        .bind(platform)
        .bind(sync_frequency)
        .execute(pool)
        .await
        .expect("insert integration");
        id
    }
}
