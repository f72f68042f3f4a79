//! Marketing metrics ingestion: platform adapters, sync windows, failure
//! classification and the integration scheduler.

pub mod adapter;
pub mod ads;
pub mod content;
pub mod ecommerce;
pub mod email;
pub mod error;
pub mod http;
pub mod normalize;
pub mod progress;
pub mod scheduler;
pub mod window;

use std::sync::Arc;

use sqlx::PgPool;
use tally_common::error::{TallyError, TallyResult};
use tally_db::integrations::pg_repository::PgIntegrationRepository;
use tally_db::snapshots::pg_repository::PgSnapshotRepository;

use crate::adapter::AdapterRegistry;
use crate::http::{UpstreamClient, UpstreamConfig};
use crate::scheduler::{IntegrationScheduler, SchedulerConfig};

pub use crate::error::SyncError;
pub use crate::scheduler::{CycleSummary, SyncOutcome};
pub use crate::window::SyncWindow;

/// Scheduler backed by Postgres repositories and the standard adapters,
/// configured from the environment.
pub fn build_scheduler(pool: PgPool) -> TallyResult<IntegrationScheduler> {
    let scheduler_config = SchedulerConfig::from_env()?;
    let upstream_config = UpstreamConfig::from_env()?;
    let client = UpstreamClient::new(upstream_config)
        .map_err(|e| TallyError::Config(format!("failed to build HTTP client: {e}")))?;

    Ok(IntegrationScheduler::new(
        Arc::new(PgIntegrationRepository::new(pool.clone())),
        Arc::new(PgSnapshotRepository::new(pool)),
        AdapterRegistry::standard(client),
        scheduler_config,
    ))
}
