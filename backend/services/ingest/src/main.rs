use anyhow::Context;
use tally_config::{init_tracing, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let config = AppConfig::from_env().context("failed to load configuration")?;

    tracing::info!(service = "tally-ingest", "starting single sync cycle");

    let pool = tally_db::create_pool(&config.database_url)
        .await
        .context("failed to connect to database")?;
    let scheduler = tally_ingest::build_scheduler(pool).context("failed to build scheduler")?;

    let summary = scheduler.run_cycle().await.context("sync cycle failed")?;
    tracing::info!(
        checked = summary.integrations_checked,
        synced = summary.synced,
        skipped = summary.skipped,
        failed = summary.failed,
        "tally-ingest finished"
    );

    Ok(())
}
