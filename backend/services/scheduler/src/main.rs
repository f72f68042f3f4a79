use std::time::Duration;

use anyhow::Context;
use tally_config::{init_tracing, parse_var_or, AppConfig};
use tokio::time::MissedTickBehavior;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let config = AppConfig::from_env().context("failed to load configuration")?;
    let poll_secs: u64 = parse_var_or("SYNC_POLL_INTERVAL_SECS", 300)?;
    if poll_secs == 0 {
        anyhow::bail!("SYNC_POLL_INTERVAL_SECS must be at least 1");
    }

    tracing::info!(service = "tally-scheduler", poll_secs, "starting");

    let pool = tally_db::create_pool(&config.database_url)
        .await
        .context("failed to connect to database")?;
    let scheduler = tally_ingest::build_scheduler(pool).context("failed to build scheduler")?;

    let mut ticker = tokio::time::interval(Duration::from_secs(poll_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Cycle errors (e.g. the integration listing failed) are retried next tick
                if let Err(e) = scheduler.run_cycle().await {
                    tracing::error!(error = %e, "sync cycle failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
