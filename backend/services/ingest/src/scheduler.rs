use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_common::error::{TallyError, TallyResult};
use tally_common::types::Platform;
use tally_config::parse_var_or;
use tally_db::integrations::models::Integration;
use tally_db::integrations::repositories::IntegrationRepository;
use tally_db::snapshots::models::MetricsSnapshot;
use tally_db::snapshots::repositories::SnapshotRepository;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::adapter::{AdapterRegistry, FetchOutcome, FetchRequest, PlatformAdapter};
use crate::error::{classify, FailureAction, SyncError};
use crate::progress::{BackfillTracker, ProgressHandle};
use crate::window::{ResolvedWindow, SyncWindow};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrency: usize,
    /// Bound on one whole adapter fetch, all pages included.
    pub fetch_timeout: Duration,
    /// How long a sync claim holds before another process may take it over.
    /// Must exceed `fetch_timeout`.
    pub claim_lease: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            fetch_timeout: Duration::from_secs(300),
            claim_lease: Duration::from_secs(600),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> TallyResult<Self> {
        let defaults = Self::default();
        let max_concurrency = parse_var_or("SYNC_MAX_CONCURRENCY", defaults.max_concurrency)?;
        if max_concurrency == 0 {
            return Err(TallyError::Config(
                "SYNC_MAX_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        let fetch_timeout_secs =
            parse_var_or("SYNC_FETCH_TIMEOUT_SECS", defaults.fetch_timeout.as_secs())?;
        let claim_lease_secs =
            parse_var_or("SYNC_CLAIM_LEASE_SECS", defaults.claim_lease.as_secs())?;
        if claim_lease_secs <= fetch_timeout_secs {
            return Err(TallyError::Config(
                "SYNC_CLAIM_LEASE_SECS must exceed SYNC_FETCH_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(Self {
            max_concurrency,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            claim_lease: Duration::from_secs(claim_lease_secs),
        })
    }
}

/// Result of one scheduling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub integrations_checked: usize,
    pub synced: usize,
    /// Not due, inactive, or already being synced.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Synced { snapshots_written: usize },
    /// The platform had no data for the window; the integration still counts as synced.
    Empty,
    AlreadyRunning,
}

/// Whether `integration` should be synced at `now`.
pub fn is_due(integration: &Integration, now: DateTime<Utc>) -> bool {
    if !integration.is_pollable() {
        return false;
    }
    match integration.last_sync_at {
        None => true,
        Some(last) => {
            now - last >= chrono::Duration::minutes(i64::from(integration.sync_frequency))
        }
    }
}

/// Integrations with a sync in progress in this process.
///
/// Checked before the store-level claim so local contention never reaches the database.
#[derive(Default)]
struct InFlight {
    ids: Mutex<HashSet<Uuid>>,
}

impl InFlight {
    fn try_acquire(self: &Arc<Self>, id: Uuid) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        if !ids.insert(id) {
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(self),
            id,
        })
    }
}

struct InFlightGuard {
    set: Arc<InFlight>,
    id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut ids = self.set.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.remove(&self.id);
    }
}

/// Decides which integrations are due, runs their adapters and records
/// snapshots plus integration health.
#[derive(Clone)]
pub struct IntegrationScheduler {
    integrations: Arc<dyn IntegrationRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    adapters: Arc<AdapterRegistry>,
    config: SchedulerConfig,
    in_flight: Arc<InFlight>,
    backfills: BackfillTracker,
}

impl IntegrationScheduler {
    pub fn new(
        integrations: Arc<dyn IntegrationRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        adapters: AdapterRegistry,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            integrations,
            snapshots,
            adapters: Arc::new(adapters),
            config,
            in_flight: Arc::new(InFlight::default()),
            backfills: BackfillTracker::new(),
        }
    }

    /// Progress of backfills currently running through this scheduler.
    pub fn backfills(&self) -> &BackfillTracker {
        &self.backfills
    }

    pub async fn run_cycle(&self) -> Result<CycleSummary, SyncError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one scheduling cycle as of `now`.
    ///
    /// Per-integration failures are recorded on the integration and counted;
    /// only a failure to list integrations fails the cycle.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleSummary, SyncError> {
        let integrations = self.integrations.list_all().await?;
        let mut summary = CycleSummary {
            integrations_checked: integrations.len(),
            ..CycleSummary::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();

        for integration in integrations {
            if !is_due(&integration, now) {
                summary.skipped += 1;
                continue;
            }

            let scheduler = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::Internal(e.to_string()))?;
                scheduler
                    .sync_integration_at(&integration, SyncWindow::Incremental, now)
                    .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(SyncOutcome::Synced { .. } | SyncOutcome::Empty)) => summary.synced += 1,
                Ok(Ok(SyncOutcome::AlreadyRunning)) => summary.skipped += 1,
                Ok(Err(_)) => summary.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "sync task aborted");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            checked = summary.integrations_checked,
            synced = summary.synced,
            skipped = summary.skipped,
            failed = summary.failed,
            "sync cycle completed"
        );

        Ok(summary)
    }

    /// Sync one integration now with an explicit window, regardless of due-ness.
    pub async fn sync_by_id(&self, id: Uuid, window: SyncWindow) -> Result<SyncOutcome, SyncError> {
        let integration = self
            .integrations
            .get_by_id(id)
            .await?
            .ok_or(SyncError::IntegrationNotFound(id))?;

        if !integration.is_pollable() {
            return Err(SyncError::IntegrationInactive(id));
        }

        self.sync_integration_at(&integration, window, Utc::now())
            .await
    }

    pub async fn sync_integration_at(
        &self,
        integration: &Integration,
        window: SyncWindow,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        let (platform, adapter) = match self.resolve_adapter(integration) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(
                    integration_id = %integration.id,
                    platform = %integration.platform,
                    error = %err,
                    "rejecting sync"
                );
                return Err(err);
            }
        };
        let resolved = window.resolve(now.date_naive())?;

        let Some(_guard) = self.in_flight.try_acquire(integration.id) else {
            tracing::info!(
                integration_id = %integration.id,
                %platform,
                "sync already running, skipping"
            );
            return Ok(SyncOutcome::AlreadyRunning);
        };

        let lease = chrono::Duration::from_std(self.config.claim_lease)
            .map_err(|e| SyncError::Internal(format!("invalid claim lease: {e}")))?;
        if self.integrations.try_claim(integration.id, now, lease).await?.is_none() {
            tracing::info!(
                integration_id = %integration.id,
                %platform,
                "sync claimed by another process, skipping"
            );
            return Ok(SyncOutcome::AlreadyRunning);
        }

        let result = self
            .fetch_and_store(integration, platform, adapter.as_ref(), resolved)
            .await;

        self.record_outcome(integration, platform, result, now).await
    }

    fn resolve_adapter(
        &self,
        integration: &Integration,
    ) -> Result<(Platform, Arc<dyn PlatformAdapter>), SyncError> {
        let unknown = || SyncError::UnknownPlatform(integration.platform.clone());
        let platform: Platform = integration.platform.parse().map_err(|_| unknown())?;
        let adapter = self.adapters.get(platform).ok_or_else(unknown)?;
        Ok((platform, adapter))
    }

    async fn fetch_and_store(
        &self,
        integration: &Integration,
        platform: Platform,
        adapter: &dyn PlatformAdapter,
        window: ResolvedWindow,
    ) -> Result<SyncOutcome, SyncError> {
        let progress = if window.is_aggregate() {
            self.backfills
                .start(integration.id, platform, window.from, window.to)
        } else {
            ProgressHandle::disabled()
        };

        let request = FetchRequest {
            credentials: &integration.credentials,
            config: &integration.config,
            window,
            progress: &progress,
        };

        let outcome = tokio::time::timeout(self.config.fetch_timeout, adapter.fetch(request))
            .await
            .map_err(|_| SyncError::Timeout(self.config.fetch_timeout))??;

        let drafts = match outcome {
            FetchOutcome::Empty => return Ok(SyncOutcome::Empty),
            FetchOutcome::Metrics(drafts) => drafts,
        };

        let snapshots: Vec<MetricsSnapshot> = drafts
            .into_iter()
            .map(|d| {
                MetricsSnapshot::new(
                    integration.client_id,
                    integration.id,
                    platform,
                    d.metric_type,
                    d.date,
                    d.metrics,
                )
            })
            .collect();

        let snapshots_written = self.snapshots.bulk_upsert(snapshots).await?;
        Ok(SyncOutcome::Synced { snapshots_written })
    }

    /// Persist the run's result on the integration and release its claim.
    async fn record_outcome(
        &self,
        integration: &Integration,
        platform: Platform,
        result: Result<SyncOutcome, SyncError>,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        let err = match result {
            Ok(outcome) => match self.integrations.mark_synced(integration.id, now).await {
                Ok(_) => {
                    tracing::info!(
                        integration_id = %integration.id,
                        client_id = %integration.client_id,
                        %platform,
                        ?outcome,
                        "integration synced"
                    );
                    return Ok(outcome);
                }
                Err(e) => SyncError::from(e),
            },
            Err(err) => err,
        };

        let classification = classify(&err);
        tracing::error!(
            integration_id = %integration.id,
            client_id = %integration.client_id,
            %platform,
            error = %err,
            retryable = classification.is_retryable(),
            "integration sync failed"
        );

        let recorded = match classification.action {
            FailureAction::MarkError => self
                .integrations
                .mark_failed(integration.id, &err.to_string())
                .await
                .map(|_| ()),
            FailureAction::RejectWithoutMutation => {
                self.integrations.release_claim(integration.id).await
            }
        };
        // An unreleased claim lapses after the lease.
        if let Err(record_err) = recorded {
            tracing::error!(
                integration_id = %integration.id,
                error = %record_err,
                "failed to record sync failure"
            );
        }
        Err(err)
    }
}
