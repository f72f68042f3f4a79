use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::integrations::models::Integration;
use tally_common::error::TallyResult;

#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    /// All integrations regardless of status, least recently synced first.
    async fn list_all(&self) -> TallyResult<Vec<Integration>>;

    async fn get_by_id(&self, id: Uuid) -> TallyResult<Option<Integration>>;

    /// Claim the integration for one sync run as of `now`.
    ///
    /// Succeeds only when no claim is held or the held one started before
    /// `now - lease`. Returns `None` when another run owns it.
    async fn try_claim(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> TallyResult<Option<Integration>>;

    /// Drop the claim without touching status or `last_sync_at`.
    async fn release_claim(&self, id: Uuid) -> TallyResult<()>;

    /// Record a successful sync: status back to 'active', error cleared, `last_sync_at` advanced,
    /// claim released.
    async fn mark_synced(&self, id: Uuid, synced_at: DateTime<Utc>) -> TallyResult<Integration>;

    /// Record a failed sync. Leaves `last_sync_at` untouched so the next cycle retries.
    /// Releases the claim.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> TallyResult<Integration>;
}
