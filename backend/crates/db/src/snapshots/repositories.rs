use async_trait::async_trait;

use crate::snapshots::models::{MetricsSnapshot, SnapshotDeleteFilter, SnapshotFilter};
use tally_common::error::TallyResult;

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Insert, or replace `metrics` and `created_at` of the row sharing the snapshot key.
    async fn upsert(&self, snapshot: MetricsSnapshot) -> TallyResult<MetricsSnapshot>;

    /// Upsert every snapshot with the same per-key semantics, all-or-nothing.
    /// Returns the number of rows written.
    async fn bulk_upsert(&self, snapshots: Vec<MetricsSnapshot>) -> TallyResult<usize>;

    /// Delete a client's snapshots in an inclusive date range. Returns the count removed.
    async fn delete_range(&self, filter: SnapshotDeleteFilter) -> TallyResult<u64>;

    async fn list(&self, filter: SnapshotFilter) -> TallyResult<Vec<MetricsSnapshot>>;
}
