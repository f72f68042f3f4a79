use serde::Serialize;
use tally_db::snapshots::models::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct ListSnapshotsResponse {
    pub data: Vec<MetricsSnapshot>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteSnapshotsResponse {
    pub success: bool,
    pub deleted_count: u64,
}
