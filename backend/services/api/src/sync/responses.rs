use serde::Serialize;
use tally_ingest::progress::BackfillProgress;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ManualSyncResponse {
    pub integration_id: Uuid,
    /// `synced` or `empty`.
    pub status: &'static str,
    pub snapshots_written: usize,
}

#[derive(Debug, Serialize)]
pub struct BackfillListResponse {
    pub data: Vec<BackfillProgress>,
    pub count: usize,
}
