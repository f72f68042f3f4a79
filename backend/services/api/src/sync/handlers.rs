use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use tally_ingest::{CycleSummary, SyncOutcome, SyncWindow};
use uuid::Uuid;

use crate::error::ApiError;
use crate::sync::requests::ManualSyncRequest;
use crate::sync::responses::{BackfillListResponse, ManualSyncResponse};
use crate::AppState;

pub async fn run_cycle(State(state): State<AppState>) -> Result<Json<CycleSummary>, ApiError> {
    let summary = state.scheduler.run_cycle().await?;
    Ok(Json(summary))
}

pub async fn sync_integration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ManualSyncResponse>, ApiError> {
    let request = ManualSyncRequest::from_body(&body)?;
    let window = SyncWindow::from_bounds(request.from, request.to, Utc::now().date_naive())?;

    let (status, snapshots_written) = match state.scheduler.sync_by_id(id, window).await? {
        SyncOutcome::Synced { snapshots_written } => ("synced", snapshots_written),
        SyncOutcome::Empty => ("empty", 0),
        SyncOutcome::AlreadyRunning => {
            return Err(ApiError::Conflict(format!(
                "a sync is already running for integration {id}"
            )));
        }
    };

    Ok(Json(ManualSyncResponse {
        integration_id: id,
        status,
        snapshots_written,
    }))
}

pub async fn list_backfills(State(state): State<AppState>) -> Json<BackfillListResponse> {
    let data = state.scheduler.backfills().list();
    let count = data.len();
    Json(BackfillListResponse { data, count })
}
