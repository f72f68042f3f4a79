use axum::extract::{Query, State};
use axum::Json;

use crate::error::ApiError;
use crate::extractors::ApiJson;
use crate::snapshots::requests::{DeleteSnapshotsRequest, ListSnapshotsQuery};
use crate::snapshots::responses::{DeleteSnapshotsResponse, ListSnapshotsResponse};
use crate::AppState;

pub async fn list_snapshots(
    State(state): State<AppState>,
    Query(query): Query<ListSnapshotsQuery>,
) -> Result<Json<ListSnapshotsResponse>, ApiError> {
    let filter = query.into_filter()?;
    let data = state.snapshots.list(filter).await?;
    let count = data.len();
    Ok(Json(ListSnapshotsResponse { data, count }))
}

pub async fn delete_snapshots(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DeleteSnapshotsRequest>,
) -> Result<Json<DeleteSnapshotsResponse>, ApiError> {
    let filter = body.into_filter()?;
    let client_id = filter.client_id;
    let deleted_count = state.snapshots.delete_range(filter).await?;

    tracing::info!(%client_id, deleted_count, "snapshots deleted");
    Ok(Json(DeleteSnapshotsResponse {
        success: true,
        deleted_count,
    }))
}
