pub mod handlers;
pub mod requests;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync/run", post(handlers::run_cycle))
        .route("/sync/backfills", get(handlers::list_backfills))
        .route("/integrations/{id}/sync", post(handlers::sync_integration))
}
