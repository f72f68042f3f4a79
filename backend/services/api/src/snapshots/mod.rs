pub mod handlers;
pub mod requests;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/snapshots", get(handlers::list_snapshots))
        .route("/snapshots/delete", post(handlers::delete_snapshots))
}
