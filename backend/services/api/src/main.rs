mod error;
mod extractors;
mod snapshots;
mod sync;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use tally_common::types::ServiceInfo;
use tally_config::{init_tracing, AppConfig};
use tally_db::snapshots::pg_repository::PgSnapshotRepository;
use tally_db::snapshots::repositories::SnapshotRepository;
use tally_ingest::scheduler::IntegrationScheduler;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub snapshots: Arc<dyn SnapshotRepository>,
    pub scheduler: IntegrationScheduler,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo::new("tally-api"))
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .merge(sync::router())
        .merge(snapshots::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::info!(service = "tally-api", "starting");

    let pool = tally_db::create_pool(&config.database_url)
        .await
        .context("failed to create database pool")?;

    let state = AppState {
        snapshots: Arc::new(PgSnapshotRepository::new(pool.clone())),
        scheduler: tally_ingest::build_scheduler(pool).context("failed to build scheduler")?,
    };

    let app = build_router(state);
    let addr = config.bind_addr();

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
