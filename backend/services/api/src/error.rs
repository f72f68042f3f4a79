use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tally_common::error::TallyError;
use tally_ingest::SyncError;

#[derive(Debug)]
pub enum ApiError {
    Tally(TallyError),
    Sync(SyncError),
    Conflict(String),
}

impl From<TallyError> for ApiError {
    fn from(err: TallyError) -> Self {
        Self::Tally(err)
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Tally(TallyError::Validation(msg.into()))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Tally(TallyError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Tally(TallyError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Tally(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Sync(err) => match err {
                SyncError::IntegrationNotFound(_) => StatusCode::NOT_FOUND,
                SyncError::IntegrationInactive(_) => StatusCode::CONFLICT,
                SyncError::UnknownPlatform(_) | SyncError::InvalidWindow(_) => {
                    StatusCode::BAD_REQUEST
                }
                SyncError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SyncError::Upstream(_) => StatusCode::BAD_GATEWAY,
                SyncError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                SyncError::Store(_) | SyncError::InvariantViolation(_) | SyncError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Tally(TallyError::NotFound(msg) | TallyError::Validation(msg)) => msg.clone(),
            ApiError::Tally(other) => other.to_string(),
            ApiError::Sync(err) => err.to_string(),
            ApiError::Conflict(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
