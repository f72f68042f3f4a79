use std::time::Duration;

use tally_common::error::TallyError;
use thiserror::Error;
use uuid::Uuid;

use crate::http::UpstreamError;

/// Everything that can go wrong while syncing one integration.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or unusable credentials/config. No network call was made.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("upstream fetch timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("store error: {0}")]
    Store(String),

    /// A duplicate snapshot key got past the upsert path. Store-layer bug.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("invalid sync window: {0}")]
    InvalidWindow(String),

    #[error("integration not found: {0}")]
    IntegrationNotFound(Uuid),

    #[error("integration is inactive: {0}")]
    IntegrationInactive(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<UpstreamError> for SyncError {
    fn from(err: UpstreamError) -> Self {
        SyncError::Upstream(err.to_string())
    }
}

impl From<TallyError> for SyncError {
    fn from(err: TallyError) -> Self {
        match err {
            TallyError::InvariantViolation(msg) => SyncError::InvariantViolation(msg),
            other => SyncError::Store(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retried on the next scheduling cycle.
    Transient,
    /// Will keep failing until someone fixes config, the caller, or the store.
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Set the integration to `error` with the failure message; `last_sync_at` stays put.
    MarkError,
    /// Reject the request without touching integration state.
    RejectWithoutMutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: FailureKind,
    pub action: FailureAction,
}

impl Classification {
    pub fn is_retryable(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

/// Map a sync failure to its retry class and the integration state transition it causes.
///
/// Terminal config errors are still retried on the next cycle like transient ones;
/// there is no faster or slower retry path.
pub fn classify(err: &SyncError) -> Classification {
    use FailureAction::*;
    use FailureKind::*;

    let (kind, action) = match err {
        SyncError::Config(_) => (Terminal, MarkError),
        SyncError::Upstream(_) | SyncError::Timeout(_) => (Transient, MarkError),
        SyncError::Store(_) | SyncError::Internal(_) => (Transient, MarkError),
        SyncError::InvariantViolation(_) => (Terminal, MarkError),
        SyncError::UnknownPlatform(_)
        | SyncError::InvalidWindow(_)
        | SyncError::IntegrationNotFound(_)
        | SyncError::IntegrationInactive(_) => (Terminal, RejectWithoutMutation),
    };

    Classification { kind, action }
}
