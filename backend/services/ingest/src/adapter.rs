use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tally_common::types::Platform;

use crate::ads::AdSpendAdapter;
use crate::content::ContentAdapter;
use crate::ecommerce::EcommerceAdapter;
use crate::email::EmailAdapter;
use crate::error::SyncError;
use crate::http::UpstreamClient;
use crate::progress::ProgressHandle;
use crate::window::ResolvedWindow;

/// A normalized snapshot before it is bound to a client and integration.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDraft {
    pub metric_type: String,
    pub date: NaiveDate,
    pub metrics: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Metrics(Vec<SnapshotDraft>),
    /// The platform had nothing for the window. Nothing is written.
    Empty,
}

/// Everything an adapter needs for one fetch.
pub struct FetchRequest<'a> {
    pub credentials: &'a Value,
    pub config: &'a Value,
    pub window: ResolvedWindow,
    pub progress: &'a ProgressHandle,
}

/// Fetches raw data from one external platform and normalizes it.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, SyncError>;
}

/// Lookup from platform tag to its adapter.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One adapter per supported platform, sharing `client`.
    pub fn standard(client: UpstreamClient) -> Self {
        Self::new()
            .with(Arc::new(EcommerceAdapter::new(client.clone())))
            .with(Arc::new(AdSpendAdapter::new(client.clone())))
            .with(Arc::new(EmailAdapter::new(client.clone())))
            .with(Arc::new(ContentAdapter::new(client)))
    }

    pub fn with(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        self.adapters.insert(adapter.platform(), adapter);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }
}

/// A non-blank string credential, or a config error naming the key.
pub fn required_credential<'a>(credentials: &'a Value, key: &str) -> Result<&'a str, SyncError> {
    credentials
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncError::Config(format!("missing credential: {key}")))
}

/// Join a credential-supplied base URL and an endpoint path.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Serialize normalized metrics into a snapshot payload.
pub fn to_metrics_value<T: serde::Serialize>(metrics: &T) -> Result<Value, SyncError> {
    serde_json::to_value(metrics).map_err(|e| SyncError::Internal(e.to_string()))
}
