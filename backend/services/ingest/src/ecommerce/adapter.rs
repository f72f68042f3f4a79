use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::Value;
use tally_common::types::Platform;

use super::models::{EcommerceMetrics, Order};
use crate::adapter::{
    endpoint, required_credential, to_metrics_value, FetchOutcome, FetchRequest, PlatformAdapter,
    SnapshotDraft,
};
use crate::error::SyncError;
use crate::http::{Auth, UpstreamClient};

#[derive(Debug, Clone, Deserialize)]
pub struct EcommerceConfig {
    #[serde(default = "default_accepted_statuses")]
    pub accepted_statuses: Vec<String>,
}

fn default_accepted_statuses() -> Vec<String> {
    vec!["paid".to_string()]
}

impl Default for EcommerceConfig {
    fn default() -> Self {
        Self {
            accepted_statuses: default_accepted_statuses(),
        }
    }
}

impl EcommerceConfig {
    pub fn from_value(config: &Value) -> Result<Self, SyncError> {
        if config.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(config.clone())
            .map_err(|e| SyncError::Config(format!("invalid ecommerce config: {e}")))
    }
}

pub struct EcommerceAdapter {
    client: UpstreamClient,
}

impl EcommerceAdapter {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlatformAdapter for EcommerceAdapter {
    fn platform(&self) -> Platform {
        Platform::Ecommerce
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, SyncError> {
        let shop_url = required_credential(request.credentials, "shop_url")?;
        let token = required_credential(request.credentials, "access_token")?;
        let config = EcommerceConfig::from_value(request.config)?;

        let auth = Auth::Header {
            name: "X-Access-Token",
            value: token.to_string(),
        };
        let window = request.window;
        let query = [
            (
                "created_at_min",
                window.start().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "created_at_max",
                window.end().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];

        let progress = request.progress;
        let orders: Vec<Order> = self
            .client
            .fetch_all_pages(
                &endpoint(shop_url, "orders"),
                &query,
                &auth,
                Some("orders"),
                |n| progress.record_page(n),
            )
            .await?;

        tracing::debug!(orders = orders.len(), "fetched ecommerce orders");

        let Some(metrics) = EcommerceMetrics::from_orders(&orders, &config.accepted_statuses)
        else {
            return Ok(FetchOutcome::Empty);
        };

        Ok(FetchOutcome::Metrics(vec![SnapshotDraft {
            metric_type: window.metric_type(Platform::Ecommerce),
            date: window.snapshot_date(),
            metrics: to_metrics_value(&metrics)?,
        }]))
    }
}
