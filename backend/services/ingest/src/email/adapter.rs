use async_trait::async_trait;
use chrono::SecondsFormat;
use tally_common::types::Platform;

use super::models::{Campaign, EmailMetrics, MailingList};
use crate::adapter::{
    endpoint, required_credential, to_metrics_value, FetchOutcome, FetchRequest, PlatformAdapter,
    SnapshotDraft,
};
use crate::error::SyncError;
use crate::http::{Auth, UpstreamClient};

pub struct EmailAdapter {
    client: UpstreamClient,
}

impl EmailAdapter {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlatformAdapter for EmailAdapter {
    fn platform(&self) -> Platform {
        Platform::Email
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, SyncError> {
        let base_url = required_credential(request.credentials, "api_base_url")?;
        let api_key = required_credential(request.credentials, "api_key")?;
        let auth = Auth::Bearer(api_key.to_string());
        let window = request.window;
        let progress = request.progress;

        let lists: Vec<MailingList> = self
            .client
            .fetch_all_pages(
                &endpoint(base_url, "lists"),
                &[],
                &auth,
                Some("lists"),
                |n| progress.record_page(n),
            )
            .await?;

        let query = [
            (
                "sent_since",
                window.start().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "sent_before",
                window.end().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];
        let campaigns: Vec<Campaign> = self
            .client
            .fetch_all_pages(
                &endpoint(base_url, "campaigns"),
                &query,
                &auth,
                Some("campaigns"),
                |n| progress.record_page(n),
            )
            .await?;

        tracing::debug!(lists = lists.len(), campaigns = campaigns.len(), "fetched email data");

        let Some(metrics) = EmailMetrics::build(&lists, &campaigns, window.snapshot_date()) else {
            return Ok(FetchOutcome::Empty);
        };

        Ok(FetchOutcome::Metrics(vec![SnapshotDraft {
            metric_type: window.metric_type(Platform::Email),
            date: window.snapshot_date(),
            metrics: to_metrics_value(&metrics)?,
        }]))
    }
}
