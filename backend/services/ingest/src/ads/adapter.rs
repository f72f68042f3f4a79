use async_trait::async_trait;
use tally_common::types::Platform;

use super::models::{daily_metrics, AdSpendMetrics, InsightRow};
use crate::adapter::{
    endpoint, required_credential, to_metrics_value, FetchOutcome, FetchRequest, PlatformAdapter,
    SnapshotDraft,
};
use crate::error::SyncError;
use crate::http::{Auth, UpstreamClient};

pub struct AdSpendAdapter {
    client: UpstreamClient,
}

impl AdSpendAdapter {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlatformAdapter for AdSpendAdapter {
    fn platform(&self) -> Platform {
        Platform::AdSpend
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, SyncError> {
        let base_url = required_credential(request.credentials, "api_base_url")?;
        let token = required_credential(request.credentials, "access_token")?;
        let account_id = required_credential(request.credentials, "account_id")?;

        let window = request.window;
        let query = [
            ("since", window.from.to_string()),
            ("until", window.to.to_string()),
            ("time_increment", "1".to_string()),
        ];

        let progress = request.progress;
        let rows: Vec<InsightRow> = self
            .client
            .fetch_all_pages(
                &endpoint(base_url, &format!("accounts/{account_id}/insights")),
                &query,
                &Auth::Bearer(token.to_string()),
                Some("data"),
                |n| progress.record_page(n),
            )
            .await?;

        let in_window: Vec<InsightRow> = rows
            .into_iter()
            .filter(|r| window.contains(r.date_start))
            .collect();
        let days = daily_metrics(&in_window);

        let Some(aggregate) = AdSpendMetrics::aggregate(&days.values().cloned().collect::<Vec<_>>())
        else {
            return Ok(FetchOutcome::Empty);
        };

        let mut drafts = Vec::with_capacity(days.len() + 1);
        if window.is_aggregate() {
            for (date, metrics) in &days {
                drafts.push(SnapshotDraft {
                    metric_type: Platform::AdSpend.daily_metric_type(),
                    date: *date,
                    metrics: to_metrics_value(metrics)?,
                });
            }
        }
        drafts.push(SnapshotDraft {
            metric_type: window.metric_type(Platform::AdSpend),
            date: window.snapshot_date(),
            metrics: to_metrics_value(&aggregate)?,
        });

        Ok(FetchOutcome::Metrics(drafts))
    }
}
