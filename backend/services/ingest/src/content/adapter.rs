use async_trait::async_trait;
use tally_common::types::Platform;

use super::models::{ContentMetrics, Post};
use crate::adapter::{
    endpoint, required_credential, to_metrics_value, FetchOutcome, FetchRequest, PlatformAdapter,
    SnapshotDraft,
};
use crate::error::SyncError;
use crate::http::{Auth, UpstreamClient};

const SITE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct ContentAdapter {
    client: UpstreamClient,
}

impl ContentAdapter {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlatformAdapter for ContentAdapter {
    fn platform(&self) -> Platform {
        Platform::Content
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, SyncError> {
        let site_url = required_credential(request.credentials, "site_url")?;
        let username = required_credential(request.credentials, "username")?;
        let password = required_credential(request.credentials, "application_password")?;

        let auth = Auth::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
        let window = request.window;
        // `after`/`before` are exclusive bounds
        let query = [
            (
                "after",
                (window.start() - chrono::Duration::seconds(1))
                    .format(SITE_TIME_FORMAT)
                    .to_string(),
            ),
            (
                "before",
                (window.end() + chrono::Duration::seconds(1))
                    .format(SITE_TIME_FORMAT)
                    .to_string(),
            ),
            ("status", "publish".to_string()),
        ];

        let progress = request.progress;
        let posts: Vec<Post> = self
            .client
            .fetch_all_pages(
                &endpoint(site_url, "posts"),
                &query,
                &auth,
                None,
                |n| progress.record_page(n),
            )
            .await?;

        let Some(metrics) = ContentMetrics::from_posts(&posts) else {
            return Ok(FetchOutcome::Empty);
        };

        Ok(FetchOutcome::Metrics(vec![SnapshotDraft {
            metric_type: window.metric_type(Platform::Content),
            date: window.snapshot_date(),
            metrics: to_metrics_value(&metrics)?,
        }]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::UpstreamConfig;
    use crate::progress::ProgressHandle;
    use crate::window::SyncWindow;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter() -> ContentAdapter {
        ContentAdapter::new(
            UpstreamClient::new(UpstreamConfig {
                timeout_secs: 5,
                max_retries: 0,
            })
            .unwrap(),
        )
    }

    fn posts(count: usize, offset: usize) -> Vec<Value> {
        (0..count)
            .map(|i| {
                json!({
                    "id": i + offset,
                    "date": "2026-04-10T12:00:00",
                    "author": (i % 3) as u64,
                    "categories": [1],
                    "comment_count": 1,
                    "title": { "rendered": format!("Post {}", i + offset) },
                    "content": { "rendered": "<p>two words</p>" }
                })
            })
            .collect()
    }

    async fn run(creds: &Value, window: SyncWindow) -> Result<FetchOutcome, SyncError> {
        let progress = ProgressHandle::disabled();
        adapter()
            .fetch(FetchRequest {
                credentials: creds,
                config: &Value::Null,
                window: window.resolve(NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()).unwrap(),
                progress: &progress,
            })
            .await
    }

    fn creds(server: &MockServer) -> Value {
        json!({ "site_url": server.uri(), "username": "editor", "application_password": "abcd efgh" })
    }

    #[tokio::test]
    async fn paginates_bare_array_with_basic_auth() {
        let server = MockServer::start().await;
        for (page, count, offset) in [("1", 100, 0), ("2", 5, 100)] {
            Mock::given(method("GET"))
                .and(path("/posts"))
                .and(header_exists("Authorization"))
                .and(query_param("status", "publish"))
                .and(query_param("after", "2026-03-31T23:59:59"))
                .and(query_param("before", "2026-04-16T00:00:00"))
                .and(query_param("page", page))
                .respond_with(ResponseTemplate::new(200).set_body_json(posts(count, offset)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let window = SyncWindow::Backfill {
            from: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 4, 15).unwrap(),
        };
        let FetchOutcome::Metrics(drafts) = run(&creds(&server), window).await.unwrap() else {
            panic!("expected metrics");
        };
        let m = &drafts[0].metrics;
        assert_eq!(drafts[0].metric_type, "content_aggregate");
        assert_eq!(m["posts_published"], 105);
        assert_eq!(m["total_words"], 210);
        assert_eq!(m["unique_authors"], 3);
        assert_eq!(m["top_posts"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn nothing_published_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Value>::new()))
            .mount(&server)
            .await;

        let outcome = run(&creds(&server), SyncWindow::Incremental).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Empty);
    }

    #[tokio::test]
    async fn missing_password_is_config_error() {
        let creds = json!({ "site_url": "http://127.0.0.1:9", "username": "editor" });
        let err = run(&creds, SyncWindow::Incremental).await.unwrap_err();
        assert!(matches!(err, SyncError::Config(ref m) if m.contains("application_password")));
    }
}
