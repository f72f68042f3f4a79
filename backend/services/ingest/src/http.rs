use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tally_common::error::TallyResult;
use tally_config::parse_var_or;

/// Records requested per page from every paginated platform endpoint.
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl UpstreamConfig {
    pub fn from_env() -> TallyResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            timeout_secs: parse_var_or("UPSTREAM_TIMEOUT_SECS", defaults.timeout_secs)?,
            max_retries: parse_var_or("UPSTREAM_MAX_RETRIES", defaults.max_retries)?,
        })
    }
}

/// How a request authenticates against a platform.
#[derive(Debug, Clone)]
pub enum Auth {
    Bearer(String),
    Basic { username: String, password: String },
    Header { name: &'static str, value: String },
}

impl Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Header { name, value } => request.header(*name, value),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Shared HTTP client for every platform adapter.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// GET `url` and decode the JSON body, retrying transient errors.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth: &Auth,
    ) -> Result<T, UpstreamError> {
        let body = self.request_with_retry(url, query, auth).await?;
        serde_json::from_value(body).map_err(|e| UpstreamError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Walk `page=1,2,..` with `per_page=PAGE_SIZE` until a short page comes back.
    ///
    /// `items_key` names the array inside an object envelope; `None` means the
    /// body is the array itself. `on_page` sees each page's record count.
    pub async fn fetch_all_pages<T, F>(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth: &Auth,
        items_key: Option<&str>,
        mut on_page: F,
    ) -> Result<Vec<T>, UpstreamError>
    where
        T: DeserializeOwned,
        F: FnMut(usize) + Send,
    {
        let mut page = 1usize;
        let mut all = Vec::new();

        loop {
            let mut params: Vec<(&str, String)> = query.to_vec();
            params.push(("page", page.to_string()));
            params.push(("per_page", PAGE_SIZE.to_string()));

            let body = self.request_with_retry(url, &params, auth).await?;
            let items = extract_items(url, body, items_key)?;
            let page_len = items.len();

            for item in items {
                let record = serde_json::from_value(item).map_err(|e| UpstreamError::Malformed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
                all.push(record);
            }

            on_page(page_len);
            tracing::debug!(url, page, page_len, "fetched page");

            if page_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    async fn request_with_retry(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth: &Auth,
    ) -> Result<Value, UpstreamError> {
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                tracing::warn!(url, attempt, backoff_secs, "retrying after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }

            let request = auth.apply(self.client.get(url).query(query));
            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() || e.is_connect() {
                        continue;
                    }
                    return Err(UpstreamError::RequestError(e));
                }
            };

            let status = response.status();

            if status.is_success() {
                return response
                    .json::<Value>()
                    .await
                    .map_err(UpstreamError::RequestError);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if let Some(retry_after) = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    let wait = std::cmp::min(retry_after, 60);
                    tracing::warn!(url, wait, "rate-limited, waiting Retry-After");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                last_error = "429 Too Many Requests".to_string();
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = format!("{status}: {body}");
                continue;
            }

            // Fail fast on the remaining 4xx
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::HttpError { status, body });
        }

        Err(UpstreamError::MaxRetriesExceeded {
            attempts: self.config.max_retries + 1,
            last_error,
        })
    }
}

fn extract_items(
    url: &str,
    body: Value,
    items_key: Option<&str>,
) -> Result<Vec<Value>, UpstreamError> {
    let malformed = |reason: String| UpstreamError::Malformed {
        url: url.to_string(),
        reason,
    };

    let array = match items_key {
        None => body,
        Some(key) => match body {
            Value::Object(mut map) => map
                .remove(key)
                .ok_or_else(|| malformed(format!("missing `{key}` array")))?,
            _ => return Err(malformed(format!("expected object with `{key}`"))),
        },
    };

    match array {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(malformed(format!("expected array, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Row {
        id: usize,
    }

    fn test_client(max_retries: u32) -> UpstreamClient {
        UpstreamClient::new(UpstreamConfig {
            timeout_secs: 5,
            max_retries,
        })
        .unwrap()
    }

    fn rows(count: usize, offset: usize) -> Vec<Value> {
        (0..count)
            .map(|i| serde_json::json!({ "id": i + offset }))
            .collect()
    }

    #[tokio::test]
    async fn walks_pages_until_short_page() {
        let server = MockServer::start().await;

        for (page, count, offset) in [("1", 100, 0), ("2", 100, 100), ("3", 37, 200)] {
            Mock::given(method("GET"))
                .and(path("/items"))
                .and(query_param("page", page))
                .and(query_param("per_page", "100"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "items": rows(count, offset) })),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut pages = Vec::new();
        let result: Vec<Row> = test_client(0)
            .fetch_all_pages(
                &format!("{}/items", server.uri()),
                &[],
                &Auth::Bearer("t".into()),
                Some("items"),
                |n| pages.push(n),
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 237);
        assert_eq!(result[236].id, 236);
        assert_eq!(pages, vec![100, 100, 37]);
    }

    #[tokio::test]
    async fn empty_first_page_stops_immediately() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Value>::new()))
            .expect(1)
            .mount(&server)
            .await;

        let result: Vec<Row> = test_client(0)
            .fetch_all_pages(
                &format!("{}/items", server.uri()),
                &[],
                &Auth::Bearer("t".into()),
                None,
                |_| {},
            )
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn retries_on_500() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows(2, 0)))
            .mount(&server)
            .await;

        let result: Vec<Row> = test_client(2)
            .get_json(&format!("{}/items", server.uri()), &[], &Auth::Bearer("t".into()))
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn fails_fast_on_401_with_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(3)
            .get_json::<Value>(&format!("{}/items", server.uri()), &[], &Auth::Bearer("t".into()))
            .await
            .unwrap_err();
        match err {
            UpstreamError::HttpError { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "bad token");
            }
            other => panic!("expected HttpError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn max_retries_exceeded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = test_client(1)
            .get_json::<Value>(&format!("{}/items", server.uri()), &[], &Auth::Bearer("t".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::MaxRetriesExceeded { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn missing_envelope_key_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"other": []})),
            )
            .mount(&server)
            .await;

        let err = test_client(0)
            .fetch_all_pages::<Row, _>(
                &format!("{}/items", server.uri()),
                &[],
                &Auth::Bearer("t".into()),
                Some("items"),
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed { .. }));
    }

    #[tokio::test]
    async fn sends_custom_auth_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .and(header("X-Access-Token", "shpat_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Value>::new()))
            .expect(1)
            .mount(&server)
            .await;

        let auth = Auth::Header {
            name: "X-Access-Token",
            value: "shpat_123".into(),
        };
        let _: Vec<Value> = test_client(0)
            .get_json(&format!("{}/items", server.uri()), &[], &auth)
            .await
            .unwrap();
    }

    #[test]
    fn upstream_config_defaults() {
        let cfg = UpstreamConfig::default();
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_retries, 3);
    }
}
