//! Resilient JSON fetching.
//!
//! [`JsonFetcher::fetch_json`] issues a GET, retries any transport fault or
//! non-success status per its [`RetryPolicy`], and decodes the body as JSON.
//! The status code is logged but never used to decide whether to retry.
//!
//! URLs that reach logs or errors pass through [`redact_url`] first: the stream
//! request carries the per-track credential in its query string.

mod http_client;
mod retry;

pub(crate) use http_client::{ClientRole, build_http_client};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryDecision, RetryExhausted, RetryPolicy,
};

use std::fmt;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::SoundcloudError;

/// Query parameters whose values are credentials.
const SENSITIVE_QUERY_KEYS: &[&str] = &["track_authorization"];

const REDACTED: &str = "REDACTED";

/// Returns `url` with the values of credential query parameters replaced.
///
/// Unparseable URLs and URLs without such parameters are returned as-is.
pub(crate) fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let is_sensitive = |key: &str| SENSITIVE_QUERY_KEYS.contains(&key);
    if !parsed.query_pairs().any(|(key, _)| is_sensitive(&key)) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(key, value)| {
            let value = if is_sensitive(&key) {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

/// Why a single attempt failed. Only used for logging.
#[derive(Debug)]
enum AttemptError {
    Network(reqwest::Error),
    Status(u16),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(error) => write!(f, "network error: {error}"),
            Self::Status(status) => write!(f, "HTTP {status}"),
        }
    }
}

/// GET-and-decode with bounded retries.
#[derive(Debug, Clone)]
pub struct JsonFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl JsonFetcher {
    /// Creates a fetcher over an existing client.
    #[must_use]
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Creates a fetcher with the authenticated API client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SoundcloudError::HttpClient`] if the client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, SoundcloudError> {
        let client = build_http_client(config, ClientRole::Api)?;
        Ok(Self::new(client, config.retry_policy().clone()))
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetches `url` and parses the response body as JSON.
    ///
    /// # Errors
    ///
    /// - [`SoundcloudError::FetchExhausted`] when every attempt failed.
    /// - [`SoundcloudError::InvalidJson`] when a successful response body is
    ///   not JSON. Parse failures are not retried.
    ///
    /// The URL carried by either error has credential parameters redacted.
    #[instrument(
        skip(self, url),
        fields(url = %redact_url(url), max_attempts = self.retry.max_attempts())
    )]
    pub async fn fetch_json(&self, url: &str) -> Result<Value, SoundcloudError> {
        let body = self
            .retry
            .run(|attempt| async move {
                debug!(attempt, "requesting");
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(AttemptError::Network)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AttemptError::Status(status.as_u16()));
                }
                response.bytes().await.map_err(AttemptError::Network)
            })
            .await
            .map_err(|exhausted| {
                SoundcloudError::fetch_exhausted(redact_url(url), exhausted.attempts)
            })?;

        serde_json::from_slice(&body).map_err(|e| SoundcloudError::invalid_json(redact_url(url), e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    fn fast_fetcher(max_attempts: u32) -> JsonFetcher {
        JsonFetcher::new(
            Client::new(),
            RetryPolicy::new(max_attempts, Duration::from_millis(5)),
        )
    }

    #[tokio::test]
    async fn test_fetch_json_returns_body_on_success() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/data", mock_server.uri());
        let value = fast_fetcher(5).fetch_json(&url).await.unwrap();
        assert_eq!(value["id"], 42);
    }

    #[tokio::test]
    async fn test_fetch_json_recovers_after_failures() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        // Two failures, then success on attempt 3.
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/flaky", mock_server.uri());
        let value = fast_fetcher(3).fetch_json(&url).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_fetch_json_exhausts_with_url() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(404))
            .expect(5)
            .mount(&mock_server)
            .await;

        let url = format!("{}/down", mock_server.uri());
        match fast_fetcher(5).fetch_json(&url).await {
            Err(SoundcloudError::FetchExhausted {
                url: failed,
                attempts: 5,
            }) => assert_eq!(failed, url),
            other => panic!("Expected FetchExhausted, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_json_non_json_body_is_not_retried() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/html", mock_server.uri());
        let result = fast_fetcher(5).fetch_json(&url).await;
        assert!(
            matches!(result, Err(SoundcloudError::InvalidJson { .. })),
            "got: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_json_exhausted_url_hides_track_authorization() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/stream/hls"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&mock_server)
            .await;

        let url = format!(
            "{}/stream/hls?client_id=abc&track_authorization=secret-jwt",
            mock_server.uri()
        );
        match fast_fetcher(2).fetch_json(&url).await {
            Err(SoundcloudError::FetchExhausted { url: failed, .. }) => {
                assert!(!failed.contains("secret-jwt"), "leaked token: {failed}");
                assert!(failed.contains("client_id=abc"), "{failed}");
                assert!(failed.contains("track_authorization=REDACTED"), "{failed}");
            }
            other => panic!("Expected FetchExhausted, got: {other:?}"),
        }
    }

    #[test]
    fn test_redact_url_replaces_only_credentials() {
        assert_eq!(
            redact_url("https://api.test/media/x/stream/hls?client_id=c&track_authorization=t"),
            "https://api.test/media/x/stream/hls?client_id=c&track_authorization=REDACTED"
        );
        assert_eq!(
            redact_url("https://api.test/resolve?url=a%2Fb&client_id=c"),
            "https://api.test/resolve?url=a%2Fb&client_id=c"
        );
        assert_eq!(redact_url("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_fetch_json_connection_refused_exhausts() {
        // Port 9 (discard) on localhost is closed in test environments.
        let result = fast_fetcher(2).fetch_json("http://127.0.0.1:9/nothing").await;
        assert!(
            matches!(result, Err(SoundcloudError::FetchExhausted { attempts: 2, .. })),
            "got: {result:?}"
        );
    }
}
