//! Immutable per-client configuration.
//!
//! A [`ClientConfig`] is built once, validated on construction, and then
//! threaded through every pipeline step by reference. Nothing in the crate
//! keeps configuration in global state.

use std::fmt;

use crate::error::{CLIENT_ID_LEN, SoundcloudError};
use crate::fetch::RetryPolicy;
use crate::user_agent;

/// Default link-resolution endpoint.
pub const DEFAULT_RESOLVE_URL: &str = "https://api-widget.soundcloud.com/resolve";

/// Default versioned API base used for the media-stream endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api-v2.soundcloud.com";

/// Default endpoint publishing the current web application version.
pub const DEFAULT_VERSIONS_URL: &str = "https://soundcloud.com/versions.json";

/// Default output path used by the CLI when none is given.
pub const DEFAULT_OUTPUT_PATH: &str = "test.mp3";

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout (60 seconds, per request).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Upstream endpoints. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Link-resolution endpoint.
    pub resolve_url: String,
    /// API base for `/media/...` stream lookups.
    pub api_base_url: String,
    /// Application version document.
    pub versions_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            resolve_url: DEFAULT_RESOLVE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            versions_url: DEFAULT_VERSIONS_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at one base URL, using the production paths.
    ///
    /// Resolve becomes `{base}/resolve`, versions `{base}/versions.json`.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            resolve_url: format!("{base}/resolve"),
            api_base_url: base.to_string(),
            versions_url: format!("{base}/versions.json"),
        }
    }
}

/// Client credentials and request policy.
#[derive(Clone)]
pub struct ClientConfig {
    oauth_token: String,
    client_id: String,
    app_version: Option<String>,
    user_agent: String,
    endpoints: Endpoints,
    retry: RetryPolicy,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
}

impl ClientConfig {
    /// Creates a configuration from an authorization token and client id.
    ///
    /// # Errors
    ///
    /// Returns [`SoundcloudError::InvalidClientId`] unless `client_id` is
    /// exactly 32 characters long.
    pub fn new(
        oauth_token: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, SoundcloudError> {
        let client_id = client_id.into();
        validate_client_id(&client_id)?;
        Ok(Self {
            oauth_token: oauth_token.into(),
            client_id,
            app_version: None,
            user_agent: user_agent::default_user_agent(),
            endpoints: Endpoints::default(),
            retry: RetryPolicy::default(),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        })
    }

    /// Pins the application version instead of looking it up.
    #[must_use]
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = Some(app_version.into());
        self
    }

    /// Overrides the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the upstream endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Overrides the retry policy for JSON endpoints.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides HTTP connect/read timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        self.connect_timeout_secs = connect_timeout_secs;
        self.read_timeout_secs = read_timeout_secs;
        self
    }

    #[must_use]
    pub fn oauth_token(&self) -> &str {
        &self.oauth_token
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn app_version(&self) -> Option<&str> {
        self.app_version.as_deref()
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    #[must_use]
    pub fn connect_timeout_secs(&self) -> u64 {
        self.connect_timeout_secs
    }

    #[must_use]
    pub fn read_timeout_secs(&self) -> u64 {
        self.read_timeout_secs
    }
}

// Credentials stay out of Debug output and therefore out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("app_version", &self.app_version)
            .field("endpoints", &self.endpoints)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn validate_client_id(client_id: &str) -> Result<(), SoundcloudError> {
    let length = client_id.chars().count();
    if length == CLIENT_ID_LEN {
        Ok(())
    } else {
        Err(SoundcloudError::InvalidClientId { length })
    }
}
