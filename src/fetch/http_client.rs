//! HTTP client construction policy.
//!
//! Two clients are built per [`ClientConfig`](crate::config::ClientConfig):
//! an API client that carries the `Authorization` and `Accept: application/json`
//! headers, and a media client for manifests and segments that carries only the
//! User-Agent. Segment hosts are discovered at runtime, so they never see the
//! OAuth token.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::SoundcloudError;

/// Which header set a client is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClientRole {
    /// JSON API calls; authenticated.
    Api,
    /// Manifest and segment downloads; anonymous.
    Media,
}

impl ClientRole {
    fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Media => "media",
        }
    }
}

/// Builds an HTTP client for `role` using the shared project policy.
///
/// # Errors
///
/// Returns [`SoundcloudError::HttpClient`] when the token is not a valid
/// header value or client construction fails.
pub(crate) fn build_http_client(
    config: &ClientConfig,
    role: ClientRole,
) -> Result<Client, SoundcloudError> {
    let headers = default_headers(config, role)?;

    match try_build_client(config, headers.clone(), false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic while reading system proxy
            // settings; retry with env proxies only.
            warn!(
                role = role.as_str(),
                "HTTP client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(config, headers, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(SoundcloudError::http_client(
                    "client builder panicked while initializing networking",
                )),
                Err(BuildClientFailure::Build(error)) => {
                    Err(SoundcloudError::http_client(error.to_string()))
                }
            }
        }
        Err(BuildClientFailure::Build(error)) => {
            Err(SoundcloudError::http_client(error.to_string()))
        }
    }
}

fn default_headers(config: &ClientConfig, role: ClientRole) -> Result<HeaderMap, SoundcloudError> {
    let mut headers = HeaderMap::new();
    if role == ClientRole::Api {
        let mut auth = HeaderValue::from_str(config.oauth_token()).map_err(|_| {
            SoundcloudError::http_client("authorization token is not a valid header value")
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    }
    Ok(headers)
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    config: &ClientConfig,
    headers: HeaderMap,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(config, headers);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(config: &ClientConfig, headers: HeaderMap) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs()))
        .timeout(Duration::from_secs(config.read_timeout_secs()))
        .user_agent(config.user_agent())
        .default_headers(headers)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
