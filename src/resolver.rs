//! Share-link resolution.
//!
//! [`StreamResolver::resolve`] chains two JSON calls through the
//! [`JsonFetcher`]:
//!
//! 1. the widget `resolve` endpoint turns a share link into a track id, a
//!    track-scoped authorization token and a list of transcodings;
//! 2. the `media/.../stream/hls` endpoint, built from those values, returns the
//!    manifest (playlist) location.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{ClientConfig, Endpoints};
use crate::error::SoundcloudError;
use crate::fetch::{JsonFetcher, redact_url};

/// Captures the path segment immediately before a literal `/stream`.
static STREAM_SESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"/([^/]+)/stream"));

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

// ==================== API Response Types ====================

/// Track ids arrive as JSON numbers, but are treated as opaque.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTrackId {
    Number(u64),
    Text(String),
}

impl RawTrackId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Subset of the widget `resolve` response used here.
#[derive(Debug, Deserialize)]
struct ResolveResponse {
    id: Option<RawTrackId>,
    track_authorization: Option<String>,
    media: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    transcodings: Option<Vec<Transcoding>>,
}

#[derive(Debug, Deserialize)]
struct Transcoding {
    url: Option<String>,
    preset: Option<String>,
    format: Option<TranscodingFormat>,
}

#[derive(Debug, Deserialize)]
struct TranscodingFormat {
    protocol: Option<String>,
    mime_type: Option<String>,
}

/// The `media/.../stream/hls` response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    url: Option<String>,
}

/// Subset of `versions.json`.
#[derive(Debug, Deserialize)]
struct VersionsResponse {
    app: Option<String>,
}

// ==================== Resolved Types ====================

/// Identifiers extracted from one resolution call. Never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Opaque track identifier.
    pub track_id: String,
    /// Credential scoped to this one track.
    pub track_authorization: String,
    /// Session id parsed from the transcoding URL.
    pub stream_session_id: String,
}

// The track authorization is a credential; keep it out of logs.
impl std::fmt::Debug for StreamDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDescriptor")
            .field("track_id", &self.track_id)
            .field("stream_session_id", &self.stream_session_id)
            .finish_non_exhaustive()
    }
}

/// Result of [`StreamResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    /// Values used to build the stream request, kept for diagnostics.
    pub descriptor: StreamDescriptor,
    /// URL of the segment manifest.
    pub manifest_url: String,
}

// ==================== StreamResolver ====================

/// Resolves canonical share links to manifest locations.
#[derive(Debug, Clone)]
pub struct StreamResolver {
    fetcher: JsonFetcher,
    endpoints: Endpoints,
    client_id: String,
}

impl StreamResolver {
    /// Creates a resolver that shares `fetcher` and reads endpoints and client
    /// id from `config`.
    #[must_use]
    pub fn new(fetcher: JsonFetcher, config: &ClientConfig) -> Self {
        Self {
            fetcher,
            endpoints: config.endpoints().clone(),
            client_id: config.client_id().to_string(),
        }
    }

    /// Resolves `canonical_link` to its manifest location.
    ///
    /// # Errors
    ///
    /// - [`SoundcloudError::FetchExhausted`] if either JSON call keeps failing.
    /// - [`SoundcloudError::MissingField`] if `id`, `track_authorization`,
    ///   the first transcoding URL, or the stream `url` is absent.
    /// - [`SoundcloudError::UuidNotFound`] if the transcoding URL has no
    ///   `/<id>/stream` segment.
    #[instrument(skip(self, app_version), fields(link = %canonical_link))]
    pub async fn resolve(
        &self,
        canonical_link: &str,
        app_version: &str,
    ) -> Result<ResolvedStream, SoundcloudError> {
        let resolve_url = self.resolve_request_url(canonical_link, app_version);
        let body = self.fetcher.fetch_json(&resolve_url).await?;
        let (track_id, track_authorization, transcoding_url) =
            parse_resolve_response(&resolve_url, body)?;

        let stream_session_id = extract_stream_session_id(&transcoding_url)?;
        let descriptor = StreamDescriptor {
            track_id,
            track_authorization,
            stream_session_id,
        };
        debug!(?descriptor, "resolved track");

        let stream_url = self.stream_request_url(&descriptor);
        let body = self.fetcher.fetch_json(&stream_url).await?;
        let stream: StreamResponse = serde_json::from_value(body)
            .map_err(|e| SoundcloudError::invalid_json(redact_url(&stream_url), e))?;
        let manifest_url = stream.url.ok_or(SoundcloudError::missing_field("url"))?;

        info!(track_id = %descriptor.track_id, "manifest located");
        Ok(ResolvedStream {
            descriptor,
            manifest_url,
        })
    }

    /// Looks up the current web application version.
    ///
    /// Missing `app` key yields an empty version; the resolve endpoint
    /// accepts that.
    ///
    /// # Errors
    ///
    /// Returns fetch errors from the versions endpoint.
    #[instrument(skip(self))]
    pub async fn fetch_app_version(&self) -> Result<String, SoundcloudError> {
        let url = &self.endpoints.versions_url;
        let body = self.fetcher.fetch_json(url).await?;
        let versions: VersionsResponse =
            serde_json::from_value(body).map_err(|e| SoundcloudError::invalid_json(url, e))?;
        let app = versions.app.unwrap_or_default();
        if app.is_empty() {
            warn!("versions document has no app version; continuing without one");
        }
        Ok(app)
    }

    fn resolve_request_url(&self, canonical_link: &str, app_version: &str) -> String {
        format!(
            "{}?url={}&format=json&client_id={}&app_version={}",
            self.endpoints.resolve_url,
            urlencoding::encode(canonical_link),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(app_version),
        )
    }

    fn stream_request_url(&self, descriptor: &StreamDescriptor) -> String {
        format!(
            "{}/media/soundcloud:tracks:{}/{}/stream/hls?client_id={}&track_authorization={}",
            self.endpoints.api_base_url.trim_end_matches('/'),
            descriptor.track_id,
            descriptor.stream_session_id,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&descriptor.track_authorization),
        )
    }
}

/// Pulls `(track_id, track_authorization, first transcoding url)` out of a
/// resolve response.
fn parse_resolve_response(
    url: &str,
    body: Value,
) -> Result<(String, String, String), SoundcloudError> {
    let response: ResolveResponse =
        serde_json::from_value(body).map_err(|e| SoundcloudError::invalid_json(url, e))?;

    let track_id = response
        .id
        .ok_or(SoundcloudError::missing_field("id"))?
        .into_string();
    let track_authorization = response
        .track_authorization
        .ok_or(SoundcloudError::missing_field("track_authorization"))?;
    let transcodings = response
        .media
        .and_then(|media| media.transcodings)
        .ok_or(SoundcloudError::missing_field("media.transcodings"))?;
    let first = transcodings
        .into_iter()
        .next()
        .ok_or(SoundcloudError::missing_field("media.transcodings[0]"))?;

    if let Some(format) = &first.format {
        debug!(
            preset = first.preset.as_deref().unwrap_or("unknown"),
            protocol = format.protocol.as_deref().unwrap_or("unknown"),
            mime_type = format.mime_type.as_deref().unwrap_or("unknown"),
            "using first transcoding"
        );
    }
    let transcoding_url = first
        .url
        .ok_or(SoundcloudError::missing_field("media.transcodings[0].url"))?;

    Ok((track_id, track_authorization, transcoding_url))
}

/// Extracts the path segment that immediately precedes `/stream`.
///
/// # Errors
///
/// Returns [`SoundcloudError::UuidNotFound`] when the URL has no such segment.
pub fn extract_stream_session_id(transcoding_url: &str) -> Result<String, SoundcloudError> {
    STREAM_SESSION_RE
        .captures(transcoding_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SoundcloudError::uuid_not_found(transcoding_url))
}
