//! Segment manifest retrieval.
//!
//! The manifest is scanned, not parsed: every `http://` or `https://` token up
//! to the next whitespace is taken as a segment reference, in document order.
//! HLS tags, comments and relative URIs are ignored. This is deliberately
//! permissive and matches what the upstream playlists contain today.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::SoundcloudError;
use crate::resolver::compile_static_regex;

static SEGMENT_URL_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"https?://\S+"));

/// Ordered segment URLs; index order is playback order.
pub type SegmentList = Vec<String>;

/// Extracts every absolute HTTP(S) URL from `text`, in order of appearance.
#[must_use]
pub fn extract_segment_urls(text: &str) -> SegmentList {
    SEGMENT_URL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Fetches the manifest at `manifest_url` and returns its segment URLs.
///
/// A single plain GET is made; manifests are not retried. An empty list is
/// returned as-is.
///
/// # Errors
///
/// - [`SoundcloudError::Network`] on a transport failure.
/// - [`SoundcloudError::HttpStatus`] on a non-success status.
#[instrument(skip(client))]
pub async fn get_segments(
    client: &Client,
    manifest_url: &str,
) -> Result<SegmentList, SoundcloudError> {
    let response = client
        .get(manifest_url)
        .send()
        .await
        .map_err(|e| SoundcloudError::network(manifest_url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SoundcloudError::http_status(manifest_url, status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| SoundcloudError::network(manifest_url, e))?;
    let text = String::from_utf8_lossy(&body);
    let segments = extract_segment_urls(&text);

    debug!(segments = segments.len(), bytes = body.len(), "manifest scanned");
    Ok(segments)
}
