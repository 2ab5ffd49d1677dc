//! Error types for the download pipeline.
//!
//! Every fatal condition of a `download` call maps onto one
//! [`SoundcloudError`] variant. Segment fetch failures are intentionally absent:
//! the assembler records them as skipped segments in the report instead.

use std::path::PathBuf;

use thiserror::Error;

/// Required length of a SoundCloud client identifier.
pub const CLIENT_ID_LEN: usize = 32;

/// Errors that can abort client construction or a download.
#[derive(Debug, Error)]
pub enum SoundcloudError {
    /// The configured client id does not have the required length.
    #[error("invalid client id: expected {} characters, got {length}", CLIENT_ID_LEN)]
    InvalidClientId {
        /// Length of the rejected client id, in characters.
        length: usize,
    },

    /// A JSON endpoint kept failing until the retry budget ran out.
    #[error("failed to get valid JSON from {url} after {attempts} attempt(s)")]
    FetchExhausted {
        /// The URL that never succeeded.
        url: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// A JSON endpoint answered with a success status but a non-JSON body.
    #[error("response from {url} is not valid JSON: {source}")]
    InvalidJson {
        /// The URL whose body failed to parse.
        url: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The stream session id could not be found in a transcoding URL.
    #[error("track stream id not found in transcoding URL {url}")]
    UuidNotFound {
        /// The transcoding URL that was searched.
        url: String,
    },

    /// An expected key was absent from an API response.
    #[error("missing field '{field}' in API response")]
    MissingField {
        /// JSON path of the missing field, e.g. `media.transcodings[0].url`.
        field: &'static str,
    },

    /// Non-success HTTP status on a request that is not retried.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Transport-level failure on a request that is not retried.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The requested URL.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The manifest contained no segment URLs.
    #[error("manifest at {url} lists no segments")]
    EmptyManifest {
        /// The manifest URL.
        url: String,
    },

    /// Every segment listed in the manifest failed to download.
    #[error("all {skipped} segment(s) failed to download; nothing to write")]
    NoSegmentsFetched {
        /// Number of skipped segments.
        skipped: usize,
    },

    /// Writing the output file failed.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The output path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    HttpClient {
        /// Why construction failed.
        reason: String,
    },
}

impl SoundcloudError {
    /// Creates a `FetchExhausted` error.
    pub fn fetch_exhausted(url: impl Into<String>, attempts: u32) -> Self {
        Self::FetchExhausted {
            url: url.into(),
            attempts,
        }
    }

    /// Creates an `InvalidJson` error.
    pub fn invalid_json(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidJson {
            url: url.into(),
            source,
        }
    }

    /// Creates a `UuidNotFound` error.
    pub fn uuid_not_found(url: impl Into<String>) -> Self {
        Self::UuidNotFound { url: url.into() }
    }

    /// Creates a `MissingField` error.
    #[must_use]
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Creates an `HttpStatus` error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a `Network` error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an `EmptyManifest` error.
    pub fn empty_manifest(url: impl Into<String>) -> Self {
        Self::EmptyManifest { url: url.into() }
    }

    /// Creates an `Io` error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an `HttpClient` construction error.
    pub fn http_client(reason: impl Into<String>) -> Self {
        Self::HttpClient {
            reason: reason.into(),
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// URL or path, which the source errors do not carry.
