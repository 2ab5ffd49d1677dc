//! The download facade tying the pipeline together.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

use crate::assembler::{SegmentAssembler, SegmentObserver, SkippedSegment};
use crate::config::ClientConfig;
use crate::error::SoundcloudError;
use crate::fetch::{ClientRole, JsonFetcher, build_http_client};
use crate::link::canonicalize;
use crate::manifest::get_segments;
use crate::resolver::StreamResolver;

/// Outcome of a successful [`SoundcloudClient::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    /// Where the audio was written.
    pub output_path: PathBuf,
    /// Opaque id of the downloaded track.
    pub track_id: String,
    /// Segments listed in the manifest.
    pub segments_total: usize,
    /// Segments present in the output.
    pub segments_written: usize,
    /// Segments that failed and were left out, in manifest order.
    pub skipped: Vec<SkippedSegment>,
    /// Size of the output file in bytes.
    pub bytes_written: u64,
}

/// Downloads tracks from share links.
///
/// Construction validates the configuration and builds HTTP clients but
/// performs no network I/O. Each [`download`](Self::download) call is
/// independent.
///
/// # Example
///
/// ```no_run
/// use sc_downloader_core::{ClientConfig, SoundcloudClient};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::new("OAuth 2-xxxx", "abcdefghijklmnopqrstuvwxyz012345")?;
/// let client = SoundcloudClient::new(config)?;
/// let report = client
///     .download("https://soundcloud.com/artist/track", Path::new("track.mp3"))
///     .await?;
/// println!("{} segments, {} skipped", report.segments_written, report.skipped.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SoundcloudClient {
    config: ClientConfig,
    resolver: StreamResolver,
    media: Client,
}

impl SoundcloudClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SoundcloudError::HttpClient`] if an HTTP client cannot be
    /// built (for example, a token that is not a valid header value).
    pub fn new(config: ClientConfig) -> Result<Self, SoundcloudError> {
        let fetcher = JsonFetcher::from_config(&config)?;
        let resolver = StreamResolver::new(fetcher, &config);
        let media = build_http_client(&config, ClientRole::Media)?;
        Ok(Self {
            config,
            resolver,
            media,
        })
    }

    /// Shorthand for [`ClientConfig::new`] followed by [`SoundcloudClient::new`].
    ///
    /// # Errors
    ///
    /// Returns [`SoundcloudError::InvalidClientId`] for a client id that is
    /// not 32 characters, before any network call is made.
    pub fn with_credentials(
        oauth_token: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, SoundcloudError> {
        Self::new(ClientConfig::new(oauth_token, client_id)?)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Downloads the track behind `link` into `output_path`.
    ///
    /// # Errors
    ///
    /// Aborts with the first fatal error of any stage; see
    /// [`SoundcloudError`]. Individual segment failures are not errors and
    /// are listed in [`DownloadReport::skipped`].
    pub async fn download(
        &self,
        link: &str,
        output_path: &Path,
    ) -> Result<DownloadReport, SoundcloudError> {
        self.download_with_observer(link, output_path, &()).await
    }

    /// Like [`download`](Self::download), reporting per-segment progress to
    /// `observer`.
    ///
    /// # Errors
    ///
    /// Same as [`download`](Self::download).
    #[instrument(skip(self, observer), fields(output = %output_path.display()))]
    pub async fn download_with_observer(
        &self,
        link: &str,
        output_path: &Path,
        observer: &dyn SegmentObserver,
    ) -> Result<DownloadReport, SoundcloudError> {
        let canonical = canonicalize(link);
        let host = Url::parse(&canonical)
            .ok()
            .and_then(|url| url.host_str().map(std::string::ToString::to_string))
            .unwrap_or_default();
        info!(%host, canonical = %canonical, "resolving share link");

        let app_version = match self.config.app_version() {
            Some(version) => version.to_string(),
            None => self.resolver.fetch_app_version().await?,
        };

        let resolved = self.resolver.resolve(&canonical, &app_version).await?;

        let segments = get_segments(&self.media, &resolved.manifest_url).await?;
        if segments.is_empty() {
            return Err(SoundcloudError::empty_manifest(&resolved.manifest_url));
        }
        info!(segments = segments.len(), "downloading segments");

        let assembled = SegmentAssembler::new(self.media.clone())
            .assemble(&segments, output_path, observer)
            .await?;

        Ok(DownloadReport {
            output_path: assembled.output_path,
            track_id: resolved.descriptor.track_id,
            segments_total: assembled.segments_total,
            segments_written: assembled.segments_written,
            skipped: assembled.skipped,
            bytes_written: assembled.bytes_written,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_credentials_rejects_short_client_id() {
        let result = SoundcloudClient::with_credentials("t", "abcdefghijklmnopqrstuvwxyz01234");
        assert!(matches!(
            result,
            Err(SoundcloudError::InvalidClientId { length: 31 })
        ));
    }

    #[test]
    fn test_new_keeps_config() {
        let client =
            SoundcloudClient::with_credentials("t", "abcdefghijklmnopqrstuvwxyz012345").unwrap();
        assert_eq!(client.config().client_id(), "abcdefghijklmnopqrstuvwxyz012345");
    }
}
