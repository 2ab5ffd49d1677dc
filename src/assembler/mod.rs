//! Best-effort segment download and reassembly.
//!
//! Segments are fetched one at a time, in manifest order. A failed segment is
//! not retried and does not abort the download: it becomes a
//! [`SegmentOutcome::Skipped`] entry, is logged, and is counted in the
//! [`AssemblyReport`]. Only fetched buffers are folded into the output, which
//! is written in a single write once every segment has been attempted.

mod container;

pub use container::Mp3Accumulator;

use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::error::SoundcloudError;

/// Raw bytes of one fetched segment, tagged with its manifest position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentBuffer {
    /// Zero-based index in the segment list.
    pub index: usize,
    /// Segment payload.
    pub bytes: Vec<u8>,
}

/// A segment that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSegment {
    /// Zero-based index in the segment list.
    pub index: usize,
    /// The segment URL.
    pub url: String,
    /// Why it was skipped, e.g. `HTTP 404`.
    pub reason: String,
}

/// Outcome of fetching one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    Fetched(SegmentBuffer),
    Skipped(SkippedSegment),
}

/// Receives per-segment progress callbacks.
///
/// Observers are borrowed across `.await` points, so they must be shareable
/// for the download future to be spawnable.
pub trait SegmentObserver: Send + Sync {
    /// Called after segment `index` of `total` has been attempted.
    fn on_segment(&self, index: usize, total: usize, outcome: &SegmentOutcome);
}

/// Observer that ignores every event.
impl SegmentObserver for () {
    fn on_segment(&self, _index: usize, _total: usize, _outcome: &SegmentOutcome) {}
}

/// Summary of one assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Where the output was written.
    pub output_path: PathBuf,
    /// Segments listed in the manifest.
    pub segments_total: usize,
    /// Segments folded into the output.
    pub segments_written: usize,
    /// Segments dropped, in manifest order.
    pub skipped: Vec<SkippedSegment>,
    /// Size of the output file.
    pub bytes_written: u64,
}

impl AssemblyReport {
    /// Returns true when at least one segment was dropped.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Downloads segments and writes the concatenated output.
#[derive(Debug, Clone)]
pub struct SegmentAssembler {
    client: Client,
}

impl SegmentAssembler {
    /// Creates an assembler over an (unauthenticated) media client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches every URL in order, returning one outcome per URL.
    pub async fn fetch_segments(
        &self,
        segment_urls: &[String],
        observer: &dyn SegmentObserver,
    ) -> Vec<SegmentOutcome> {
        let total = segment_urls.len();
        let mut outcomes = Vec::with_capacity(total);
        for (index, url) in segment_urls.iter().enumerate() {
            let outcome = self.fetch_segment(index, url).await;
            observer.on_segment(index, total, &outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn fetch_segment(&self, index: usize, url: &str) -> SegmentOutcome {
        let skipped = |reason: String| {
            warn!(index, url, %reason, "skipping segment");
            SegmentOutcome::Skipped(SkippedSegment {
                index,
                url: url.to_string(),
                reason,
            })
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return skipped(format!("network error: {e}")),
        };
        let status = response.status();
        if !status.is_success() {
            return skipped(format!("HTTP {}", status.as_u16()));
        }
        match response.bytes().await {
            Ok(body) => {
                debug!(index, bytes = body.len(), "segment fetched");
                SegmentOutcome::Fetched(SegmentBuffer {
                    index,
                    bytes: body.to_vec(),
                })
            }
            Err(e) => skipped(format!("body read error: {e}")),
        }
    }

    /// Fetches `segment_urls`, concatenates the successful ones in order, and
    /// writes the result to `output_path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// - [`SoundcloudError::NoSegmentsFetched`] when no segment succeeded;
    ///   nothing is written in that case.
    /// - [`SoundcloudError::Io`] when the output cannot be written.
    #[instrument(
        skip(self, segment_urls, observer),
        fields(segments = segment_urls.len(), output = %output_path.display())
    )]
    pub async fn assemble(
        &self,
        segment_urls: &[String],
        output_path: &Path,
        observer: &dyn SegmentObserver,
    ) -> Result<AssemblyReport, SoundcloudError> {
        let outcomes = self.fetch_segments(segment_urls, observer).await;
        let (audio, skipped) = fold_outcomes(outcomes);

        if audio.segment_count() == 0 {
            return Err(SoundcloudError::NoSegmentsFetched {
                skipped: skipped.len(),
            });
        }

        let segments_written = audio.segment_count();
        let bytes = audio.into_bytes();
        tokio::fs::write(output_path, &bytes)
            .await
            .map_err(|e| SoundcloudError::io(output_path, e))?;

        let report = AssemblyReport {
            output_path: output_path.to_path_buf(),
            segments_total: segment_urls.len(),
            segments_written,
            skipped,
            bytes_written: bytes.len() as u64,
        };
        if report.is_partial() {
            warn!(
                skipped = report.skipped.len(),
                total = report.segments_total,
                "output is missing segments"
            );
        }
        info!(
            segments = report.segments_written,
            bytes = report.bytes_written,
            "output written"
        );
        Ok(report)
    }
}

/// Folds fetched buffers in index order and collects skipped entries.
fn fold_outcomes(mut outcomes: Vec<SegmentOutcome>) -> (Mp3Accumulator, Vec<SkippedSegment>) {
    outcomes.sort_by_key(|outcome| match outcome {
        SegmentOutcome::Fetched(buffer) => buffer.index,
        SegmentOutcome::Skipped(skip) => skip.index,
    });

    let mut audio = Mp3Accumulator::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            SegmentOutcome::Fetched(buffer) => audio.append(&buffer.bytes),
            SegmentOutcome::Skipped(skip) => skipped.push(skip),
        }
    }
    (audio, skipped)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    async fn mount_segment(server: &MockServer, name: &str, status: u16, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/seg/{name}")))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(body.to_vec()))
            .expect(1)
            .mount(server)
            .await;
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<(usize, usize, bool)>>,
    }

    impl SegmentObserver for RecordingObserver {
        fn on_segment(&self, index: usize, total: usize, outcome: &SegmentOutcome) {
            let fetched = matches!(outcome, SegmentOutcome::Fetched(_));
            self.events.lock().unwrap().push((index, total, fetched));
        }
    }

    #[tokio::test]
    async fn test_failed_middle_segment_is_dropped() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_segment(&server, "1", 200, b"AAA").await;
        mount_segment(&server, "2", 500, b"error").await;
        mount_segment(&server, "3", 200, b"CCC").await;

        let urls: Vec<String> = ["1", "2", "3"]
            .iter()
            .map(|n| format!("{}/seg/{n}", server.uri()))
            .collect();
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.mp3");
        let observer = RecordingObserver::default();

        let report = SegmentAssembler::new(Client::new())
            .assemble(&urls, &output, &observer)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"AAACCC");
        assert_eq!(report.segments_total, 3);
        assert_eq!(report.segments_written, 2);
        assert_eq!(report.bytes_written, 6);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.skipped[0].url, urls[1]);
        assert_eq!(report.skipped[0].reason, "HTTP 500");
        assert!(report.is_partial());
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec![(0, 3, true), (1, 3, false), (2, 3, true)]
        );
    }

    #[tokio::test]
    async fn test_existing_output_is_overwritten() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_segment(&server, "only", 200, b"new").await;

        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.mp3");
        std::fs::write(&output, b"old contents that are longer").unwrap();

        let urls = vec![format!("{}/seg/only", server.uri())];
        let report = SegmentAssembler::new(Client::new())
            .assemble(&urls, &output, &())
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"new");
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_all_segments_failed_writes_nothing() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_segment(&server, "a", 404, b"").await;
        mount_segment(&server, "b", 403, b"").await;

        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.mp3");
        let urls = vec![
            format!("{}/seg/a", server.uri()),
            format!("{}/seg/b", server.uri()),
        ];

        let result = SegmentAssembler::new(Client::new())
            .assemble(&urls, &output, &())
            .await;

        assert!(
            matches!(result, Err(SoundcloudError::NoSegmentsFetched { skipped: 2 })),
            "got: {result:?}"
        );
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_is_io_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_segment(&server, "x", 200, b"data").await;

        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("missing-dir").join("out.mp3");
        let urls = vec![format!("{}/seg/x", server.uri())];

        let result = SegmentAssembler::new(Client::new())
            .assemble(&urls, &output, &())
            .await;
        assert!(matches!(result, Err(SoundcloudError::Io { .. })), "got: {result:?}");
    }

    #[test]
    fn test_fold_outcomes_orders_by_index() {
        let outcomes = vec![
            SegmentOutcome::Fetched(SegmentBuffer {
                index: 2,
                bytes: b"C".to_vec(),
            }),
            SegmentOutcome::Skipped(SkippedSegment {
                index: 1,
                url: "u".to_string(),
                reason: "HTTP 500".to_string(),
            }),
            SegmentOutcome::Fetched(SegmentBuffer {
                index: 0,
                bytes: b"A".to_vec(),
            }),
        ];
        let (audio, skipped) = fold_outcomes(outcomes);
        assert_eq!(audio.into_bytes(), b"AC");
        assert_eq!(skipped.len(), 1);
    }
}
