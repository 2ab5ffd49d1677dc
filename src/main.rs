//! CLI entry point for the track downloader.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sc_downloader_core::{
    ClientConfig, Endpoints, RetryPolicy, SegmentObserver, SegmentOutcome, SoundcloudClient,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

/// Drives an indicatif bar from segment callbacks.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} segments {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }
}

impl SegmentObserver for ProgressObserver {
    fn on_segment(&self, _index: usize, total: usize, outcome: &SegmentOutcome) {
        self.bar.set_length(total as u64);
        if let SegmentOutcome::Skipped(skip) = outcome {
            self.bar.set_message(format!("(skipped #{})", skip.index + 1));
        }
        self.bar.inc(1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(link = %args.link, output = %args.output.display(), "CLI arguments parsed");

    let mut config = ClientConfig::new(args.oauth_token.clone(), args.client_id.clone())?
        .with_retry_policy(RetryPolicy::new(
            u32::from(args.max_attempts),
            Duration::from_millis(args.retry_delay),
        ));
    if let Some(version) = &args.app_version {
        config = config.with_app_version(version.clone());
    }
    if let Some(base_url) = &args.base_url {
        config = config.with_endpoints(Endpoints::with_base_url(base_url));
    }

    let client = SoundcloudClient::new(config)?;
    let observer = ProgressObserver::new(!args.quiet && !args.no_progress);

    info!(link = %args.link, "Downloading track");
    let report = client
        .download_with_observer(&args.link, &args.output, &observer)
        .await;
    observer.bar.finish_and_clear();
    let report = report?;

    for skipped in &report.skipped {
        warn!(
            index = skipped.index,
            url = %skipped.url,
            reason = %skipped.reason,
            "Segment missing from output"
        );
    }
    info!(
        path = %report.output_path.display(),
        track_id = %report.track_id,
        segments = report.segments_written,
        skipped = report.skipped.len(),
        bytes = report.bytes_written,
        "Download complete"
    );

    Ok(())
}
