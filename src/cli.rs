//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use sc_downloader_core::{DEFAULT_MAX_ATTEMPTS, DEFAULT_OUTPUT_PATH};

/// Download a SoundCloud track from its share link.
///
/// Resolves the link, fetches the track's segmented stream and joins the
/// segments into a single MP3 file.
#[derive(Parser, Debug)]
#[command(name = "sc-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Share link of the track
    pub link: String,

    /// Output file path (overwritten if it exists)
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// OAuth authorization header value, e.g. "OAuth 2-xxxxxx-..."
    #[arg(long, env = "SOUNDCLOUD_OAUTH_TOKEN", hide_env_values = true)]
    pub oauth_token: String,

    /// 32-character client id
    #[arg(long, env = "SOUNDCLOUD_CLIENT_ID", hide_env_values = true)]
    pub client_id: String,

    /// Web application version; looked up from versions.json when omitted
    #[arg(long, env = "SOUNDCLOUD_APP_VERSION")]
    pub app_version: Option<String>,

    /// Attempts per API request before giving up (1-20)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub max_attempts: u8,

    /// Delay between API attempts in milliseconds (max 60000)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay: u64,

    /// Override every upstream endpoint with one base URL (for testing)
    #[arg(long, hide = true)]
    pub base_url: Option<String>,

    /// Hide the segment progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
