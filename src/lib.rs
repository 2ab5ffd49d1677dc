//! SoundCloud track downloader core library.
//!
//! Resolves a public share link into its segmented stream and reassembles the
//! segments into one MP3 file.
//!
//! # Architecture
//!
//! The pipeline runs leaf-first through these modules:
//! - [`link`] - Strips tracking query strings from share links
//! - [`fetch`] - JSON GET with fixed-delay bounded retries
//! - [`resolver`] - Share link to track descriptor and manifest location
//! - [`manifest`] - Manifest retrieval and segment URL extraction
//! - [`assembler`] - Best-effort segment download and MP3 concatenation
//! - [`client`] - [`SoundcloudClient`] facade running the whole pipeline
//!
//! Configuration lives in [`config`], errors in [`error`].

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod assembler;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod link;
pub mod manifest;
pub mod resolver;
#[cfg(test)]
pub mod test_support;
pub mod user_agent;

// Re-export commonly used types
pub use assembler::{
    AssemblyReport, SegmentAssembler, SegmentBuffer, SegmentObserver, SegmentOutcome,
    SkippedSegment,
};
pub use client::{DownloadReport, SoundcloudClient};
pub use config::{ClientConfig, DEFAULT_OUTPUT_PATH, Endpoints};
pub use error::{CLIENT_ID_LEN, SoundcloudError};
pub use fetch::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, JsonFetcher, RetryPolicy};
pub use link::canonicalize;
pub use manifest::{SegmentList, extract_segment_urls, get_segments};
pub use resolver::{ResolvedStream, StreamDescriptor, StreamResolver, extract_stream_session_id};
