//! Browser User-Agent used for every upstream request.
//!
//! The widget and API endpoints reject obvious non-browser clients, so the
//! default identity is a desktop Firefox string.

/// Firefox release used when no explicit version is supplied.
const DEFAULT_FIREFOX_VERSION: &str = "120.0";

/// Formats a desktop Firefox User-Agent for the given release.
#[must_use]
pub fn firefox_user_agent(version: &str) -> String {
    format!(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:{version}) Gecko/20100101 Firefox/{version}"
    )
}

/// Default User-Agent for client and resolver requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    firefox_user_agent(DEFAULT_FIREFOX_VERSION)
}
