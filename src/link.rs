//! Share-link canonicalization.

/// Substring that marks a link as carrying tracking parameters.
pub const TRACKING_MARKER: &str = "utm_source";

/// Strips the query string from a share link that carries tracking parameters.
///
/// When `link` contains [`TRACKING_MARKER`] anywhere, everything from the
/// first `?` onward is dropped, including any non-tracking parameters. Links
/// without the marker are returned unchanged.
///
/// # Example
///
/// ```
/// use sc_downloader_core::link::canonicalize;
///
/// assert_eq!(
///     canonicalize("https://soundcloud.com/artist/track?utm_source=clipboard&si=1"),
///     "https://soundcloud.com/artist/track"
/// );
/// assert_eq!(
///     canonicalize("https://soundcloud.com/artist/track?in=sets"),
///     "https://soundcloud.com/artist/track?in=sets"
/// );
/// ```
#[must_use]
pub fn canonicalize(link: &str) -> String {
    if !link.contains(TRACKING_MARKER) {
        return link.to_string();
    }
    match link.find('?') {
        Some(query_start) => link[..query_start].to_string(),
        None => link.to_string(),
    }
}
