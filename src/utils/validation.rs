//! URL and input validation utilities

use anyhow::{anyhow, Result};
use url::{ParseError, Url};

/// Parse a URL and require an http(s) scheme.
///
/// Input pasted without a scheme (`youtube.com/watch?v=...`) is read as https.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = match Url::parse(url) {
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", url)),
        other => other,
    }
    .map_err(|e| anyhow!("Invalid URL format: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(anyhow!("Unsupported URL scheme: {}", other)),
    }
}

/// A URL names a playlist when it carries a `list=` parameter or a `/playlist` path
pub fn is_playlist_url(url: &Url) -> bool {
    url.path().trim_end_matches('/').ends_with("/playlist") || extract_playlist_id(url).is_some()
}

/// Extract the `list=` parameter of a playlist URL
pub fn extract_playlist_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == "list" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}
