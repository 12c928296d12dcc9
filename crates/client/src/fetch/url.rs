//! URL validation for origin fetches.
//!
//! Cache keys use the request URL verbatim; this module only decides whether
//! a URL can be sent to the network at all.

/// Error type for URL validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host: {0}")]
    MissingHost(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse an absolute http(s) URL suitable for fetching.
///
/// Surrounding whitespace is trimmed and the fragment dropped, since it is
/// never sent on the wire. Relative URLs are rejected.
pub fn parse_fetch_url(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::MissingHost(trimmed.to_string()));
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
