//! Target URL validation and derived URLs.

use stealth_fetch_core::Error;

/// Error type for URL validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("Only http/https URLs are supported.")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Parse a target URL, accepting only absolute `http://` and `https://` URLs.
///
/// Unlike browser address bars no scheme is assumed, so `example.com` is
/// rejected rather than rewritten.
pub fn parse_http_url(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let lowered = trimmed.to_ascii_lowercase();
    if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
        return Err(UrlError::UnsupportedScheme(trimmed.to_string()));
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::InvalidUrl(format!("missing host in {trimmed}")));
    }

    Ok(parsed)
}

/// The `robots.txt` URL for the site serving `page`: `{scheme}://{host[:port]}/robots.txt`.
pub fn robots_url(page: &url::Url) -> url::Url {
    let mut robots = page.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    // Credentials belong to the page request, not the site root.
    let _ = robots.set_username("");
    let _ = robots.set_password(None);
    robots
}

/// Resolve `href` against `base`, falling back to the raw href when it cannot be joined.
pub fn resolve_href(base: &url::Url, href: &str) -> String {
    base.join(href).map(|u| u.to_string()).unwrap_or_else(|_| href.to_string())
}
