//! Browser identity used for Drive traffic.
//!
//! Drive serves different markup (and sometimes refuses outright) to
//! non-browser clients, so every request presents as a desktop Chrome.

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue,
    UPGRADE_INSECURE_REQUESTS,
};

/// Desktop Chrome User-Agent sent on every request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Navigation-style header set that accompanies the User-Agent.
///
/// `Accept-Encoding` is left to the HTTP client so decompression stays
/// consistent with what it advertises.
#[must_use]
pub(crate) fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    for (name, value) in [
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
    ] {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_presents_as_chrome() {
        assert!(BROWSER_USER_AGENT.contains("Chrome/"));
        assert!(BROWSER_USER_AGENT.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_browser_headers_leave_encoding_to_client() {
        let headers = browser_headers();
        assert!(headers.contains_key(ACCEPT));
        assert!(headers.contains_key("sec-fetch-mode"));
        assert!(!headers.contains_key(reqwest::header::ACCEPT_ENCODING));
        assert!(!headers.contains_key(reqwest::header::USER_AGENT));
    }
}
