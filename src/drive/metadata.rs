//! Best-effort display-name lookup from the Drive view page.
//!
//! Purely cosmetic: every failure collapses to `None`.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use tracing::{debug, instrument};

use super::endpoints::DriveEndpoints;
use super::error::DriveError;
use super::reference::FileId;
use super::utils::{compile_static_regex, decode_html_entities, first_capture};

static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?i)<meta\s+property="og:title"\s+content="([^"]+)""#)
});

static TITLE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)<title>([^<]+)\s*-\s*Google Drive</title>")
});

static JSON_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#""title":"([^"]+)""#));

static DRIVE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\s*-\s*Google Drive$"));

/// Fetches display names from the view page.
#[derive(Debug, Clone)]
pub struct MetadataProber {
    client: Client,
    endpoints: DriveEndpoints,
    timeout: Duration,
}

impl MetadataProber {
    /// Creates a prober sharing `client`.
    #[must_use]
    pub fn new(client: Client, endpoints: DriveEndpoints, timeout: Duration) -> Self {
        Self {
            client,
            endpoints,
            timeout,
        }
    }

    /// Returns the file's display name, or `None` if it cannot be found.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn fetch_display_name(&self, id: &FileId) -> Option<String> {
        match self.try_fetch(id).await {
            Ok(name) => {
                debug!(name = %name, "display name found");
                Some(name)
            }
            Err(error) => {
                debug!(error = %error, "continuing without display name");
                None
            }
        }
    }

    async fn try_fetch(&self, id: &FileId) -> Result<String, DriveError> {
        let url = self.endpoints.view_url(id);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DriveError::metadata_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DriveError::metadata_unavailable(format!(
                "view page returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| DriveError::metadata_unavailable(e.to_string()))?;

        extract_display_name(&html)
            .ok_or_else(|| DriveError::metadata_unavailable("no title pattern matched"))
    }
}

/// Extracts a display name from view-page HTML.
///
/// Tries `og:title`, then `<title>... - Google Drive</title>`, then an
/// embedded JSON `"title"` field.
#[must_use]
pub fn extract_display_name(html: &str) -> Option<String> {
    let raw = first_capture(html, &OG_TITLE_RE)
        .or_else(|| first_capture(html, &TITLE_TAG_RE))
        .or_else(|| first_capture(html, &JSON_TITLE_RE))?;
    let decoded = decode_html_entities(&raw);
    let name = DRIVE_SUFFIX_RE.replace(decoded.trim(), "").trim().to_string();
    (!name.is_empty()).then_some(name)
}
