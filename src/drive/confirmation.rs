//! Scraping of Drive's interstitial "confirmation" pages.
//!
//! Drive answers large or unscanned files with an HTML page (virus-scan
//! warning, quota notice, sign-in wall) instead of the bytes. The page
//! usually carries a form whose action plus hidden fields form a working
//! download URL, and tokens (`confirm`, `uuid`, `at`) that unlock the
//! streaming endpoint.

use std::sync::LazyLock;

use regex::Regex;
use url::form_urlencoded;

use super::endpoints::DriveEndpoints;
use super::error::DriveError;
use super::reference::FileId;
use super::utils::{compile_static_regex, decode_html_entities, first_capture};

static FORM_ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"action="([^"]+)""#));

static HIDDEN_INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"(?i)<input[^>]+type="hidden"[^>]*>"#));

static INPUT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r#"name="([^"]+)""#));

static INPUT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"value="([^"]*)""#));

static CONFIRM_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\bconfirm=([0-9A-Za-z_-]+)"));

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?i)\buuid=([0-9a-f-]+)"));

static AT_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r#"\bat=([^&"\s]+)"#));

/// Tokens harvested from an interstitial page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTokens {
    /// Download confirmation token.
    pub confirm: Option<String>,
    /// Per-download session uuid.
    pub uuid: Option<String>,
    /// Signed access token.
    pub at: Option<String>,
}

impl PageTokens {
    /// Returns true when no token was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.confirm.is_none() && self.uuid.is_none() && self.at.is_none()
    }

    /// Fills each missing token from `known`.
    #[must_use]
    pub fn or_known(self, known: &PageTokens) -> Self {
        Self {
            confirm: self.confirm.or_else(|| known.confirm.clone()),
            uuid: self.uuid.or_else(|| known.uuid.clone()),
            at: self.at.or_else(|| known.at.clone()),
        }
    }
}

/// Result of scanning one interstitial page.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationPage {
    /// Refined candidate URLs, most promising first.
    pub urls: Vec<String>,
    /// Tokens found on the page.
    pub tokens: PageTokens,
}

/// Returns true when the page looks like it carries a way forward.
#[must_use]
pub fn looks_actionable(html: &str) -> bool {
    html.contains("download anyway") || html.contains("confirm=") || html.contains("action=")
}

/// Maps "file is not reachable" phrasing to the matching failure.
#[must_use]
pub fn detect_access_problem(html: &str) -> Option<DriveError> {
    if html.contains("Too many users have viewed or downloaded") {
        Some(DriveError::RateLimited { retry_after: None })
    } else if html.contains("file does not exist") {
        Some(DriveError::NotFound)
    } else if html.contains("Sorry, you can") {
        Some(DriveError::AccessDenied)
    } else {
        None
    }
}

/// Hidden `<input>` fields as `(name, value)` pairs, in page order.
fn hidden_fields(html: &str) -> Vec<(String, String)> {
    HIDDEN_INPUT_RE
        .find_iter(html)
        .filter_map(|input| {
            let tag = input.as_str();
            let name = INPUT_NAME_RE
                .captures(tag)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())?;
            let value = INPUT_VALUE_RE
                .captures(tag)
                .and_then(|caps| caps.get(1))
                .map_or_else(String::new, |m| decode_html_entities(m.as_str()));
            Some((name, value))
        })
        .collect()
}

fn form_url(html: &str, fields: &[(String, String)], endpoints: &DriveEndpoints) -> Option<String> {
    let action = FORM_ACTION_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_html_entities(m.as_str()))?;
    if fields.is_empty() {
        return None;
    }
    let action = endpoints.absolutize(&action);
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    let separator = if action.contains('?') { '&' } else { '?' };
    Some(format!("{action}{separator}{query}"))
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.as_str())
}

fn extract_tokens(html: &str, fields: &[(String, String)]) -> PageTokens {
    let decoded = html.replace("&amp;", "&");
    PageTokens {
        confirm: first_capture(&decoded, &CONFIRM_RE)
            .or_else(|| field(fields, "confirm").map(str::to_string)),
        uuid: first_capture(&decoded, &UUID_RE)
            .or_else(|| field(fields, "uuid").map(str::to_string)),
        at: first_capture(&decoded, &AT_RE).or_else(|| field(fields, "at").map(str::to_string)),
    }
}

/// Scans an interstitial page for refined download URLs and tokens.
///
/// URL order: the reconstructed form URL (if any), the streaming endpoint
/// carrying harvested tokens, then the fixed `confirm=t` variants and the
/// API media endpoint. Tokens absent from the page are taken from `known`.
#[must_use]
pub fn parse_confirmation_page(
    html: &str,
    id: &FileId,
    endpoints: &DriveEndpoints,
    api_key: Option<&str>,
    known: &PageTokens,
) -> ConfirmationPage {
    let fields = hidden_fields(html);
    let tokens = extract_tokens(html, &fields).or_known(known);

    let mut urls = Vec::new();
    if let Some(url) = form_url(html, &fields, endpoints) {
        urls.push(url);
    }
    urls.push(endpoints.usercontent_with_tokens(
        id,
        tokens.confirm.as_deref(),
        tokens.uuid.as_deref(),
        tokens.at.as_deref(),
    ));
    urls.push(endpoints.usercontent_authuser(id));
    urls.push(endpoints.legacy_confirm(id));
    urls.push(endpoints.api_media(id, api_key));
    urls.dedup();

    ConfirmationPage { urls, tokens }
}
