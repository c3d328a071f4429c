//! Host endpoints and the URL shapes known to serve Drive files.
//!
//! All URLs are built from [`DriveEndpoints`] so the whole host set can be
//! pointed at a local test server.

use super::reference::FileId;

const DRIVE_BASE: &str = "https://drive.google.com";
const USERCONTENT_BASE: &str = "https://drive.usercontent.google.com";
const API_BASE: &str = "https://www.googleapis.com";

/// Base URLs of the three hosts involved in a Drive download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveEndpoints {
    /// Human-facing host (view pages, legacy `uc` endpoint).
    pub drive_base: String,
    /// Streaming download host.
    pub usercontent_base: String,
    /// Public API host.
    pub api_base: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            drive_base: DRIVE_BASE.to_string(),
            usercontent_base: USERCONTENT_BASE.to_string(),
            api_base: API_BASE.to_string(),
        }
    }
}

impl DriveEndpoints {
    /// Points every host at the same base URL (used with mock servers).
    #[must_use]
    pub fn single_host(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            drive_base: base.clone(),
            usercontent_base: base.clone(),
            api_base: base,
        }
    }

    fn drive(&self) -> &str {
        self.drive_base.trim_end_matches('/')
    }

    fn usercontent(&self) -> &str {
        self.usercontent_base.trim_end_matches('/')
    }

    fn api(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    /// Value sent as `Referer` and `Origin` on candidate requests.
    #[must_use]
    pub fn referer(&self) -> String {
        format!("{}/", self.drive())
    }

    /// Value sent as `Origin` on candidate requests.
    #[must_use]
    pub fn origin(&self) -> &str {
        self.drive()
    }

    /// Neutral export URL used to harvest cookies and tokens.
    #[must_use]
    pub fn probe_url(&self, id: &FileId) -> String {
        format!("{}/uc?export=download&id={id}", self.drive())
    }

    /// Human-facing info page carrying the display name.
    #[must_use]
    pub fn view_url(&self, id: &FileId) -> String {
        format!("{}/file/d/{id}/view", self.drive())
    }

    /// Resolves a form action that may be relative to the drive host.
    #[must_use]
    pub fn absolutize(&self, action: &str) -> String {
        if action.starts_with("http://") || action.starts_with("https://") {
            action.to_string()
        } else if let Some(rest) = action.strip_prefix("//") {
            format!("https://{rest}")
        } else if action.starts_with('/') {
            format!("{}{action}", self.drive())
        } else {
            format!("{}/{action}", self.drive())
        }
    }

    /// Primary streaming endpoint with `confirm=t`.
    #[must_use]
    pub fn usercontent_confirm(&self, id: &FileId) -> String {
        format!(
            "{}/download?id={id}&export=download&confirm=t",
            self.usercontent()
        )
    }

    /// Primary streaming endpoint qualified with `authuser=0`.
    #[must_use]
    pub fn usercontent_authuser(&self, id: &FileId) -> String {
        format!(
            "{}/download?id={id}&export=download&authuser=0&confirm=t",
            self.usercontent()
        )
    }

    /// Primary streaming endpoint carrying harvested tokens.
    #[must_use]
    pub fn usercontent_with_tokens(
        &self,
        id: &FileId,
        confirm: Option<&str>,
        uuid: Option<&str>,
        at: Option<&str>,
    ) -> String {
        let mut url = format!(
            "{}/download?id={id}&export=download&confirm={}",
            self.usercontent(),
            confirm.unwrap_or("t")
        );
        if let Some(uuid) = uuid {
            url.push_str("&uuid=");
            url.push_str(uuid);
        }
        if let Some(at) = at {
            url.push_str("&at=");
            url.push_str(at);
        }
        url
    }

    /// Legacy export endpoint with `confirm=t`.
    #[must_use]
    pub fn legacy_confirm(&self, id: &FileId) -> String {
        format!("{}/uc?export=download&id={id}&confirm=t", self.drive())
    }

    /// Legacy export endpoint, unqualified.
    #[must_use]
    pub fn legacy_plain(&self, id: &FileId) -> String {
        self.probe_url(id)
    }

    /// View page asking for the download variant.
    #[must_use]
    pub fn view_download(&self, id: &FileId) -> String {
        format!("{}/file/d/{id}/view?usp=download", self.drive())
    }

    /// Public API media endpoint.
    #[must_use]
    pub fn api_media(&self, id: &FileId, api_key: Option<&str>) -> String {
        match api_key {
            Some(key) => format!("{}/drive/v3/files/{id}?alt=media&key={key}", self.api()),
            None => format!("{}/drive/v3/files/{id}?alt=media", self.api()),
        }
    }

    /// Fixed candidate seed, in trial order; the API endpoint comes last.
    #[must_use]
    pub fn default_candidates(&self, id: &FileId, api_key: Option<&str>) -> Vec<String> {
        vec![
            self.usercontent_confirm(id),
            self.usercontent_authuser(id),
            self.legacy_confirm(id),
            self.legacy_plain(id),
            self.view_download(id),
            self.api_media(id, api_key),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::drive::extract_file_id;

    fn id() -> FileId {
        extract_file_id("1AbCdEfGhIjKlMnOpQrStUvWxYz").unwrap()
    }

    #[test]
    fn test_default_candidates_order_and_api_last() {
        let endpoints = DriveEndpoints::default();
        let urls = endpoints.default_candidates(&id(), None);
        assert_eq!(urls.len(), 6);
        assert!(urls[0].starts_with("https://drive.usercontent.google.com/download?id="));
        assert!(urls[1].contains("authuser=0"));
        assert!(urls[2].starts_with("https://drive.google.com/uc?export=download"));
        assert!(urls[5].starts_with("https://www.googleapis.com/drive/v3/files/"));
        assert!(!urls[5].contains("key="));
    }

    #[test]
    fn test_api_media_with_key() {
        let url = DriveEndpoints::default().api_media(&id(), Some("k123"));
        assert!(url.ends_with("?alt=media&key=k123"), "got: {url}");
    }

    #[test]
    fn test_single_host_trims_trailing_slash() {
        let endpoints = DriveEndpoints::single_host("http://127.0.0.1:9000/");
        assert_eq!(
            endpoints.probe_url(&id()),
            "http://127.0.0.1:9000/uc?export=download&id=1AbCdEfGhIjKlMnOpQrStUvWxYz"
        );
        assert_eq!(endpoints.referer(), "http://127.0.0.1:9000/");
        assert_eq!(endpoints.origin(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_absolutize_variants() {
        let endpoints = DriveEndpoints::default();
        assert_eq!(
            endpoints.absolutize("/uc?export=download"),
            "https://drive.google.com/uc?export=download"
        );
        assert_eq!(
            endpoints.absolutize("https://drive.usercontent.google.com/download"),
            "https://drive.usercontent.google.com/download"
        );
        assert_eq!(
            endpoints.absolutize("//drive.usercontent.google.com/download"),
            "https://drive.usercontent.google.com/download"
        );
    }

    #[test]
    fn test_usercontent_with_tokens_defaults_confirm_to_t() {
        let endpoints = DriveEndpoints::default();
        let url = endpoints.usercontent_with_tokens(&id(), None, Some("u-1"), Some("AT9"));
        assert!(url.contains("&confirm=t&uuid=u-1&at=AT9"), "got: {url}");
        let url = endpoints.usercontent_with_tokens(&id(), Some("xYz"), None, None);
        assert!(url.ends_with("&confirm=xYz"), "got: {url}");
    }
}
