//! Candidate-URL orchestration: find a URL that yields the file bytes.
//!
//! # Flow
//!
//! 1. Seed the worklist with the fixed candidate shapes (API media last).
//! 2. Probe the legacy export URL once to harvest cookies and tokens; URLs
//!    found on a probe page go in front of the defaults.
//! 3. Try candidates in order. A non-success status is recorded in the
//!    [`FailureLedger`]; a success is classified as a real file or an
//!    interstitial page.
//! 4. Interstitial pages are read (bounded), scanned for refined URLs (which
//!    are appended) and for "not accessible" phrasing (which is recorded).
//! 5. The first real file wins. On exhaustion the ledger picks the error.

use std::fmt::Display;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::header::{
    CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, HeaderMap, ORIGIN, REFERER, RETRY_AFTER, SET_COOKIE,
};
use reqwest::{Client, Response};
use tracing::{debug, info, instrument, warn};

use super::candidates::CandidateList;
use super::confirmation::{
    PageTokens, detect_access_problem, looks_actionable, parse_confirmation_page,
};
use super::constants::{
    INTERSTITIAL_BODY_CAP, MAX_RETRY_AFTER_SECS, PROBE_BODY_CAP, REAL_FILE_LENGTH_THRESHOLD,
};
use super::endpoints::DriveEndpoints;
use super::error::DriveError;
use super::reference::FileId;
use crate::config::HttpTimeouts;
use crate::filename::parse_content_disposition;

/// The winning candidate's live response plus what its headers declared.
#[derive(Debug)]
pub struct AcquiredResponse {
    /// Response whose body has not been read yet.
    pub response: Response,
    /// `Content-Length`, when the host sent one.
    pub declared_size: Option<u64>,
    /// `Content-Type` (empty when absent).
    pub content_type: String,
    /// Filename from `Content-Disposition`, when present.
    pub suggested_name: Option<String>,
    /// The candidate URL that produced the response.
    pub source_url: String,
}

/// Cookies and tokens captured from the probe; read-only afterwards.
///
/// The cookies go out with every candidate request; the tokens fill in
/// whatever a later interstitial page does not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// `name=value` pairs joined with `; `, ready for a `Cookie` header.
    pub cookies: String,
    /// Tokens found on the probe page.
    pub tokens: PageTokens,
}

/// Header facts used to decide whether a response is the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFacts {
    /// `Content-Type` (empty when absent).
    pub content_type: String,
    /// `Content-Disposition` (empty when absent).
    pub disposition: String,
    /// Declared body length.
    pub declared_size: Option<u64>,
}

impl ResponseFacts {
    fn from_response(response: &Response) -> Self {
        let headers = response.headers();
        Self {
            content_type: header_string(headers, CONTENT_TYPE),
            disposition: header_string(headers, CONTENT_DISPOSITION),
            declared_size: response.content_length(),
        }
    }
}

/// Outcome of classifying a success response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// The bytes of the file.
    RealFile,
    /// An HTML page standing between the caller and the file.
    Interstitial,
}

/// Content-type names a binary payload and is not an HTML page.
#[must_use]
pub fn is_binary_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    !content_type.contains("text/html")
        && (content_type.contains("video")
            || content_type.contains("octet-stream")
            || content_type.contains("application/"))
}

/// `Content-Disposition` marks the body as a download.
#[must_use]
pub fn is_attachment(disposition: &str) -> bool {
    disposition.to_ascii_lowercase().contains("attachment")
}

/// Declared length is larger than any interstitial page Drive serves.
#[must_use]
pub fn exceeds_size_heuristic(declared_size: Option<u64>) -> bool {
    declared_size.is_some_and(|size| size > REAL_FILE_LENGTH_THRESHOLD)
}

/// Any of the three rules marks the response as the real file.
#[must_use]
pub fn classify(facts: &ResponseFacts) -> ResponseKind {
    if is_binary_content_type(&facts.content_type)
        || is_attachment(&facts.disposition)
        || exceeds_size_heuristic(facts.declared_size)
    {
        ResponseKind::RealFile
    } else {
        ResponseKind::Interstitial
    }
}

/// Errors observed while walking the candidates.
///
/// On exhaustion the most recent host-specific error wins, then the most
/// recent transport failure, then [`DriveError::DownloadUnavailable`].
#[derive(Debug, Default)]
pub struct FailureLedger {
    last_specific: Option<DriveError>,
    last_transport: Option<DriveError>,
}

impl FailureLedger {
    /// Records one candidate failure.
    pub fn record(&mut self, error: DriveError) {
        if error.is_host_specific() {
            self.last_specific = Some(error);
        } else if matches!(error, DriveError::TransportFailure { .. }) {
            self.last_transport = Some(error);
        } else {
            debug!(error = %error, "ignoring non-specific candidate failure");
        }
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_specific.is_none() && self.last_transport.is_none()
    }

    /// Chooses the error reported when every candidate failed.
    #[must_use]
    pub fn into_error(self) -> DriveError {
        self.last_specific
            .or(self.last_transport)
            .unwrap_or(DriveError::DownloadUnavailable)
    }
}

/// Parses a `Retry-After` value (delta-seconds or HTTP-date), capped at one
/// hour. Negative and unparseable values yield `None`.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();
    let max = Duration::from_secs(MAX_RETRY_AFTER_SECS);

    if let Ok(seconds) = header_value.parse::<i64>() {
        let Ok(seconds) = u64::try_from(seconds) else {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        };
        return Some(Duration::from_secs(seconds).min(max));
    }

    match httpdate::parse_http_date(header_value) {
        Ok(when) => Some(
            when.duration_since(std::time::SystemTime::now())
                .unwrap_or(Duration::ZERO)
                .min(max),
        ),
        Err(_) => {
            debug!(header_value, "unparseable Retry-After value");
            None
        }
    }
}

/// Reads at most `cap` bytes, stopping at end of body, on a stream error, or
/// after `idle` passes without a chunk.
pub async fn read_bounded_prefix<S, B, E>(stream: S, cap: usize, idle: Duration) -> Vec<u8>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut body = Vec::new();

    while body.len() < cap {
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(Ok(chunk))) => {
                let chunk = chunk.as_ref();
                let take = chunk.len().min(cap - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Ok(Some(Err(error))) => {
                debug!(error = %error, read = body.len(), "page read interrupted");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                debug!(read = body.len(), "page read idle; using what arrived");
                break;
            }
        }
    }
    body
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Joins the `name=value` part of every `Set-Cookie` header.
fn collect_cookies(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Walks candidate URLs until one yields the file.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    client: Client,
    endpoints: DriveEndpoints,
    timeouts: HttpTimeouts,
    api_key: Option<String>,
}

impl Orchestrator {
    /// Creates an orchestrator sharing `client`.
    #[must_use]
    pub fn new(
        client: Client,
        endpoints: DriveEndpoints,
        timeouts: HttpTimeouts,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoints,
            timeouts,
            api_key,
        }
    }

    /// Returns the first candidate response that is the file itself.
    ///
    /// # Errors
    ///
    /// When every candidate fails: the most recent host-specific error
    /// (`AccessDenied`, `NotFound`, `RateLimited`), else the most recent
    /// `TransportFailure`, else `DownloadUnavailable`.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn acquire(&self, id: &FileId) -> Result<AcquiredResponse, DriveError> {
        let mut candidates =
            CandidateList::new(self.endpoints.default_candidates(id, self.api_key.as_deref()));
        let mut ledger = FailureLedger::default();

        let session = self.probe(id, &mut candidates, &mut ledger).await;

        let mut attempt = 0usize;
        while let Some(url) = candidates.next_candidate() {
            attempt += 1;
            debug!(attempt, remaining = candidates.remaining(), url = %url, "trying candidate");

            let response = match self.request_candidate(&url, &session).await {
                Ok(response) => response,
                Err(error) => {
                    debug!(url = %url, error = %error, "candidate request failed");
                    ledger.record(error);
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_retry_after);
                debug!(url = %url, status = status.as_u16(), "candidate returned error status");
                if let Some(error) = DriveError::from_status(status.as_u16(), retry_after) {
                    ledger.record(error);
                }
                continue;
            }

            let facts = ResponseFacts::from_response(&response);
            match classify(&facts) {
                ResponseKind::RealFile => {
                    info!(
                        attempt,
                        url = %url,
                        content_type = %facts.content_type,
                        declared_size = ?facts.declared_size,
                        "found downloadable response"
                    );
                    let suggested_name = parse_content_disposition(&facts.disposition);
                    return Ok(AcquiredResponse {
                        response,
                        declared_size: facts.declared_size,
                        content_type: facts.content_type,
                        suggested_name,
                        source_url: url,
                    });
                }
                ResponseKind::Interstitial => {
                    let body = read_bounded_prefix(
                        response.bytes_stream(),
                        INTERSTITIAL_BODY_CAP,
                        self.timeouts.interstitial_idle,
                    )
                    .await;
                    let html = String::from_utf8_lossy(&body);
                    let added = self.absorb_interstitial(
                        &html,
                        id,
                        &session,
                        &mut candidates,
                        &mut ledger,
                    );
                    debug!(url = %url, added, "candidate returned an interstitial page");
                }
            }
        }

        warn!(attempts = attempt, "all candidate URLs exhausted");
        Err(ledger.into_error())
    }

    /// One GET to the legacy export URL. Never fails the operation.
    async fn probe(
        &self,
        id: &FileId,
        candidates: &mut CandidateList,
        ledger: &mut FailureLedger,
    ) -> SessionContext {
        let url = self.endpoints.probe_url(id);
        let response = match self
            .client
            .get(&url)
            .timeout(self.timeouts.probe)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "probe request failed; continuing with default candidates");
                return SessionContext::default();
            }
        };

        let cookies = collect_cookies(response.headers());
        let content_type = header_string(response.headers(), CONTENT_TYPE);
        let mut tokens = PageTokens::default();

        // Error pages below 500 still carry cookies, tokens and forms.
        if !response.status().is_server_error()
            && content_type.to_ascii_lowercase().contains("text/html")
        {
            let body = read_bounded_prefix(
                response.bytes_stream(),
                PROBE_BODY_CAP,
                self.timeouts.interstitial_idle,
            )
            .await;
            let html = String::from_utf8_lossy(&body);
            if let Some(error) = detect_access_problem(&html) {
                ledger.record(error);
            }
            let page = parse_confirmation_page(
                &html,
                id,
                &self.endpoints,
                self.api_key.as_deref(),
                &PageTokens::default(),
            );
            tokens = page.tokens;
            let added = candidates.prepend_unique(page.urls);
            debug!(added, "probe page yielded candidate URLs");
        }

        debug!(
            has_cookies = !cookies.is_empty(),
            has_tokens = !tokens.is_empty(),
            "probe complete"
        );
        SessionContext { cookies, tokens }
    }

    async fn request_candidate(
        &self,
        url: &str,
        session: &SessionContext,
    ) -> Result<Response, DriveError> {
        let mut request = self
            .client
            .get(url)
            .timeout(self.timeouts.trial)
            .header(REFERER, self.endpoints.referer())
            .header(ORIGIN, self.endpoints.origin());
        if !session.cookies.is_empty() {
            request = request.header(COOKIE, session.cookies.as_str());
        }
        request
            .send()
            .await
            .map_err(|error| DriveError::transport(url, error))
    }

    /// Records access phrasing and appends refined URLs. Tokens the page
    /// lacks are taken from the probe session. Returns how many URLs were
    /// added.
    fn absorb_interstitial(
        &self,
        html: &str,
        id: &FileId,
        session: &SessionContext,
        candidates: &mut CandidateList,
        ledger: &mut FailureLedger,
    ) -> usize {
        if let Some(error) = detect_access_problem(html) {
            debug!(error = %error, "interstitial reports the file as unreachable");
            ledger.record(error);
        }
        if !looks_actionable(html) {
            return 0;
        }
        let page = parse_confirmation_page(
            html,
            id,
            &self.endpoints,
            self.api_key.as_deref(),
            &session.tokens,
        );
        candidates.extend_unique(page.urls)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures_util::stream;
    use reqwest::header::HeaderValue;

    fn facts(content_type: &str, disposition: &str, declared_size: Option<u64>) -> ResponseFacts {
        ResponseFacts {
            content_type: content_type.to_string(),
            disposition: disposition.to_string(),
            declared_size,
        }
    }

    #[test]
    fn test_binary_content_type_rule() {
        assert!(is_binary_content_type("video/mp4"));
        assert!(is_binary_content_type("application/octet-stream"));
        assert!(is_binary_content_type("application/x-matroska"));
        assert!(!is_binary_content_type("text/html; charset=utf-8"));
        assert!(!is_binary_content_type("text/plain"));
        assert!(!is_binary_content_type(""));
    }

    #[test]
    fn test_attachment_rule() {
        assert!(is_attachment(r#"attachment; filename="a.mp4""#));
        assert!(is_attachment("Attachment"));
        assert!(!is_attachment("inline"));
    }

    #[test]
    fn test_size_heuristic_threshold() {
        assert!(!exceeds_size_heuristic(None));
        assert!(!exceeds_size_heuristic(Some(100_000)));
        assert!(exceeds_size_heuristic(Some(100_001)));
    }

    #[test]
    fn test_classify_any_rule_wins() {
        assert_eq!(classify(&facts("video/mp4", "", None)), ResponseKind::RealFile);
        assert_eq!(
            classify(&facts("text/html", "attachment", None)),
            ResponseKind::RealFile
        );
        assert_eq!(
            classify(&facts("text/html", "", Some(5_000_000))),
            ResponseKind::RealFile
        );
        assert_eq!(
            classify(&facts("text/html; charset=utf-8", "", Some(4_000))),
            ResponseKind::Interstitial
        );
    }

    #[test]
    fn test_ledger_prefers_latest_specific_error() {
        let mut ledger = FailureLedger::default();
        ledger.record(DriveError::AccessDenied);
        ledger.record(DriveError::transport_timeout("https://a"));
        ledger.record(DriveError::NotFound);
        ledger.record(DriveError::transport_timeout("https://b"));
        assert!(matches!(ledger.into_error(), DriveError::NotFound));
    }

    #[test]
    fn test_ledger_falls_back_to_transport_then_generic() {
        let mut ledger = FailureLedger::default();
        ledger.record(DriveError::transport_timeout("https://a"));
        assert!(matches!(
            ledger.into_error(),
            DriveError::TransportFailure { .. }
        ));

        let ledger = FailureLedger::default();
        assert!(ledger.is_empty());
        assert!(matches!(ledger.into_error(), DriveError::DownloadUnavailable));
    }

    #[test]
    fn test_ledger_ignores_non_specific_errors() {
        let mut ledger = FailureLedger::default();
        ledger.record(DriveError::DownloadUnavailable);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_parse_retry_after_seconds_and_cap() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 7 "), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("999999"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_retry_after("-5"), None);
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_parse_retry_after_past_date_is_zero() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_collect_cookies_keeps_name_value_pairs() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("NID=511=abc; expires=Sat, 01 Jan 2030 00:00:00 GMT; path=/"),
        );
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("download_warning_x=tok; Path=/uc; HttpOnly"),
        );
        assert_eq!(
            collect_cookies(&headers),
            "NID=511=abc; download_warning_x=tok"
        );
        assert_eq!(collect_cookies(&HeaderMap::new()), "");
    }

    #[tokio::test]
    async fn test_read_bounded_prefix_stops_at_cap() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![Ok(vec![b'a'; 15]), Ok(vec![b'b'; 15])];
        let body = read_bounded_prefix(stream::iter(chunks), 20, Duration::from_secs(1)).await;
        assert_eq!(body.len(), 20);
        assert_eq!(&body[15..], b"bbbbb");
    }

    #[tokio::test]
    async fn test_read_bounded_prefix_keeps_data_before_error() {
        let chunks: Vec<Result<Vec<u8>, String>> =
            vec![Ok(b"<html>".to_vec()), Err("reset".to_string())];
        let body = read_bounded_prefix(stream::iter(chunks), 1000, Duration::from_secs(1)).await;
        assert_eq!(body, b"<html>");
    }

    #[tokio::test]
    async fn test_read_bounded_prefix_gives_up_when_idle() {
        let first = stream::iter(vec![Ok::<Vec<u8>, String>(b"partial".to_vec())]);
        let stalled = first.chain(stream::pending());
        let body = read_bounded_prefix(stalled, 1000, Duration::from_millis(50)).await;
        assert_eq!(body, b"partial");
    }
}
