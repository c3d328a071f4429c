//! Constants for the Drive pipeline (timeouts, body caps, heuristics).

/// Connect timeout for every request (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Timeout for the initial cookie/token probe (30 seconds).
pub const PROBE_TIMEOUT_SECS: u64 = 30;

/// Timeout for the display-name lookup (15 seconds).
pub const METADATA_TIMEOUT_SECS: u64 = 15;

/// Timeout for each candidate request (10 minutes; large files start slowly).
pub const TRIAL_TIMEOUT_SECS: u64 = 600;

/// Idle gap after which an interstitial body read gives up (5 seconds).
pub const INTERSTITIAL_IDLE_SECS: u64 = 5;

/// Maximum redirects followed per request.
pub const MAX_REDIRECTS: usize = 10;

/// Bytes of an interstitial page read before scanning it.
pub const INTERSTITIAL_BODY_CAP: usize = 20_000;

/// Bytes of the probe page read before scanning it.
pub const PROBE_BODY_CAP: usize = 512 * 1024;

/// Declared length above which a response is treated as the real file
/// whatever its content-type.
pub const REAL_FILE_LENGTH_THRESHOLD: u64 = 100_000;

/// Smallest plausible video; anything shorter is an error page.
pub const MIN_PLAUSIBLE_FILE_BYTES: u64 = 1024;

/// Bytes read from the downloaded file for signature checks.
pub const SIGNATURE_PREFIX_LEN: usize = 512;

/// Bytes of the prefix inspected for an HTML document signature.
pub const HTML_SNIFF_LEN: usize = 100;

/// Prefix used for synthesized names when no display name is known.
pub const FALLBACK_NAME_PREFIX: &str = "gdrive";

/// Placeholder shown in progress updates when no display name is known.
pub const PLACEHOLDER_DISPLAY_NAME: &str = "Google Drive File";

/// Upper bound applied to a host-supplied `Retry-After` (1 hour).
pub const MAX_RETRY_AFTER_SECS: u64 = 3600;

/// Attempts at claiming a free final name before giving up on the commit.
pub const MAX_COMMIT_ATTEMPTS: usize = 16;
