//! Extraction of a canonical Drive file id from user-supplied references.
//!
//! Recognized shapes, tried in order (first match wins):
//! 1. `https://drive.google.com/file/d/<id>/view`
//! 2. `https://drive.google.com/open?id=<id>` (also `&id=` inside a query)
//! 3. `https://drive.google.com/d/<id>`
//! 4. a bare id of 25+ characters from `[A-Za-z0-9_-]`
//!
//! No network access happens here.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use super::error::DriveError;
use super::utils::{compile_static_regex, first_capture};

static FILE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"/file/d/([^/?#&\s]+)"));

static ID_QUERY_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"[?&]id=([^&#\s]+)"));

static SHORT_PATH_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"/d/([^/?#&\s]+)"));

static BARE_ID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"^[A-Za-z0-9_-]{25,}$"));

/// Canonical Drive file identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId(String);

impl FileId {
    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extracts the file id from a Drive link or bare id.
///
/// # Errors
///
/// Returns [`DriveError::InvalidReference`] when no recognized shape matches.
///
/// # Examples
///
/// ```
/// use drive_fetch_core::drive::extract_file_id;
///
/// let id = extract_file_id("https://drive.google.com/file/d/1AbCdEfGhIjKlMnOpQrStUvWxYz/view").unwrap();
/// assert_eq!(id.as_str(), "1AbCdEfGhIjKlMnOpQrStUvWxYz");
/// ```
#[instrument(level = "debug")]
pub fn extract_file_id(reference: &str) -> Result<FileId, DriveError> {
    let trimmed = reference.trim();

    for (shape, regex) in [
        ("file-path", &*FILE_PATH_RE),
        ("id-query", &*ID_QUERY_RE),
        ("short-path", &*SHORT_PATH_RE),
    ] {
        if let Some(id) = first_capture(trimmed, regex) {
            debug!(shape, id = %id, "matched reference shape");
            return Ok(FileId(id));
        }
    }

    if BARE_ID_RE.is_match(trimmed) {
        debug!(shape = "bare-id", "matched reference shape");
        return Ok(FileId(trimmed.to_string()));
    }

    Err(DriveError::invalid_reference(reference))
}
