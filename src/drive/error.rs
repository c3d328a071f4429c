//! Error types for the Drive acquisition pipeline.
//!
//! Every variant renders a message suitable for direct display to an end
//! user. Variants that need context (URL, path) are built through the helper
//! constructors below rather than `From` conversions.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can terminate a Drive download.
#[derive(Debug, Error)]
pub enum DriveError {
    /// The reference matched none of the recognized link shapes.
    #[error("invalid Google Drive URL format: '{input}'")]
    InvalidReference {
        /// The raw reference as supplied by the caller.
        input: String,
    },

    /// Display-name lookup failed. Absorbed by the prober; never returned
    /// from a download.
    #[error("could not fetch file metadata: {reason}")]
    MetadataUnavailable {
        /// Why the lookup failed.
        reason: String,
    },

    /// The host reported the file as private, forbidden, or sharing-disabled.
    #[error("File is private or sharing is disabled. Please make sure the file is publicly accessible.")]
    AccessDenied,

    /// The host reported the file as missing.
    #[error("File not found. Please check the Google Drive URL.")]
    NotFound,

    /// The host is throttling requests for this file.
    #[error("Too many requests. Please wait a few minutes and try again.")]
    RateLimited {
        /// Delay requested by the host via `Retry-After`, if any.
        retry_after: Option<Duration>,
    },

    /// Every candidate URL was tried without a specific cause being observed.
    #[error(
        "Could not download file from Google Drive. The file might be private, too large, or require special permissions."
    )]
    DownloadUnavailable,

    /// Declared or received size exceeds the configured ceiling.
    #[error("{message}")]
    FileTooLarge {
        /// Message produced by the upload limits, naming the ceiling.
        message: String,
    },

    /// The transfer produced nothing, or something too small to be a video.
    #[error("{}", empty_or_truncated_message(*bytes))]
    EmptyOrTruncated {
        /// Size of the downloaded file in bytes.
        bytes: u64,
    },

    /// The payload failed format signature validation.
    #[error("{reason}")]
    NotAVideo {
        /// Which check rejected the payload.
        reason: &'static str,
    },

    /// DNS, connect, timeout or connection-reset class failures.
    #[error("{message}")]
    TransportFailure {
        /// Friendly description of the network failure.
        message: &'static str,
        /// The URL being fetched when the failure occurred.
        url: String,
        /// The underlying transport error, when one exists.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Local filesystem error while writing, inspecting, or renaming.
    #[error("storage error at {path}: {source}")]
    StorageFailure {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

fn empty_or_truncated_message(bytes: u64) -> &'static str {
    if bytes == 0 {
        "Downloaded file is empty. The file might be private or the link is invalid."
    } else {
        "Downloaded file is too small. Please check if the Google Drive link is correct."
    }
}

impl DriveError {
    /// Creates an invalid reference error.
    pub fn invalid_reference(input: impl Into<String>) -> Self {
        Self::InvalidReference {
            input: input.into(),
        }
    }

    /// Creates a metadata error (internal to the prober).
    pub fn metadata_unavailable(reason: impl Into<String>) -> Self {
        Self::MetadataUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a size-ceiling error carrying the limits' message.
    pub fn file_too_large(message: impl Into<String>) -> Self {
        Self::FileTooLarge {
            message: message.into(),
        }
    }

    /// Creates a not-a-video error.
    #[must_use]
    pub fn not_a_video(reason: &'static str) -> Self {
        Self::NotAVideo { reason }
    }

    /// Maps a reqwest error onto a friendly transport failure.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let message = if source.is_timeout() {
            "Download timeout. Please try again."
        } else if source.is_connect() {
            "Network connection failed. Please check your internet connection."
        } else {
            "Connection was reset. Please try again."
        };
        Self::TransportFailure {
            message,
            url: url.into(),
            source: Some(source),
        }
    }

    /// Creates a transport failure for an idle read that never completed.
    pub fn transport_timeout(url: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: "Download timeout. Please try again.",
            url: url.into(),
            source: None,
        }
    }

    /// Creates a storage error.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageFailure {
            path: path.into(),
            source,
        }
    }

    /// Maps an HTTP status onto a specific failure, if the status has one.
    ///
    /// 401/403 → `AccessDenied`, 404 → `NotFound`, 429 → `RateLimited`.
    #[must_use]
    pub fn from_status(status: u16, retry_after: Option<Duration>) -> Option<Self> {
        match status {
            401 | 403 => Some(Self::AccessDenied),
            404 => Some(Self::NotFound),
            429 => Some(Self::RateLimited { retry_after }),
            _ => None,
        }
    }

    /// Returns true for failures caused by the remote host's answer rather
    /// than by the network or by local state.
    #[must_use]
    pub fn is_host_specific(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied | Self::NotFound | Self::RateLimited { .. }
        )
    }

    /// Actionable hint for the user, where one exists.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidReference { .. } => Some(
                "Paste a link like https://drive.google.com/file/d/<id>/view or the bare file id.",
            ),
            Self::AccessDenied | Self::DownloadUnavailable => {
                Some("Try downloading the file manually and uploading it instead.")
            }
            Self::NotFound => Some("Verify the link is current and the file was not deleted."),
            Self::RateLimited { .. } => {
                Some("Google Drive limits downloads of popular files; retry later.")
            }
            Self::TransportFailure { .. } => Some("Check your connection and retry."),
            _ => None,
        }
    }
}
