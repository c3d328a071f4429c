//! Upload size limits shared by every download.
//!
//! The ceiling defaults to 200 GB and can be overridden with the
//! `MAX_VIDEO_SIZE_GB` environment variable.

/// Environment variable holding the ceiling in whole gigabytes.
pub const MAX_VIDEO_SIZE_GB_ENV: &str = "MAX_VIDEO_SIZE_GB";

/// Default ceiling in gigabytes.
pub const DEFAULT_MAX_VIDEO_SIZE_GB: u64 = 200;

const GIB: u64 = 1024 * 1024 * 1024;

/// Maximum artifact size configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Largest accepted artifact, in bytes.
    pub max_video_size_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_gigabytes(DEFAULT_MAX_VIDEO_SIZE_GB)
    }
}

impl UploadLimits {
    /// Creates limits with an explicit byte ceiling.
    #[must_use]
    pub fn new(max_video_size_bytes: u64) -> Self {
        Self {
            max_video_size_bytes,
        }
    }

    /// Creates limits from a ceiling in whole gigabytes.
    #[must_use]
    pub fn from_gigabytes(gigabytes: u64) -> Self {
        Self::new(gigabytes.saturating_mul(GIB))
    }

    /// Reads `MAX_VIDEO_SIZE_GB`, falling back to the default when unset,
    /// unparsable, or zero.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(MAX_VIDEO_SIZE_GB_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|gb| *gb > 0)
            .map_or_else(Self::default, Self::from_gigabytes)
    }

    /// Returns true if `size` exceeds the ceiling.
    #[must_use]
    pub fn is_too_large(&self, size: u64) -> bool {
        size > self.max_video_size_bytes
    }

    /// User-facing message naming the ceiling.
    #[must_use]
    pub fn too_large_message(&self) -> String {
        format!(
            "File too large. Maximum size is {}.",
            format_as_gb(self.max_video_size_bytes)
        )
    }
}

/// Formats a byte count as whole gigabytes, e.g. `200GB`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_as_gb(bytes: u64) -> String {
    let gb = bytes as f64 / GIB as f64;
    format!("{}GB", gb.round() as u64)
}

/// Formats a byte count for logs, e.g. `1.5 MB`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[exponent])
}
