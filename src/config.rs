//! Runtime configuration: storage root, size ceiling, API key, and HTTP timeouts.
//!
//! Values come from defaults, then environment variables, then CLI flags
//! (applied by the binary on top of [`FetchConfig::from_env`]).

use std::path::PathBuf;
use std::time::Duration;

use crate::drive::DriveEndpoints;
use crate::drive::constants::{
    CONNECT_TIMEOUT_SECS, INTERSTITIAL_IDLE_SECS, METADATA_TIMEOUT_SECS, PROBE_TIMEOUT_SECS,
    TRIAL_TIMEOUT_SECS,
};
use crate::limits::UploadLimits;

/// Environment variable overriding the videos directory.
pub const VIDEOS_DIR_ENV: &str = "DRIVE_FETCH_VIDEOS_DIR";

/// Environment variable carrying a Drive API key for the media endpoint.
pub const API_KEY_ENV: &str = "DRIVE_API_KEY";

const DEFAULT_VIDEOS_DIR: &str = "videos";

/// Timeouts applied to the different request classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout for every request.
    pub connect: Duration,
    /// Whole-request timeout for the cookie/token probe.
    pub probe: Duration,
    /// Whole-request timeout for the display-name lookup.
    pub metadata: Duration,
    /// Whole-request timeout for each candidate, including the body.
    pub trial: Duration,
    /// Idle gap that ends an interstitial body read.
    pub interstitial_idle: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            probe: Duration::from_secs(PROBE_TIMEOUT_SECS),
            metadata: Duration::from_secs(METADATA_TIMEOUT_SECS),
            trial: Duration::from_secs(TRIAL_TIMEOUT_SECS),
            interstitial_idle: Duration::from_secs(INTERSTITIAL_IDLE_SECS),
        }
    }
}

/// Everything a [`DriveFetcher`](crate::drive::DriveFetcher) needs besides the
/// progress callback.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Directory committed videos (and in-flight temp files) live in.
    pub videos_dir: PathBuf,
    /// Size ceiling.
    pub limits: UploadLimits,
    /// Optional API key appended to the public media endpoint.
    pub api_key: Option<String>,
    /// Request timeouts.
    pub timeouts: HttpTimeouts,
    /// Host set; defaults to the real Drive hosts.
    pub endpoints: DriveEndpoints,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            videos_dir: PathBuf::from(DEFAULT_VIDEOS_DIR),
            limits: UploadLimits::default(),
            api_key: None,
            timeouts: HttpTimeouts::default(),
            endpoints: DriveEndpoints::default(),
        }
    }
}

impl FetchConfig {
    /// Defaults overlaid with `DRIVE_FETCH_VIDEOS_DIR`, `MAX_VIDEO_SIZE_GB`
    /// and `DRIVE_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self {
            limits: UploadLimits::from_env(),
            ..Self::default()
        };
        if let Some(dir) = non_empty_env(VIDEOS_DIR_ENV) {
            config.videos_dir = PathBuf::from(dir);
        }
        config.api_key = non_empty_env(API_KEY_ENV);
        config
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Restores an env var to its previous value (or removes it) when dropped.
    struct RestoreEnv {
        key: &'static str,
        value: Option<std::ffi::OsString>,
    }

    impl RestoreEnv {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var_os(key);
            // SAFETY: callers hold ENV_LOCK while mutating the environment.
            unsafe {
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
            Self {
                key,
                value: previous,
            }
        }
    }

    impl Drop for RestoreEnv {
        fn drop(&mut self) {
            // SAFETY: restoration runs under the same ENV_LOCK guard.
            unsafe {
                match &self.value {
                    Some(v) => std::env::set_var(self.key, v),
                    None => std::env::remove_var(self.key),
                }
            }
        }
    }

    #[test]
    fn test_default_timeouts() {
        let timeouts = HttpTimeouts::default();
        assert_eq!(timeouts.probe, Duration::from_secs(30));
        assert_eq!(timeouts.metadata, Duration::from_secs(15));
        assert_eq!(timeouts.trial, Duration::from_secs(600));
        assert_eq!(timeouts.interstitial_idle, Duration::from_secs(5));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _dir = RestoreEnv::set(VIDEOS_DIR_ENV, Some("/srv/videos"));
        let _gb = RestoreEnv::set(crate::limits::MAX_VIDEO_SIZE_GB_ENV, Some("3"));
        let _key = RestoreEnv::set(API_KEY_ENV, Some("  key-1  "));

        let config = FetchConfig::from_env();
        assert_eq!(config.videos_dir, PathBuf::from("/srv/videos"));
        assert_eq!(config.limits, UploadLimits::from_gigabytes(3));
        assert_eq!(config.api_key.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_from_env_ignores_blank_and_invalid_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _dir = RestoreEnv::set(VIDEOS_DIR_ENV, Some("  "));
        let _gb = RestoreEnv::set(crate::limits::MAX_VIDEO_SIZE_GB_ENV, Some("lots"));
        let _key = RestoreEnv::set(API_KEY_ENV, None);

        let config = FetchConfig::from_env();
        assert_eq!(config.videos_dir, PathBuf::from("videos"));
        assert_eq!(config.limits, UploadLimits::default());
        assert_eq!(config.api_key, None);
    }
}
