//! Drive Fetch Core Library
//!
//! Downloads publicly shared Google Drive videos into a local directory,
//! working around Drive's confirmation pages and validating that what
//! arrives is a video before it is committed.
//!
//! # Architecture
//!
//! - [`drive`] - reference resolution, candidate orchestration, streaming
//!   transfer and validation
//! - [`config`] - runtime configuration from defaults and environment
//! - [`limits`] - the video size ceiling
//! - [`storage`] - the videos directory and collision-free naming
//! - [`filename`] - filename sanitizing and `Content-Disposition` parsing

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod drive;
pub mod filename;
pub mod limits;
pub mod storage;
pub mod user_agent;

// Re-export commonly used types
pub use config::{FetchConfig, HttpTimeouts};
pub use drive::{
    DownloadPhase, DownloadResult, DriveEndpoints, DriveError, DriveFetcher, FileId,
    ProgressCallback, ProgressUpdate, extract_file_id,
};
pub use limits::UploadLimits;
pub use storage::{NumberedNamer, UniqueNamer, VideoStorage};
