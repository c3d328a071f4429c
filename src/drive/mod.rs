//! Google Drive video acquisition.
//!
//! Turns a share link (or bare file id) into a validated video file in a
//! local directory. Drive rarely serves the bytes on the first URL tried: it
//! answers with virus-scan warnings, quota notices and sign-in walls. The
//! pipeline therefore walks a worklist of candidate URLs, learns new ones
//! from each interstitial page, and only trusts a payload after checking its
//! size and container signature.
//!
//! # Stages
//!
//! - [`extract_file_id`] - reference resolution, no network
//! - [`MetadataProber`] - best-effort display name
//! - [`Orchestrator`] - candidate walk with probe, classification and
//!   interstitial parsing
//! - transfer and validation - streaming with a size ceiling, then
//!   signature checks and a commit that never overwrites
//!
//! [`DriveFetcher`] composes them.
//!
//! # Example
//!
//! ```no_run
//! use drive_fetch_core::{DriveFetcher, FetchConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = DriveFetcher::new(FetchConfig::from_env())?;
//! let result = fetcher
//!     .download("https://drive.google.com/file/d/1AbCdEfGhIjKlMnOpQrStUvWxYz/view", None)
//!     .await?;
//! println!("Saved {} ({} bytes)", result.local_file_path.display(), result.file_size);
//! # Ok(())
//! # }
//! ```

mod candidates;
mod client;
mod confirmation;
pub mod constants;
mod endpoints;
mod error;
mod metadata;
mod orchestrator;
mod pipeline;
mod reference;
mod signature;
mod transfer;
mod utils;

pub use candidates::CandidateList;
pub use client::build_drive_client;
pub use confirmation::{
    ConfirmationPage, PageTokens, detect_access_problem, looks_actionable,
    parse_confirmation_page,
};
pub use endpoints::DriveEndpoints;
pub use error::DriveError;
pub use metadata::{MetadataProber, extract_display_name};
pub use orchestrator::{
    AcquiredResponse, FailureLedger, Orchestrator, ResponseFacts, ResponseKind, SessionContext,
    classify, exceeds_size_heuristic, is_attachment, is_binary_content_type, parse_retry_after,
    read_bounded_prefix,
};
pub use pipeline::{DownloadPhase, DownloadResult, DriveFetcher};
pub use reference::{FileId, extract_file_id};
pub use signature::{ContainerFormat, contains_ftyp_anywhere, looks_like_html, sniff_container};
pub use transfer::{
    ProgressCallback, ProgressReporter, ProgressUpdate, TempArtifact, TransferState,
    read_prefix, stream_to_temp, verify_artifact,
};
