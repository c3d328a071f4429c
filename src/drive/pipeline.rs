//! End-to-end Drive download: resolve, probe, acquire, stream, validate,
//! commit.
//!
//! A download walks the [`DownloadPhase`] states in order. Every error ends
//! in [`DownloadPhase::Failed`] through a single routine that removes the temp
//! file before the error is returned; dropping the future has the same effect
//! through the temp file guard.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::build_drive_client;
use super::constants::{FALLBACK_NAME_PREFIX, MAX_COMMIT_ATTEMPTS, PLACEHOLDER_DISPLAY_NAME};
use super::error::DriveError;
use super::metadata::MetadataProber;
use super::orchestrator::{AcquiredResponse, Orchestrator};
use super::reference::{FileId, extract_file_id};
use super::signature::{ContainerFormat, sniff_container};
use super::transfer::{
    ProgressCallback, ProgressReporter, TempArtifact, read_prefix, stream_to_temp,
    verify_artifact,
};
use crate::config::FetchConfig;
use crate::filename::ensure_extension;
use crate::limits::{UploadLimits, format_bytes};
use crate::storage::VideoStorage;

/// States of one download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    /// Looking up the display name.
    Probing,
    /// Walking candidate URLs.
    Trialing,
    /// Writing the body to the temp file.
    Streaming,
    /// Size and signature checks.
    Validating,
    /// Renaming into the videos directory.
    Committing,
    /// Terminal: an error was returned and cleanup ran.
    Failed,
    /// Terminal: the artifact is in place.
    Done,
}

impl DownloadPhase {
    /// Lowercase label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Probing => "probing",
            Self::Trialing => "trialing",
            Self::Streaming => "streaming",
            Self::Validating => "validating",
            Self::Committing => "committing",
            Self::Failed => "failed",
            Self::Done => "done",
        }
    }

    /// Returns true for `Failed` and `Done`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Done)
    }
}

impl std::fmt::Display for DownloadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    /// Final name inside the videos directory.
    pub filename: String,
    /// Name before collision resolution.
    pub original_filename: String,
    /// Absolute path of the artifact.
    pub local_file_path: PathBuf,
    /// Media type of the detected container.
    pub mime_type: String,
    /// Size on disk in bytes.
    pub file_size: u64,
}

/// Mutable state of one download: its phase and its temp file guard.
#[derive(Debug)]
struct DownloadRun {
    id: String,
    phase: DownloadPhase,
    temp: TempArtifact,
}

impl DownloadRun {
    fn new(id: &FileId, videos_dir: &Path) -> Self {
        Self {
            id: id.to_string(),
            phase: DownloadPhase::Probing,
            temp: TempArtifact::reserve(videos_dir),
        }
    }

    fn advance(&mut self, next: DownloadPhase) {
        debug!(id = %self.id, from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    /// The only way into `Failed`: cleans up and hands the error back.
    fn fail(&mut self, error: DriveError) -> DriveError {
        warn!(id = %self.id, phase = %self.phase, error = %error, "download failed");
        self.temp.cleanup();
        self.phase = DownloadPhase::Failed;
        error
    }
}

/// Picks the stored name: display name, then the response's suggested name,
/// then `gdrive_<id>`; the container's extension is added when missing.
fn proposed_filename<'a>(
    display_name: Option<&'a str>,
    suggested_name: Option<&'a str>,
    id: &FileId,
    format: ContainerFormat,
) -> String {
    let usable = |name: Option<&'a str>| name.map(str::trim).filter(|name| !name.is_empty());
    let base = usable(display_name)
        .or_else(|| usable(suggested_name))
        .map_or_else(|| format!("{FALLBACK_NAME_PREFIX}_{id}"), str::to_string);
    ensure_extension(&base, format.default_extension())
}

/// Downloads public Drive videos into a local videos directory.
///
/// Cheap to share: independent downloads may run concurrently on one
/// fetcher, each with its own session, worklist and temp file.
#[derive(Debug, Clone)]
pub struct DriveFetcher {
    prober: MetadataProber,
    orchestrator: Orchestrator,
    storage: VideoStorage,
    limits: UploadLimits,
}

impl DriveFetcher {
    /// Builds a fetcher with numbered collision naming in
    /// `config.videos_dir`.
    ///
    /// # Errors
    ///
    /// `StorageFailure` if the videos directory cannot be created;
    /// `TransportFailure` if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, DriveError> {
        let storage = VideoStorage::new(&config.videos_dir)?;
        Self::with_storage(config, storage)
    }

    /// Builds a fetcher committing into `storage` (its directory overrides
    /// `config.videos_dir`).
    ///
    /// # Errors
    ///
    /// `TransportFailure` if the HTTP client cannot be built.
    pub fn with_storage(config: FetchConfig, storage: VideoStorage) -> Result<Self, DriveError> {
        let client = build_drive_client(config.timeouts.connect)?;
        let prober = MetadataProber::new(
            client.clone(),
            config.endpoints.clone(),
            config.timeouts.metadata,
        );
        let orchestrator =
            Orchestrator::new(client, config.endpoints, config.timeouts, config.api_key);
        Ok(Self {
            prober,
            orchestrator,
            storage,
            limits: config.limits,
        })
    }

    /// Where committed videos land.
    #[must_use]
    pub fn storage(&self) -> &VideoStorage {
        &self.storage
    }

    /// Size ceiling in force.
    #[must_use]
    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Downloads the file named by `reference` (share link or bare id).
    ///
    /// `progress` receives whole-percent updates when the host declares a
    /// length. On error no temp file or partial artifact is left behind.
    ///
    /// # Errors
    ///
    /// Any [`DriveError`] except `MetadataUnavailable`.
    #[instrument(skip(self, progress), fields(reference = %reference))]
    pub async fn download(
        &self,
        reference: &str,
        progress: Option<&ProgressCallback<'_>>,
    ) -> Result<DownloadResult, DriveError> {
        let id = extract_file_id(reference)?;
        let mut run = DownloadRun::new(&id, self.storage.videos_dir());

        match self.execute(&id, &mut run, progress).await {
            Ok(result) => {
                run.advance(DownloadPhase::Done);
                info!(
                    id = %id,
                    filename = %result.filename,
                    size = %format_bytes(result.file_size),
                    mime_type = %result.mime_type,
                    "download complete"
                );
                Ok(result)
            }
            Err(error) => Err(run.fail(error)),
        }
    }

    async fn execute(
        &self,
        id: &FileId,
        run: &mut DownloadRun,
        progress: Option<&ProgressCallback<'_>>,
    ) -> Result<DownloadResult, DriveError> {
        let display_name = self.prober.fetch_display_name(id).await;

        run.advance(DownloadPhase::Trialing);
        let AcquiredResponse {
            response,
            declared_size,
            suggested_name,
            source_url,
            ..
        } = self.orchestrator.acquire(id).await?;

        run.advance(DownloadPhase::Streaming);
        let reporter = ProgressReporter::new(
            progress,
            id.as_str(),
            display_name
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_DISPLAY_NAME.to_string()),
        );
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| DriveError::transport(source_url.as_str(), e)));
        let written =
            stream_to_temp(body, declared_size, &self.limits, &mut run.temp, &reporter).await?;
        debug!(id = %id, bytes = written, "body written to temp file");

        run.advance(DownloadPhase::Validating);
        let temp_path = run.temp.path().map(Path::to_path_buf).ok_or_else(|| {
            DriveError::storage(
                self.storage.videos_dir(),
                std::io::Error::other("temp file released before validation"),
            )
        })?;
        let file_size = verify_artifact(&temp_path, &self.limits).await?;
        let prefix = read_prefix(&temp_path).await?;
        let format = sniff_container(&prefix)?;

        run.advance(DownloadPhase::Committing);
        let original_filename =
            proposed_filename(display_name.as_deref(), suggested_name.as_deref(), id, format);
        let (filename, local_file_path) = self.commit(run, &original_filename).await?;

        Ok(DownloadResult {
            filename,
            original_filename,
            local_file_path,
            mime_type: format.mime_type().to_string(),
            file_size,
        })
    }

    /// Claims a free name and links the temp file there. A name taken by a
    /// concurrent download between naming and linking is skipped.
    async fn commit(
        &self,
        run: &mut DownloadRun,
        original_filename: &str,
    ) -> Result<(String, PathBuf), DriveError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let filename = self.storage.unique_name(original_filename);
            let local_file_path = self.storage.videos_dir().join(&filename);
            if run.temp.commit(&local_file_path).await? {
                return Ok((filename, local_file_path));
            }
            debug!(id = %run.id, attempt, filename = %filename, "name taken, retrying");
        }
        Err(DriveError::storage(
            self.storage.videos_dir(),
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("no free name for {original_filename}"),
            ),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id() -> FileId {
        extract_file_id("1AbCdEfGhIjKlMnOpQrStUvWxYz").unwrap()
    }

    #[test]
    fn test_proposed_filename_prefers_display_name() {
        let name = proposed_filename(Some("Lecture.mp4"), Some("other.mp4"), &id(), ContainerFormat::Mp4);
        assert_eq!(name, "Lecture.mp4");
    }

    #[test]
    fn test_proposed_filename_uses_suggested_then_fallback() {
        let name = proposed_filename(None, Some("clip"), &id(), ContainerFormat::WebM);
        assert_eq!(name, "clip.webm");

        let name = proposed_filename(None, None, &id(), ContainerFormat::Mp4);
        assert_eq!(name, "gdrive_1AbCdEfGhIjKlMnOpQrStUvWxYz.mp4");

        let name = proposed_filename(Some("   "), None, &id(), ContainerFormat::Matroska);
        assert_eq!(name, "gdrive_1AbCdEfGhIjKlMnOpQrStUvWxYz.mkv");

        let name = proposed_filename(Some(" "), Some("from-header.mp4"), &id(), ContainerFormat::Mp4);
        assert_eq!(name, "from-header.mp4");
    }

    #[test]
    fn test_phase_labels_and_terminal_states() {
        assert_eq!(DownloadPhase::Trialing.to_string(), "trialing");
        assert!(DownloadPhase::Done.is_terminal());
        assert!(DownloadPhase::Failed.is_terminal());
        assert!(!DownloadPhase::Streaming.is_terminal());
    }

    #[test]
    fn test_fail_cleans_up_and_is_terminal() {
        let temp_dir = TempDir::new().unwrap();
        let mut run = DownloadRun::new(&id(), temp_dir.path());
        let temp_path = run.temp.path().unwrap().to_path_buf();
        std::fs::write(&temp_path, b"partial").unwrap();

        run.advance(DownloadPhase::Streaming);
        let error = run.fail(DriveError::NotFound);

        assert!(matches!(error, DriveError::NotFound));
        assert_eq!(run.phase, DownloadPhase::Failed);
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_download_result_serializes_fields() {
        let result = DownloadResult {
            filename: "clip_1.mp4".to_string(),
            original_filename: "clip.mp4".to_string(),
            local_file_path: PathBuf::from("videos/clip_1.mp4"),
            mime_type: "video/mp4".to_string(),
            file_size: 2048,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["filename"], "clip_1.mp4");
        assert_eq!(json["original_filename"], "clip.mp4");
        assert_eq!(json["file_size"], 2048);
    }

    #[tokio::test]
    async fn test_invalid_reference_fails_before_network() {
        let temp_dir = TempDir::new().unwrap();
        let config = FetchConfig {
            videos_dir: temp_dir.path().to_path_buf(),
            endpoints: crate::drive::DriveEndpoints::single_host("http://127.0.0.1:9"),
            ..FetchConfig::default()
        };
        let fetcher = DriveFetcher::new(config).unwrap();
        let result = fetcher.download("not a drive link", None).await;
        assert!(matches!(result, Err(DriveError::InvalidReference { .. })));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
