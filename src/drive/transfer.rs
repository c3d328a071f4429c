//! Streaming of the winning response into a temp file, post-transfer checks,
//! and the atomic commit into the videos directory.
//!
//! The temp file is owned by a [`TempArtifact`] guard. Whatever ends the
//! operation (error, early return, or the future being dropped) the guard
//! removes the file unless [`TempArtifact::commit`] linked it into place.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::constants::{MIN_PLAUSIBLE_FILE_BYTES, SIGNATURE_PREFIX_LEN};
use super::error::DriveError;
use crate::limits::UploadLimits;

/// One progress tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Drive file id.
    pub id: String,
    /// Display name (or a placeholder).
    pub filename: String,
    /// Whole percent complete, 1..=100.
    pub percent: u8,
}

/// Progress callback invoked at most once per whole percentage point.
pub type ProgressCallback<'a> = dyn Fn(&ProgressUpdate) + Send + Sync + 'a;

/// Counters for one streaming operation.
#[derive(Debug, Clone, Default)]
pub struct TransferState {
    received: u64,
    total: u64,
    last_percent: u8,
}

impl TransferState {
    /// Starts a transfer with a declared total (0 when unknown).
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            received: 0,
            total,
            last_percent: 0,
        }
    }

    /// Bytes received so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Records `len` more bytes. Returns the new percentage when it advanced
    /// past the last reported one.
    pub fn record(&mut self, len: u64) -> Option<u8> {
        self.received = self.received.saturating_add(len);
        if self.total == 0 {
            return None;
        }
        let percent = self.received.saturating_mul(100) / self.total;
        let percent = u8::try_from(percent.min(100)).unwrap_or(100);
        if percent > self.last_percent {
            self.last_percent = percent;
            Some(percent)
        } else {
            None
        }
    }
}

/// Delivers progress ticks to an optional callback, isolating its panics.
pub struct ProgressReporter<'a> {
    callback: Option<&'a ProgressCallback<'a>>,
    id: String,
    filename: String,
}

impl<'a> ProgressReporter<'a> {
    /// Creates a reporter for one file.
    #[must_use]
    pub fn new(
        callback: Option<&'a ProgressCallback<'a>>,
        id: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            callback,
            id: id.into(),
            filename: filename.into(),
        }
    }

    /// Invokes the callback; a panic inside it is logged and swallowed.
    pub fn report(&self, percent: u8) {
        let Some(callback) = self.callback else {
            return;
        };
        let update = ProgressUpdate {
            id: self.id.clone(),
            filename: self.filename.clone(),
            percent,
        };
        if catch_unwind(AssertUnwindSafe(|| callback(&update))).is_err() {
            warn!(percent, "progress callback panicked; continuing transfer");
        }
    }
}

/// Guard over an in-flight temp file.
#[derive(Debug)]
pub struct TempArtifact {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl TempArtifact {
    /// Chooses a fresh temp path in `dir` without touching the filesystem.
    #[must_use]
    pub fn reserve(dir: &Path) -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        Self {
            path: Some(dir.join(format!("temp_{millis}_{suffix}"))),
            writer: None,
        }
    }

    /// Path of the temp file while it is still owned by the guard.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn open(&mut self) -> Result<(), DriveError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let file = File::create(&path)
            .await
            .map_err(|e| DriveError::storage(path, e))?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    async fn write(&mut self, chunk: &[u8]) -> Result<(), DriveError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(DriveError::storage(
                self.path.clone().unwrap_or_default(),
                std::io::Error::other("temp file is not open"),
            ));
        };
        if let Err(e) = writer.write_all(chunk).await {
            return Err(DriveError::storage(self.path.clone().unwrap_or_default(), e));
        }
        Ok(())
    }

    async fn finish_writing(&mut self) -> Result<(), DriveError> {
        if let Some(mut writer) = self.writer.take() {
            let path = self.path.clone().unwrap_or_default();
            writer
                .flush()
                .await
                .map_err(|e| DriveError::storage(path.clone(), e))?;
            writer
                .into_inner()
                .sync_all()
                .await
                .map_err(|e| DriveError::storage(path, e))?;
        }
        Ok(())
    }

    /// Links the temp file into place at `final_path` and releases the
    /// guard. Never replaces an existing file: when `final_path` is taken
    /// the guard keeps the temp file and `Ok(false)` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::StorageFailure`] if linking fails for any other
    /// reason; the temp file is then still owned by the guard.
    pub async fn commit(&mut self, final_path: &Path) -> Result<bool, DriveError> {
        self.finish_writing().await?;
        let Some(path) = self.path.as_deref() else {
            return Err(DriveError::storage(
                final_path,
                std::io::Error::other("temp file already released"),
            ));
        };
        match tokio::fs::hard_link(path, final_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %final_path.display(), "commit target already exists");
                return Ok(false);
            }
            Err(e) => return Err(DriveError::storage(final_path, e)),
        }
        // The artifact now lives at `final_path`; drop the temp name.
        self.cleanup();
        Ok(true)
    }

    /// Drops the write handle and deletes the temp file. Safe to call any
    /// number of times.
    pub fn cleanup(&mut self) {
        drop(self.writer.take());
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed temp file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove temp file"),
            }
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Streams `body` into `temp`, enforcing the ceiling before and during the
/// transfer. Returns the number of bytes written.
///
/// When `declared_size` exceeds the ceiling the temp file is never created.
/// A chunk that would push the total past the ceiling is not written; the
/// stream is dropped and `FileTooLarge` returned.
///
/// # Errors
///
/// `FileTooLarge`, a transport error from the stream, or a storage error.
pub async fn stream_to_temp<S, B>(
    body: S,
    declared_size: Option<u64>,
    limits: &UploadLimits,
    temp: &mut TempArtifact,
    progress: &ProgressReporter<'_>,
) -> Result<u64, DriveError>
where
    S: Stream<Item = Result<B, DriveError>>,
    B: AsRef<[u8]>,
{
    if let Some(declared) = declared_size
        && limits.is_too_large(declared)
    {
        debug!(declared, max = limits.max_video_size_bytes, "declared size over ceiling");
        return Err(DriveError::file_too_large(limits.too_large_message()));
    }

    temp.open().await?;

    let mut state = TransferState::new(declared_size.unwrap_or(0));
    let mut body = std::pin::pin!(body);

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        let len = chunk.len() as u64;

        if limits.is_too_large(state.received().saturating_add(len)) {
            debug!(
                received = state.received(),
                max = limits.max_video_size_bytes,
                "received bytes would exceed ceiling; aborting transfer"
            );
            return Err(DriveError::file_too_large(limits.too_large_message()));
        }

        temp.write(chunk).await?;

        if let Some(percent) = state.record(len) {
            progress.report(percent);
        }
    }

    temp.finish_writing().await?;
    Ok(state.received())
}

/// Post-transfer checks, in order: exists, non-empty, plausibly sized,
/// within the ceiling. Returns the on-disk size.
///
/// # Errors
///
/// `StorageFailure`, `EmptyOrTruncated`, or `FileTooLarge`.
pub async fn verify_artifact(path: &Path, limits: &UploadLimits) -> Result<u64, DriveError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| DriveError::storage(path, e))?;
    let size = metadata.len();

    if size == 0 || size < MIN_PLAUSIBLE_FILE_BYTES {
        return Err(DriveError::EmptyOrTruncated { bytes: size });
    }
    if limits.is_too_large(size) {
        return Err(DriveError::file_too_large(limits.too_large_message()));
    }
    Ok(size)
}

/// Reads up to the signature prefix length from the start of `path`.
///
/// # Errors
///
/// Returns [`DriveError::StorageFailure`] on read errors.
pub async fn read_prefix(path: &Path) -> Result<Vec<u8>, DriveError> {
    let file = File::open(path)
        .await
        .map_err(|e| DriveError::storage(path, e))?;
    let mut prefix = Vec::with_capacity(SIGNATURE_PREFIX_LEN);
    file.take(SIGNATURE_PREFIX_LEN as u64)
        .read_to_end(&mut prefix)
        .await
        .map_err(|e| DriveError::storage(path, e))?;
    Ok(prefix)
}
