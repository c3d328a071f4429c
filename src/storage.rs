//! Local storage for committed videos: the `videos` root and collision-free naming.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::drive::DriveError;
use crate::filename::sanitize_filename;

/// Produces a filename that does not collide with anything in `directory`.
pub trait UniqueNamer: Send + Sync {
    /// Returns a name derived from `proposed` that is free in `directory`.
    fn unique_name(&self, proposed: &str, directory: &Path) -> String;
}

/// Appends `_1`, `_2`, ... before the extension until the name is free.
///
/// Example: `clip.mp4`, then `clip_1.mp4`, `clip_2.mp4`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberedNamer;

impl UniqueNamer for NumberedNamer {
    fn unique_name(&self, proposed: &str, directory: &Path) -> String {
        let filename = {
            let sanitized = sanitize_filename(proposed);
            if sanitized.trim_matches('_').is_empty() {
                "video.mp4".to_string()
            } else {
                sanitized
            }
        };

        if !directory.join(&filename).exists() {
            return filename;
        }

        let (stem, ext) = match filename.rfind('.') {
            Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
            _ => (filename.as_str(), ""),
        };

        for i in 1..1000 {
            let candidate = format!("{stem}_{i}{ext}");
            if !directory.join(&candidate).exists() {
                return candidate;
            }
        }

        // Fallback (extremely unlikely)
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("{stem}_{timestamp}{ext}")
    }
}

/// The directory committed videos land in, plus its naming policy.
#[derive(Clone)]
pub struct VideoStorage {
    videos_dir: PathBuf,
    namer: Arc<dyn UniqueNamer>,
}

impl std::fmt::Debug for VideoStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStorage")
            .field("videos_dir", &self.videos_dir)
            .finish_non_exhaustive()
    }
}

impl VideoStorage {
    /// Opens `videos_dir`, creating it if needed, with numbered naming.
    /// A relative path is resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::StorageFailure`] if the directory cannot be created.
    pub fn new(videos_dir: impl Into<PathBuf>) -> Result<Self, DriveError> {
        Self::with_namer(videos_dir, Arc::new(NumberedNamer))
    }

    /// Opens `videos_dir` with a custom naming policy.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::StorageFailure`] if the directory cannot be created.
    pub fn with_namer(
        videos_dir: impl Into<PathBuf>,
        namer: Arc<dyn UniqueNamer>,
    ) -> Result<Self, DriveError> {
        let videos_dir = videos_dir.into();
        std::fs::create_dir_all(&videos_dir)
            .map_err(|e| DriveError::storage(videos_dir.clone(), e))?;
        let videos_dir = std::path::absolute(&videos_dir)
            .map_err(|e| DriveError::storage(videos_dir.clone(), e))?;
        debug!(dir = %videos_dir.display(), "video storage ready");
        Ok(Self { videos_dir, namer })
    }

    /// Absolute root directory for committed videos and in-flight temp files.
    #[must_use]
    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// Resolves a collision-free final name for `proposed`.
    #[must_use]
    pub fn unique_name(&self, proposed: &str) -> String {
        self.namer.unique_name(proposed, &self.videos_dir)
    }
}
