//! Progress bar for a single download.

use std::time::Duration;

use drive_fetch_core::ProgressUpdate;
use indicatif::{ProgressBar, ProgressStyle};

/// Percent-based bar fed by the download's progress callback.
pub(crate) struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    /// Creates the bar, hidden when `enabled` is false.
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message("Contacting Google Drive...");
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Applies one update from the pipeline.
    pub(crate) fn update(&self, update: &ProgressUpdate) {
        self.bar.set_message(update.filename.clone());
        self.bar.set_position(u64::from(update.percent));
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
