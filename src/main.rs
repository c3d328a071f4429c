//! CLI entry point for drive-fetch.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::Parser;
use drive_fetch_core::{
    DriveFetcher, FetchConfig, ProgressCallback, ProgressUpdate, UploadLimits,
};
use tracing::{debug, info};

mod cli;
mod progress;

use cli::Args;
use progress::DownloadProgress;

/// Applies CLI overrides on top of the environment-derived configuration.
fn build_config(args: &Args) -> FetchConfig {
    let mut config = FetchConfig::from_env();
    if let Some(dir) = &args.output_dir {
        config.videos_dir.clone_from(dir);
    }
    if let Some(gb) = args.max_size_gb {
        config.limits = UploadLimits::from_gigabytes(gb);
    }
    if let Some(key) = args.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        config.api_key = Some(key.to_string());
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = build_config(&args);
    info!(
        videos_dir = %config.videos_dir.display(),
        max_bytes = config.limits.max_video_size_bytes,
        api_key = config.api_key.is_some(),
        "drive-fetch starting"
    );

    let fetcher = DriveFetcher::new(config)?;

    let show_progress =
        !args.no_progress && !args.quiet && !args.json && io::stderr().is_terminal();
    let progress = DownloadProgress::new(show_progress);
    let on_progress = |update: &ProgressUpdate| progress.update(update);
    let callback: &ProgressCallback<'_> = &on_progress;

    let outcome = fetcher.download(&args.reference, Some(callback)).await;
    progress.finish();

    match outcome {
        Ok(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if !args.quiet {
                println!("{}", result.local_file_path.display());
            }
            Ok(())
        }
        Err(error) => {
            eprintln!("Error: {error}");
            if let Some(hint) = error.suggestion() {
                eprintln!("Hint: {hint}");
            }
            std::process::exit(1);
        }
    }
}
