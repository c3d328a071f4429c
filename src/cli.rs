//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download a publicly shared Google Drive video.
///
/// Accepts a share link (`/file/d/<id>/view`, `open?id=<id>`, `/d/<id>`) or a
/// bare file id. The video is validated and saved into the videos directory.
#[derive(Parser, Debug)]
#[command(name = "drive-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Google Drive share link or file id
    pub reference: String,

    /// Directory videos are saved into (overrides DRIVE_FETCH_VIDEOS_DIR)
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Size ceiling in gigabytes (overrides MAX_VIDEO_SIZE_GB)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=100_000))]
    pub max_size_gb: Option<u64>,

    /// Drive API key for the public media endpoint (overrides DRIVE_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Print the result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_reference_only_parses_with_defaults() {
        let args = Args::try_parse_from(["drive-fetch", "1AbCdEfGhIjKlMnOpQrStUvWxYz"]).unwrap();
        assert_eq!(args.reference, "1AbCdEfGhIjKlMnOpQrStUvWxYz");
        assert_eq!(args.output_dir, None);
        assert_eq!(args.max_size_gb, None);
        assert_eq!(args.api_key, None);
        assert!(!args.json);
        assert!(!args.no_progress);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_missing_reference_rejected() {
        let err = Args::try_parse_from(["drive-fetch"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["drive-fetch", "x", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["drive-fetch", "x", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["drive-fetch", "x", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_output_dir_short_and_long() {
        let args = Args::try_parse_from(["drive-fetch", "x", "-o", "/tmp/v"]).unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/v")));

        let args = Args::try_parse_from(["drive-fetch", "x", "--output-dir", "out"]).unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_cli_max_size_gb_zero_rejected() {
        let err = Args::try_parse_from(["drive-fetch", "x", "--max-size-gb", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let args = Args::try_parse_from(["drive-fetch", "x", "--max-size-gb", "2"]).unwrap();
        assert_eq!(args.max_size_gb, Some(2));
    }

    #[test]
    fn test_cli_json_api_key_and_no_progress() {
        let args = Args::try_parse_from([
            "drive-fetch",
            "x",
            "--json",
            "--no-progress",
            "--api-key",
            "k-1",
        ])
        .unwrap();
        assert!(args.json);
        assert!(args.no_progress);
        assert_eq!(args.api_key.as_deref(), Some("k-1"));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["drive-fetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["drive-fetch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
