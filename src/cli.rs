//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mediasync_core::{DEFAULT_REGISTRY_FILE, MediaKind};

/// Registry-driven batch sync for remote media links.
///
/// Mediasync keeps a small JSON registry of links, figures out which ones
/// are not materialized on disk yet, and fetches them through yt-dlp.
#[derive(Parser, Debug)]
#[command(name = "mediasync")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Registry file to operate on
    #[arg(long, default_value = DEFAULT_REGISTRY_FILE, global = true)]
    pub registry: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every pending link of a category, re-polling until done
    Sync {
        /// Media category to sync
        kind: MediaKind,
    },
    /// Register a new link (no-op if it already exists)
    Add {
        /// Media category to add the link to
        kind: MediaKind,
        /// The remote link
        link: String,
    },
    /// Show all registered links with their status
    List,
    /// Change the default download directory
    SetPath {
        /// New download directory
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_sync_audio_parses() {
        let args = Args::try_parse_from(["mediasync", "sync", "audio"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Sync {
                kind: MediaKind::Audio
            }
        ));
        assert_eq!(args.registry, PathBuf::from(DEFAULT_REGISTRY_FILE));
    }

    #[test]
    fn test_cli_sync_video_parses() {
        let args = Args::try_parse_from(["mediasync", "sync", "video"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Sync {
                kind: MediaKind::Video
            }
        ));
    }

    #[test]
    fn test_cli_sync_invalid_kind_rejected() {
        let result = Args::try_parse_from(["mediasync", "sync", "podcast"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_add_parses_kind_and_link() {
        let args =
            Args::try_parse_from(["mediasync", "add", "audio", "https://example.com/v/1"]).unwrap();
        match args.command {
            Command::Add { kind, link } => {
                assert_eq!(kind, MediaKind::Audio);
                assert_eq!(link, "https://example.com/v/1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_registry_flag_overrides_default() {
        let args =
            Args::try_parse_from(["mediasync", "--registry", "custom.json", "list"]).unwrap();
        assert_eq!(args.registry, PathBuf::from("custom.json"));
    }

    #[test]
    fn test_cli_registry_flag_is_global() {
        let args =
            Args::try_parse_from(["mediasync", "list", "--registry", "custom.json"]).unwrap();
        assert_eq!(args.registry, PathBuf::from("custom.json"));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["mediasync", "-vv", "list"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["mediasync", "-q", "list"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_set_path_parses() {
        let args = Args::try_parse_from(["mediasync", "set-path", "music"]).unwrap();
        assert!(matches!(args.command, Command::SetPath { .. }));
    }

    #[test]
    fn test_cli_no_subcommand_is_error() {
        let result = Args::try_parse_from(["mediasync"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["mediasync", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["mediasync", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
