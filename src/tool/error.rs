//! Error types for external fetch tool invocations.

use thiserror::Error;

/// Errors produced while invoking the external fetch tool.
///
/// `NotInstalled` is a whole-run precondition failure; the other variants
/// are per-item and absorbed at the executor boundary so the affected entry
/// stays eligible for a later pass.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool binary could not be found or is not invokable at all.
    #[error(
        "{program} is not installed or not on PATH\n  Suggestion: install it first (e.g. pip install yt-dlp)"
    )]
    NotInstalled {
        /// The tool binary name.
        program: String,
    },

    /// Spawning the tool process failed.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// The tool binary being launched.
        program: String,
        /// Underlying spawn failure.
        #[source]
        source: std::io::Error,
    },

    /// Reading the tool's streaming output failed.
    #[error("I/O error while reading {program} output: {source}")]
    Io {
        /// The tool binary being read.
        program: String,
        /// Underlying read failure.
        #[source]
        source: std::io::Error,
    },

    /// The tool exited with a non-zero status.
    #[error("{program} exited with status {code:?}")]
    ExitStatus {
        /// The tool binary that failed.
        program: String,
        /// Exit code when the process was not killed by a signal.
        code: Option<i32>,
    },
}
