//! External fetch tool boundary.
//!
//! All network access is delegated to an external tool (yt-dlp). This module
//! models each invocation as a typed call at a component boundary:
//!
//! - [`MediaTool`] - trait the rest of the crate programs against, so tests
//!   substitute a stub instead of shelling out
//! - [`YtDlp`] - the real implementation (binary discovery, bounded-timeout
//!   metadata probes, streaming fetch)
//! - [`ProbeOutcome`] - typed probe result (found / timed out / unavailable)
//! - [`ProgressTracker`] / [`parse_progress_line`] - monotone progress parsing
//!
//! # Object Safety
//!
//! `MediaTool` uses `async_trait` to support dynamic dispatch via
//! `&dyn MediaTool`. Rust 2024 native async traits are not object-safe, so
//! `async_trait` is required for the stub-substitution pattern.

mod error;
mod progress;

pub use error::ToolError;
pub use progress::{ProgressTracker, parse_progress_line};

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::registry::MediaKind;

/// Environment variable overriding the fetch tool binary (test seam, venvs).
pub const PROGRAM_ENV_OVERRIDE: &str = "MEDIASYNC_YTDLP";

/// Default fetch tool binary name.
pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Timeout for the full-metadata probe.
pub const METADATA_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for the title-only probe.
pub const TITLE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a metadata probe.
///
/// Probes never mutate registry state; callers decide what to do with the
/// outcome. A timed-out probe must not be retried within the same pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The tool reported metadata. `title` may still be empty when the
    /// source did not carry one.
    Found {
        /// Reported title.
        title: String,
        /// Reported size (`filesize`, falling back to the approximate
        /// value), zero when unknown.
        size_bytes: u64,
    },
    /// The probe exceeded its time budget; the child was killed.
    TimedOut,
    /// Tool missing, non-zero exit, or malformed output.
    Unavailable,
}

impl ProbeOutcome {
    /// Returns the probed title when one was actually reported.
    #[must_use]
    pub fn known_title(&self) -> Option<&str> {
        match self {
            Self::Found { title, .. } if !title.is_empty() => Some(title),
            _ => None,
        }
    }

    /// Returns the probed size, zero when unknown.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::Found { size_bytes, .. } => *size_bytes,
            _ => 0,
        }
    }

    /// Returns true when the probe hit its timeout.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// One fetch invocation: which link, which category, where to put the file.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// The remote link to fetch.
    pub link: &'a str,
    /// Category; decides the audio-extraction flags.
    pub kind: MediaKind,
    /// Output directory passed to the tool.
    pub download_dir: &'a Path,
}

/// External fetch tool interface.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Verifies the tool is invokable at all (whole-run precondition).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotInstalled`] when the binary cannot be spawned.
    async fn ensure_available(&self) -> Result<(), ToolError>;

    /// Probes title and size for a link (bounded by
    /// [`METADATA_PROBE_TIMEOUT`]).
    async fn probe_metadata(&self, link: &str) -> ProbeOutcome;

    /// Probes the title only (bounded by [`TITLE_PROBE_TIMEOUT`]).
    async fn probe_title(&self, link: &str) -> ProbeOutcome;

    /// Fetches one item, streaming every parsed progress percentage into
    /// `on_progress` (callers enforce monotonicity per item).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] on launch failure, output I/O failure, or a
    /// non-zero exit; callers absorb these per item.
    async fn fetch(
        &self,
        request: FetchRequest<'_>,
        on_progress: &mut (dyn FnMut(f32) + Send),
    ) -> Result<(), ToolError>;
}

enum RunOutcome {
    Completed { status: ExitStatus, stdout: Vec<u8> },
    TimedOut,
}

/// The real fetch tool: yt-dlp resolved from the environment or `PATH`.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    /// Resolves the tool binary.
    ///
    /// The `MEDIASYNC_YTDLP` environment variable takes precedence (so tests
    /// and virtualenv installs can point at a specific executable); otherwise
    /// the binary is located on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotInstalled`] when no binary can be found.
    pub fn discover() -> Result<Self, ToolError> {
        if let Ok(value) = std::env::var(PROGRAM_ENV_OVERRIDE)
            && !value.is_empty()
        {
            debug!(program = %value, "Using fetch tool from environment override");
            return Ok(Self {
                program: PathBuf::from(value),
            });
        }

        let program = which::which(DEFAULT_PROGRAM).map_err(|_| ToolError::NotInstalled {
            program: DEFAULT_PROGRAM.to_string(),
        })?;
        debug!(program = %program.display(), "Located fetch tool on PATH");
        Ok(Self { program })
    }

    /// Creates a handle for a specific binary path (no discovery).
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    async fn run_capture(
        &self,
        args: &[&str],
        limit: Duration,
    ) -> Result<RunOutcome, std::io::Error> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture child stdout"))?;
        let stdout_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buffer).await;
            buffer
        });

        match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => {
                let status = status?;
                let stdout = stdout_task.await.unwrap_or_default();
                Ok(RunOutcome::Completed { status, stdout })
            }
            Err(_) => {
                let _ = child.kill().await;
                stdout_task.abort();
                Ok(RunOutcome::TimedOut)
            }
        }
    }
}

#[async_trait]
impl MediaTool for YtDlp {
    async fn ensure_available(&self) -> Result<(), ToolError> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        // A non-zero exit still proves the binary is invokable.
        match status {
            Ok(_) => Ok(()),
            Err(_) => Err(ToolError::NotInstalled {
                program: self.program_name(),
            }),
        }
    }

    async fn probe_metadata(&self, link: &str) -> ProbeOutcome {
        let args = [
            "--no-warnings",
            "--no-playlist",
            "--dump-json",
            "-f",
            "bestaudio",
            link,
        ];
        let outcome = match self.run_capture(&args, METADATA_PROBE_TIMEOUT).await {
            Ok(outcome) => outcome,
            Err(error) => {
                debug!(link = %link, error = %error, "Metadata probe failed to launch");
                return ProbeOutcome::Unavailable;
            }
        };

        match outcome {
            RunOutcome::TimedOut => {
                debug!(link = %link, "Metadata probe timed out");
                ProbeOutcome::TimedOut
            }
            RunOutcome::Completed { status, stdout } => {
                if !status.success() {
                    debug!(link = %link, code = ?status.code(), "Metadata probe exited non-zero");
                    return ProbeOutcome::Unavailable;
                }
                let text = String::from_utf8_lossy(&stdout);
                let Ok(value) = serde_json::from_str::<serde_json::Value>(text.trim()) else {
                    debug!(link = %link, "Metadata probe produced malformed JSON");
                    return ProbeOutcome::Unavailable;
                };
                let title = value
                    .get("title")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let size_bytes = value
                    .get("filesize")
                    .and_then(serde_json::Value::as_u64)
                    .or_else(|| {
                        value
                            .get("filesize_approx")
                            .and_then(serde_json::Value::as_u64)
                    })
                    .unwrap_or(0);
                ProbeOutcome::Found { title, size_bytes }
            }
        }
    }

    async fn probe_title(&self, link: &str) -> ProbeOutcome {
        let args = [
            "--get-title",
            "--no-warnings",
            "--no-playlist",
            "--skip-download",
            link,
        ];
        let outcome = match self.run_capture(&args, TITLE_PROBE_TIMEOUT).await {
            Ok(outcome) => outcome,
            Err(error) => {
                debug!(link = %link, error = %error, "Title probe failed to launch");
                return ProbeOutcome::Unavailable;
            }
        };

        match outcome {
            RunOutcome::TimedOut => ProbeOutcome::TimedOut,
            RunOutcome::Completed { status, stdout } => {
                if !status.success() {
                    return ProbeOutcome::Unavailable;
                }
                let title = String::from_utf8_lossy(&stdout).trim().to_string();
                if title.is_empty() {
                    ProbeOutcome::Unavailable
                } else {
                    ProbeOutcome::Found {
                        title,
                        size_bytes: 0,
                    }
                }
            }
        }
    }

    async fn fetch(
        &self,
        request: FetchRequest<'_>,
        on_progress: &mut (dyn FnMut(f32) + Send),
    ) -> Result<(), ToolError> {
        let mut command = Command::new(&self.program);
        if request.kind == MediaKind::Audio {
            command.args(["-x", "-f", "bestaudio", "--audio-format", "opus"]);
        }
        command.arg("-P").arg(request.download_dir);
        command.args([
            "--no-warnings",
            "--no-playlist",
            "--quiet",
            "--progress",
            "--newline",
        ]);
        command.arg(request.link);

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Launch {
                program: self.program_name(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ToolError::Io {
            program: self.program_name(),
            source: std::io::Error::other("failed to capture child stdout"),
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| ToolError::Io {
            program: self.program_name(),
            source: std::io::Error::other("failed to capture child stderr"),
        })?;
        let stderr_task = tokio::spawn(async move {
            let mut buffer = String::new();
            let _ = stderr_pipe.read_to_string(&mut buffer).await;
            buffer
        });

        let mut lines = BufReader::new(stdout).lines();
        loop {
            let line = lines.next_line().await.map_err(|source| ToolError::Io {
                program: self.program_name(),
                source,
            })?;
            let Some(line) = line else { break };
            if let Some(percent) = parse_progress_line(&line) {
                on_progress(percent);
            }
        }

        let status = child.wait().await.map_err(|source| ToolError::Io {
            program: self.program_name(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            let stderr_text = stderr_task.await.unwrap_or_default();
            if let Some(detail) = stderr_text.lines().rev().find(|l| !l.trim().is_empty()) {
                warn!(link = %request.link, detail = %detail, "Fetch tool reported an error");
            }
            Err(ToolError::ExitStatus {
                program: self.program_name(),
                code: status.code(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_outcome_known_title_filters_empty() {
        let found = ProbeOutcome::Found {
            title: "Song A".to_string(),
            size_bytes: 3_000_000,
        };
        assert_eq!(found.known_title(), Some("Song A"));

        let untitled = ProbeOutcome::Found {
            title: String::new(),
            size_bytes: 1,
        };
        assert_eq!(untitled.known_title(), None);
        assert_eq!(ProbeOutcome::TimedOut.known_title(), None);
        assert_eq!(ProbeOutcome::Unavailable.known_title(), None);
    }

    #[test]
    fn test_probe_outcome_size_defaults_to_zero() {
        assert_eq!(ProbeOutcome::TimedOut.size_bytes(), 0);
        assert_eq!(ProbeOutcome::Unavailable.size_bytes(), 0);
        let found = ProbeOutcome::Found {
            title: "x".to_string(),
            size_bytes: 42,
        };
        assert_eq!(found.size_bytes(), 42);
    }

    #[tokio::test]
    async fn test_ensure_available_missing_binary_is_not_installed() {
        let tool = YtDlp::with_program("/definitely/not/a/real/binary");
        let err = tool.ensure_available().await.unwrap_err();
        assert!(matches!(err, ToolError::NotInstalled { .. }));
    }

    #[tokio::test]
    async fn test_probe_metadata_missing_binary_is_unavailable() {
        let tool = YtDlp::with_program("/definitely/not/a/real/binary");
        let outcome = tool.probe_metadata("https://example.com/v/1").await;
        assert_eq!(outcome, ProbeOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_fetch_missing_binary_is_launch_error() {
        let tool = YtDlp::with_program("/definitely/not/a/real/binary");
        let request = FetchRequest {
            link: "https://example.com/v/1",
            kind: MediaKind::Audio,
            download_dir: Path::new("downloads"),
        };
        let err = tool.fetch(request, &mut |_| {}).await.unwrap_err();
        assert!(matches!(err, ToolError::Launch { .. }));
    }
}
