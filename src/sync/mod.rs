//! The re-poll sync loop and its presentation seam.
//!
//! A sync run alternates reconciliation passes and batch execution until a
//! pass finds nothing left to fetch. Every iteration reloads the registry
//! from durable storage first, so links appended between iterations (even by
//! an external editor) are picked up without restarting the process.
//!
//! The engine never prints; everything user-visible flows through
//! [`SyncObserver`], which the binary implements with its terminal UI and
//! tests implement with a recorder.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::executor::{BatchExecutor, BatchStats};
use crate::matcher::MatchPolicy;
use crate::reconcile::{PendingFetch, ReconcilePass, Reconciler};
use crate::registry::{MediaKind, RegistryError, RegistryStore};
use crate::tool::{MediaTool, ToolError};

/// Errors that abort a sync run.
///
/// Per-item probe and fetch failures never surface here; only whole-run
/// preconditions and storage failures do.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Registry storage failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The fetch tool is not invokable (whole-run precondition).
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The output directory could not be created.
    #[error("failed to create download directory {path}: {source}")]
    CreateDownloadDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Presentation seam for sync progress.
///
/// All methods have empty defaults so observers implement only what they
/// render.
pub trait SyncObserver: Send + Sync {
    /// Metadata probing progress within a pass (`current` of `total`).
    fn probing(&self, _current: usize, _total: usize) {}

    /// The pass partitioned its category; these items are about to be
    /// fetched (the preview phase).
    fn preview(&self, _items: &[PendingFetch]) {}

    /// A fetch invocation is starting.
    fn fetch_started(&self, _item: &PendingFetch) {}

    /// Monotone progress for the current fetch, in percent.
    fn fetch_progress(&self, _percent: f32) {}

    /// The current fetch finished successfully.
    fn fetch_completed(&self, _item: &PendingFetch) {}

    /// The current fetch failed; the item stays pending.
    fn fetch_failed(&self, _item: &PendingFetch) {}

    /// A batch finished and the loop is about to re-poll.
    fn batch_completed(&self, _stats: &BatchStats) {}
}

/// Observer that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SyncObserver for NullObserver {}

/// How a sync run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The category holds no entries at all.
    NoEntries,
    /// Every entry is downloaded or satisfied on disk.
    Satisfied,
    /// A whole batch failed; re-polling could not make progress. The
    /// remaining items are retried on the next invocation.
    Stalled {
        /// Items still pending when the run stopped.
        remaining: usize,
    },
}

/// Summary of a completed sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    /// Terminal state of the loop.
    pub outcome: SyncOutcome,
    /// Reconciliation passes executed.
    pub passes: usize,
    /// Items fetched successfully across all passes.
    pub completed: usize,
    /// Fetch attempts that failed across all passes.
    pub failed: usize,
}

/// Runs the sync loop for one category until no pending work remains.
///
/// The fetch tool is verified once, before any registry mutation; a missing
/// tool aborts the whole run.
///
/// # Errors
///
/// Returns [`SyncError`] on the precondition failure or on storage failure;
/// per-item trouble is absorbed and reflected in the summary instead.
pub async fn run_sync(
    store: &RegistryStore,
    tool: &dyn MediaTool,
    kind: MediaKind,
    policy: MatchPolicy,
    observer: &dyn SyncObserver,
) -> Result<SyncSummary, SyncError> {
    tool.ensure_available().await?;

    let reconciler = Reconciler::new(store, tool, policy);
    let executor = BatchExecutor::new(store, tool);
    let mut summary = SyncSummary {
        outcome: SyncOutcome::Satisfied,
        passes: 0,
        completed: 0,
        failed: 0,
    };

    loop {
        summary.passes += 1;

        match reconciler.run_pass(kind, observer).await? {
            ReconcilePass::NoEntries => {
                summary.outcome = SyncOutcome::NoEntries;
                return Ok(summary);
            }
            ReconcilePass::Ready {
                mut document,
                download_dir,
                to_fetch,
            } => {
                if to_fetch.is_empty() {
                    summary.outcome = SyncOutcome::Satisfied;
                    info!(kind = %kind, passes = summary.passes, "All entries satisfied");
                    return Ok(summary);
                }

                observer.preview(&to_fetch);

                let stats = executor
                    .run(kind, &mut document, &download_dir, &to_fetch, observer)
                    .await?;
                summary.completed += stats.completed();
                summary.failed += stats.failed();
                observer.batch_completed(&stats);

                if stats.completed() == 0 {
                    // Nothing changed on disk or in the registry, so the next
                    // pass would produce the identical set.
                    summary.outcome = SyncOutcome::Stalled {
                        remaining: to_fetch.len(),
                    };
                    info!(
                        kind = %kind,
                        remaining = to_fetch.len(),
                        "Batch made no progress; stopping for a later run"
                    );
                    return Ok(summary);
                }
            }
        }
    }
}
