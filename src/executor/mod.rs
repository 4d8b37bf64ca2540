//! Sequential batch execution over the to-fetch set.
//!
//! Items are processed strictly one at a time: the external tool and the
//! destination directory are not assumed safe for concurrent invocation.
//! Each success is persisted immediately so partial batch progress survives
//! a crash mid-batch; each failure leaves its entry untouched for a later
//! pass.

use std::path::Path;

use tracing::{info, warn};

use crate::reconcile::PendingFetch;
use crate::registry::{MediaKind, RegistryDocument, RegistryStore};
use crate::sync::{SyncError, SyncObserver};
use crate::tool::{FetchRequest, MediaTool, ProgressTracker};

/// Tallies for one executed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    completed: usize,
    failed: usize,
}

impl BatchStats {
    /// Number of items fetched successfully.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Number of items that failed and stay pending.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Total items processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }
}

/// Drives the external tool over an ordered to-fetch set.
pub struct BatchExecutor<'a> {
    store: &'a RegistryStore,
    tool: &'a dyn MediaTool,
}

impl<'a> BatchExecutor<'a> {
    /// Creates an executor over the given store and fetch tool.
    #[must_use]
    pub fn new(store: &'a RegistryStore, tool: &'a dyn MediaTool) -> Self {
        Self { store, tool }
    }

    /// Fetches every item in order, recording outcomes into `document`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] only on storage failure while persisting a
    /// success; fetch failures are absorbed per item.
    pub async fn run(
        &self,
        kind: MediaKind,
        document: &mut RegistryDocument,
        download_dir: &Path,
        items: &[PendingFetch],
        observer: &dyn SyncObserver,
    ) -> Result<BatchStats, SyncError> {
        let download_path = document.download_path().to_string();
        let mut stats = BatchStats::default();

        for item in items {
            observer.fetch_started(item);

            let request = FetchRequest {
                link: &item.link,
                kind,
                download_dir,
            };
            // Observed progress is strictly increasing per item; regressed or
            // duplicate percentages from malformed output are dropped here.
            let mut tracker = ProgressTracker::new();
            let mut forward = |percent: f32| {
                if let Some(accepted) = tracker.observe(percent) {
                    observer.fetch_progress(accepted);
                }
            };

            match self.tool.fetch(request, &mut forward).await {
                Ok(()) => {
                    if let Some(entry) = document.find_by_link_mut(kind, &item.link) {
                        let better_title = if item.has_real_title() {
                            item.title.as_str()
                        } else {
                            ""
                        };
                        entry.mark_downloaded(&download_path, better_title);
                        if entry.known_title().is_empty() {
                            // A downloaded entry always carries a title; the
                            // link is the last resort.
                            entry.title = Some(item.link.clone());
                        }
                    }
                    // Persist now so a crash later in the batch loses nothing.
                    self.store.save(document)?;
                    stats.completed += 1;
                    info!(link = %item.link, "Fetch completed");
                    observer.fetch_completed(item);
                }
                Err(error) => {
                    stats.failed += 1;
                    warn!(
                        link = %item.link,
                        error = %error,
                        "Fetch failed; entry left pending for a later pass"
                    );
                    observer.fetch_failed(item);
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_stats_totals() {
        let stats = BatchStats {
            completed: 2,
            failed: 1,
        };
        assert_eq!(stats.completed(), 2);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_batch_stats_default_is_empty() {
        let stats = BatchStats::default();
        assert_eq!(stats.total(), 0);
    }
}
