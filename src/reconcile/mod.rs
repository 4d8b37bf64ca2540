//! One-pass reconciliation between the registry, probed metadata, and the
//! download directory.
//!
//! A pass loads a fresh document, normalizes hand-added entries, scans the
//! output directory, probes every pending entry in registry order, marks the
//! ones already satisfied on disk, and returns the ordered to-fetch set. The
//! registry is persisted once at the end of the pass (title backfills and
//! satisfied marks), not per item, to bound I/O.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::matcher::MatchPolicy;
use crate::registry::{MediaKind, RegistryDocument, RegistryStore};
use crate::scanner::scan_download_dir;
use crate::sync::{SyncError, SyncObserver};
use crate::tool::MediaTool;

/// One item the batch executor should fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    /// The remote link.
    pub link: String,
    /// Display title: the probed title, or the link itself when no title
    /// could be probed (including the timeout case).
    pub title: String,
    /// Probed size in bytes, zero when unknown.
    pub size_bytes: u64,
}

impl PendingFetch {
    /// Returns true when a real title (not the link fallback) is known.
    #[must_use]
    pub fn has_real_title(&self) -> bool {
        self.title != self.link
    }
}

/// Result of one reconciliation pass.
#[derive(Debug)]
pub enum ReconcilePass {
    /// The category holds no entries at all; nothing to do.
    NoEntries,
    /// The category was partitioned; an empty `to_fetch` means fully
    /// satisfied.
    Ready {
        /// The freshly loaded (and updated) document, for the executor to
        /// continue mutating within this pass.
        document: RegistryDocument,
        /// The resolved output directory (created if it was absent).
        download_dir: PathBuf,
        /// Items to fetch, in registry order.
        to_fetch: Vec<PendingFetch>,
    },
}

/// Per-category reconciliation driver.
pub struct Reconciler<'a> {
    store: &'a RegistryStore,
    tool: &'a dyn MediaTool,
    policy: MatchPolicy,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler over the given store and fetch tool.
    #[must_use]
    pub fn new(store: &'a RegistryStore, tool: &'a dyn MediaTool, policy: MatchPolicy) -> Self {
        Self {
            store,
            tool,
            policy,
        }
    }

    /// Runs one pass for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] on storage failure or when the download
    /// directory cannot be created. Probe failures are per-item and never
    /// fail the pass.
    pub async fn run_pass(
        &self,
        kind: MediaKind,
        observer: &dyn SyncObserver,
    ) -> Result<ReconcilePass, SyncError> {
        // Always a fresh load: links may have been appended externally
        // since the previous pass.
        let mut document = self.store.load()?;

        if document.section(kind).links.is_empty() {
            debug!(kind = %kind, "No entries registered");
            return Ok(ReconcilePass::NoEntries);
        }

        if document.normalize(kind) {
            self.store.save(&document)?;
            info!(kind = %kind, "Normalized hand-added entries");
        }

        let download_path = document.download_path().to_string();
        let download_dir = PathBuf::from(&download_path);
        fs::create_dir_all(&download_dir).map_err(|source| SyncError::CreateDownloadDir {
            path: download_dir.clone(),
            source,
        })?;
        let scanned_keys = scan_download_dir(&download_dir, kind.expected_extension());

        let pending_links: Vec<String> = document
            .section(kind)
            .links
            .iter()
            .filter(|entry| entry.has_link() && !entry.downloaded())
            .map(|entry| entry.link.clone())
            .collect();
        let total = pending_links.len();

        let mut to_fetch = Vec::new();
        for (index, link) in pending_links.iter().enumerate() {
            observer.probing(index + 1, total);

            let outcome = self.tool.probe_metadata(link).await;
            if outcome.timed_out() {
                debug!(link = %link, "Metadata probe timed out; item stays pending");
            }
            let probed_title = outcome.known_title().map(str::to_string);
            let size_bytes = outcome.size_bytes();

            let Some(entry) = document.find_by_link_mut(kind, link) else {
                continue;
            };

            if let Some(title) = probed_title.as_deref()
                && entry.known_title().is_empty()
            {
                entry.title = Some(title.to_string());
            }

            // Only a probed title can prove the item is on disk; a timed-out
            // or unavailable probe never silently marks it satisfied.
            match probed_title {
                Some(title) if self.policy.is_satisfied(&title, &scanned_keys) => {
                    // Title backfill above covered the missing-title case, so
                    // an existing title is never clobbered here.
                    entry.mark_downloaded(&download_path, "");
                    debug!(link = %link, title = %title, "Already on disk; marked downloaded");
                }
                probed => {
                    to_fetch.push(PendingFetch {
                        link: link.clone(),
                        title: probed.unwrap_or_else(|| link.clone()),
                        size_bytes,
                    });
                }
            }
        }

        // One persist for the whole partition pass.
        self.store.save(&document)?;

        info!(
            kind = %kind,
            pending = total,
            to_fetch = to_fetch.len(),
            "Reconciliation pass complete"
        );
        Ok(ReconcilePass::Ready {
            document,
            download_dir,
            to_fetch,
        })
    }
}
