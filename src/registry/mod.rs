//! Registry persistence for tracked media links.
//!
//! The registry is a single human-editable JSON document holding, per media
//! category, an ordered list of [`Entry`] records plus a metadata section
//! with the default output directory. It is always read and written as a
//! whole; there are no partial-category writes.
//!
//! # Overview
//!
//! - [`RegistryStore`] - load/save/upsert against the document file
//! - [`RegistryDocument`] - the typed document schema
//! - [`Entry`] / [`MediaKind`] - entry records and category defaults
//! - [`RegistryError`] - storage failure types
//!
//! Hand-added entries (just a `"link"` field) are tolerated by the schema
//! and normalized to the full record shape on the next pass.

mod entry;
mod error;

pub use entry::{Entry, MediaKind};
pub use error::RegistryError;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default registry file name.
pub const DEFAULT_REGISTRY_FILE: &str = "downloads.json";

/// Default output directory recorded in a fresh registry skeleton.
pub const DEFAULT_DOWNLOAD_PATH: &str = "downloads";

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// One media category's ordered link list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySection {
    /// Entries in registration order.
    #[serde(default)]
    pub links: Vec<Entry>,
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaSection {
    /// Default output directory for fetched files.
    #[serde(rename = "default-path", default = "default_download_path")]
    pub default_path: String,
}

fn default_download_path() -> String {
    DEFAULT_DOWNLOAD_PATH.to_string()
}

impl Default for MetaSection {
    fn default() -> Self {
        Self {
            default_path: default_download_path(),
        }
    }
}

/// The whole registry document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    /// Audio links.
    #[serde(default)]
    pub audio: CategorySection,
    /// Video links.
    #[serde(default)]
    pub video: CategorySection,
    /// Document metadata.
    #[serde(default)]
    pub meta: MetaSection,
}

impl RegistryDocument {
    /// Returns the section for a category.
    #[must_use]
    pub fn section(&self, kind: MediaKind) -> &CategorySection {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }

    /// Returns the mutable section for a category.
    pub fn section_mut(&mut self, kind: MediaKind) -> &mut CategorySection {
        match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        }
    }

    /// Finds an entry by exact link match within a category.
    #[must_use]
    pub fn find_by_link(&self, kind: MediaKind, link: &str) -> Option<(usize, &Entry)> {
        self.section(kind)
            .links
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.link == link)
    }

    /// Finds a mutable entry by exact link match within a category.
    pub fn find_by_link_mut(&mut self, kind: MediaKind, link: &str) -> Option<&mut Entry> {
        self.section_mut(kind)
            .links
            .iter_mut()
            .find(|entry| entry.link == link)
    }

    /// Normalizes every hand-added entry in a category to the full record
    /// shape. Returns true when anything was filled in.
    ///
    /// Entries without a link are skipped, not repaired.
    pub fn normalize(&mut self, kind: MediaKind) -> bool {
        let mut changed = false;
        for entry in &mut self.section_mut(kind).links {
            changed |= entry.normalize(kind);
        }
        changed
    }

    /// Returns the configured default output directory.
    #[must_use]
    pub fn download_path(&self) -> &str {
        &self.meta.default_path
    }
}

/// Durable store for the registry document.
///
/// The store holds only the file path; callers load a fresh document at the
/// start of every pass and save it back, so no long-lived in-memory copy can
/// drift from disk.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Creates a store for the given registry file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full document, creating and persisting a default skeleton
    /// if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] on read failure and
    /// [`RegistryError::Malformed`] when the file is not a valid document.
    pub fn load(&self) -> Result<RegistryDocument> {
        if !self.path.exists() {
            let document = RegistryDocument::default();
            self.save(&document)?;
            info!(path = %self.path.display(), "Created registry skeleton");
            return Ok(document);
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|source| RegistryError::io(&self.path, source))?;
        serde_json::from_str(&raw).map_err(|source| RegistryError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Persists the full document.
    ///
    /// Writes a temporary sibling file first and renames it over the target,
    /// so a failure mid-write never leaves a truncated registry behind.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] on write or rename failure.
    pub fn save(&self, document: &RegistryDocument) -> Result<()> {
        let serialized = serde_json::to_string_pretty(document)
            .map_err(|source| RegistryError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let tmp_path = self.temp_path();
        fs::write(&tmp_path, serialized.as_bytes())
            .map_err(|source| RegistryError::io(&tmp_path, source))?;
        if let Err(source) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(RegistryError::io(&self.path, source));
        }

        debug!(path = %self.path.display(), "Registry persisted");
        Ok(())
    }

    /// Returns the existing entry for `link`, or appends a new one with
    /// category-appropriate defaults and persists immediately.
    ///
    /// Never creates a second entry for the same link; calling this on an
    /// existing link returns that entry unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the append needs to persist and the
    /// write fails.
    pub fn upsert(
        &self,
        document: &mut RegistryDocument,
        kind: MediaKind,
        link: &str,
    ) -> Result<Entry> {
        if let Some((_, existing)) = document.find_by_link(kind, link) {
            return Ok(existing.clone());
        }

        let entry = Entry::new(link, kind);
        document.section_mut(kind).links.push(entry.clone());
        self.save(document)?;
        info!(kind = %kind, link = %link, "Registered new link");
        Ok(entry)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map_or_else(
            || std::ffi::OsString::from("registry"),
            |name| name.to_owned(),
        );
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
