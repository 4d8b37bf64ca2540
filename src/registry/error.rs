//! Error types for registry storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or persisting the registry.
///
/// Storage failures are fatal for the current pass; no partial document is
/// ever written (save goes through a temporary file and an atomic rename).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading or writing the registry file failed.
    #[error("registry I/O error at {path}: {source}")]
    Io {
        /// The registry file (or its temporary sibling) involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The registry file exists but is not a valid document.
    #[error("registry file {path} is malformed: {source}")]
    Malformed {
        /// The registry file that failed to parse.
        path: PathBuf,
        /// Underlying serde failure.
        #[source]
        source: serde_json::Error,
    },
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
