//! Download directory scanning.
//!
//! Lists already-materialized output files and normalizes their names into a
//! comparable key set for the match resolver. Non-recursive: only files
//! directly under the download directory count.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

// The fetch tool appends a short bracketed identifier to filenames for
// disambiguation, e.g. "Song A [dQw4w9WgXcQ].opus".
static BRACKET_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\[[\w-]+\]\s*$")
        .unwrap_or_else(|e| panic!("invalid static bracket-suffix regex: {e}"))
});

/// Normalizes a file stem into a comparable key.
///
/// Strips a trailing bracketed identifier, lowercases, and trims whitespace.
#[must_use]
pub fn normalize_stem(stem: &str) -> String {
    BRACKET_SUFFIX_RE
        .replace(stem, "")
        .to_lowercase()
        .trim()
        .to_string()
}

/// Scans `download_dir` for files with `extension` and returns their
/// normalized name keys.
///
/// A missing directory yields the empty set, not an error; unreadable
/// entries are skipped with a warning.
#[must_use]
pub fn scan_download_dir(download_dir: &Path, extension: &str) -> HashSet<String> {
    let entries = match fs::read_dir(download_dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return HashSet::new();
        }
        Err(error) => {
            warn!(
                path = %download_dir.display(),
                error = %error,
                "Skipping unreadable download directory"
            );
            return HashSet::new();
        }
    };

    let mut keys = HashSet::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(error = %error, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path
            .extension()
            .is_none_or(|ext| !ext.eq_ignore_ascii_case(extension))
        {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            keys.insert(normalize_stem(stem));
        }
    }

    debug!(
        path = %download_dir.display(),
        extension = %extension,
        files = keys.len(),
        "Scanned download directory"
    );
    keys
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_stem_strips_bracket_suffix() {
        assert_eq!(normalize_stem("Song A [dQw4w9WgXcQ]"), "song a");
        assert_eq!(normalize_stem("Song A [abc-123] "), "song a");
    }

    #[test]
    fn test_normalize_stem_keeps_interior_brackets() {
        assert_eq!(
            normalize_stem("Track [Live] Version [dQw4w9WgXcQ]"),
            "track [live] version"
        );
    }

    #[test]
    fn test_normalize_stem_lowercases_and_trims() {
        assert_eq!(normalize_stem("  Mixed CASE Name  "), "mixed case name");
    }

    #[test]
    fn test_normalize_stem_plain_name_unchanged() {
        assert_eq!(normalize_stem("already normal"), "already normal");
    }

    #[test]
    fn test_scan_missing_directory_returns_empty_set() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(scan_download_dir(&missing, "opus").is_empty());
    }

    #[test]
    fn test_scan_collects_only_matching_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("Song A [dQw4w9WgXcQ].opus"), b"x").unwrap();
        std::fs::write(dir.path().join("Song B.opus"), b"x").unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let keys = scan_download_dir(dir.path(), "opus");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("song a"));
        assert!(keys.contains("song b"));
    }

    #[test]
    fn test_scan_is_non_recursive() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("Hidden.opus"), b"x").unwrap();

        assert!(scan_download_dir(dir.path(), "opus").is_empty());
    }

    #[test]
    fn test_scan_video_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("Clip [abc123].mp4"), b"x").unwrap();

        let keys = scan_download_dir(dir.path(), "mp4");
        assert!(keys.contains("clip"));
    }
}
