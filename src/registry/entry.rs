//! Registry entry types and media category definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Media category a link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Audio-only extraction (opus).
    Audio,
    /// Full video download.
    Video,
}

impl MediaKind {
    /// Returns the registry document key for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Returns the default `format` field value for new entries.
    #[must_use]
    pub fn default_format(&self) -> &'static str {
        match self {
            Self::Audio => "opus",
            Self::Video => "",
        }
    }

    /// Returns the file extension the fetch tool produces for this category.
    ///
    /// Used by the directory scan to decide which files count as
    /// already-materialized output.
    #[must_use]
    pub fn expected_extension(&self) -> &'static str {
        match self {
            Self::Audio => "opus",
            Self::Video => "mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            _ => Err(format!("invalid media kind: {s} (expected audio or video)")),
        }
    }
}

/// A single registered link.
///
/// Optional fields stay `Option` at the serde layer so that entries
/// hand-added to the registry file with just a `link` are distinguishable
/// from fully-populated ones; [`Entry::normalize`] fills the gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The remote link; the unique key within a category. An empty link
    /// marks an invalid hand-edited entry that every pass skips.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    /// Resolved title; empty until probed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Whether the item has been materialized on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_downloaded: Option<bool>,
    /// Target format (category-dependent default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Output directory, populated once the item is downloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Entry {
    /// Creates a fully-populated entry with category-appropriate defaults.
    #[must_use]
    pub fn new(link: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            link: link.into(),
            title: Some(String::new()),
            is_downloaded: Some(false),
            format: Some(kind.default_format().to_string()),
            path: Some(String::new()),
        }
    }

    /// Returns true when the entry carries a usable link.
    #[must_use]
    pub fn has_link(&self) -> bool {
        !self.link.is_empty()
    }

    /// Returns true when the entry is marked downloaded.
    #[must_use]
    pub fn downloaded(&self) -> bool {
        self.is_downloaded.unwrap_or(false)
    }

    /// Returns the stored title, or `""` when unset.
    #[must_use]
    pub fn known_title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Fills any missing optional field with its category default.
    ///
    /// Returns true when at least one field was filled. Idempotent: a
    /// second call on the same entry always returns false. Entries without
    /// a link are left untouched.
    pub fn normalize(&mut self, kind: MediaKind) -> bool {
        if !self.has_link() {
            return false;
        }

        let mut changed = false;
        if self.is_downloaded.is_none() {
            self.is_downloaded = Some(false);
            changed = true;
        }
        if self.format.is_none() {
            self.format = Some(kind.default_format().to_string());
            changed = true;
        }
        if self.path.is_none() {
            self.path = Some(String::new());
            changed = true;
        }
        if self.title.is_none() {
            self.title = Some(String::new());
            changed = true;
        }
        changed
    }

    /// Marks the entry as materialized under `download_dir`.
    ///
    /// The title is only overwritten when `title` is non-empty, so a
    /// previously-probed title is never clobbered by an empty one.
    pub fn mark_downloaded(&mut self, download_dir: &str, title: &str) {
        self.is_downloaded = Some(true);
        self.path = Some(download_dir.to_string());
        if !title.is_empty() {
            self.title = Some(title.to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_as_str() {
        assert_eq!(MediaKind::Audio.as_str(), "audio");
        assert_eq!(MediaKind::Video.as_str(), "video");
    }

    #[test]
    fn test_media_kind_from_str_valid() {
        assert_eq!("audio".parse::<MediaKind>().unwrap(), MediaKind::Audio);
        assert_eq!("video".parse::<MediaKind>().unwrap(), MediaKind::Video);
    }

    #[test]
    fn test_media_kind_from_str_invalid() {
        let result = "podcast".parse::<MediaKind>();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("invalid media kind"));
    }

    #[test]
    fn test_media_kind_default_format() {
        assert_eq!(MediaKind::Audio.default_format(), "opus");
        assert_eq!(MediaKind::Video.default_format(), "");
    }

    #[test]
    fn test_new_entry_is_fully_populated() {
        let entry = Entry::new("https://example.com/v/1", MediaKind::Audio);
        assert!(entry.has_link());
        assert!(!entry.downloaded());
        assert_eq!(entry.format.as_deref(), Some("opus"));
        assert_eq!(entry.path.as_deref(), Some(""));
        assert_eq!(entry.known_title(), "");
    }

    #[test]
    fn test_normalize_fills_all_missing_fields() {
        let mut entry = Entry {
            link: "https://example.com/v/1".to_string(),
            title: None,
            is_downloaded: None,
            format: None,
            path: None,
        };

        assert!(entry.normalize(MediaKind::Audio));
        assert_eq!(entry.is_downloaded, Some(false));
        assert_eq!(entry.format.as_deref(), Some("opus"));
        assert_eq!(entry.path.as_deref(), Some(""));
        assert_eq!(entry.title.as_deref(), Some(""));
    }

    #[test]
    fn test_normalize_is_noop_on_normalized_entry() {
        let mut entry = Entry::new("https://example.com/v/1", MediaKind::Video);
        assert!(!entry.normalize(MediaKind::Video));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut entry = Entry {
            link: "https://example.com/v/1".to_string(),
            title: None,
            is_downloaded: None,
            format: None,
            path: None,
        };
        assert!(entry.normalize(MediaKind::Video));
        assert!(!entry.normalize(MediaKind::Video));
        assert_eq!(entry.format.as_deref(), Some(""));
    }

    #[test]
    fn test_normalize_skips_linkless_entry() {
        let mut entry = Entry {
            link: String::new(),
            title: None,
            is_downloaded: None,
            format: None,
            path: None,
        };
        assert!(!entry.normalize(MediaKind::Audio));
        assert!(entry.is_downloaded.is_none());
    }

    #[test]
    fn test_normalize_preserves_existing_values() {
        let mut entry = Entry {
            link: "https://example.com/v/1".to_string(),
            title: Some("Kept".to_string()),
            is_downloaded: Some(true),
            format: None,
            path: Some("music".to_string()),
        };
        assert!(entry.normalize(MediaKind::Audio));
        assert_eq!(entry.title.as_deref(), Some("Kept"));
        assert_eq!(entry.is_downloaded, Some(true));
        assert_eq!(entry.path.as_deref(), Some("music"));
    }

    #[test]
    fn test_mark_downloaded_sets_path_and_title() {
        let mut entry = Entry::new("https://example.com/v/1", MediaKind::Audio);
        entry.mark_downloaded("downloads", "Song A");
        assert!(entry.downloaded());
        assert_eq!(entry.path.as_deref(), Some("downloads"));
        assert_eq!(entry.known_title(), "Song A");
    }

    #[test]
    fn test_mark_downloaded_keeps_title_when_new_one_empty() {
        let mut entry = Entry::new("https://example.com/v/1", MediaKind::Audio);
        entry.title = Some("Probed".to_string());
        entry.mark_downloaded("downloads", "");
        assert_eq!(entry.known_title(), "Probed");
    }

    #[test]
    fn test_entry_deserializes_with_only_link() {
        let entry: Entry = serde_json::from_str(r#"{"link": "https://example.com/v/1"}"#).unwrap();
        assert!(entry.has_link());
        assert!(entry.title.is_none());
        assert!(entry.is_downloaded.is_none());
    }

    #[test]
    fn test_entry_serde_roundtrip() {
        let entry = Entry::new("https://example.com/v/1", MediaKind::Audio);
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
