//! On-disk satisfaction heuristic.
//!
//! Decides whether a probed title is already materialized among the scanned
//! filename keys. The rule is deliberately fuzzy: fetch-tool filenames may
//! carry suffixes or minor punctuation differences from the probed title, so
//! besides an exact normalized match, a bounded prefix of the title being a
//! substring of a key also counts. False positives on titles sharing a long
//! common prefix are an accepted tradeoff: the worst case is skipping a
//! redundant fetch, not losing data.
//!
//! The policy lives behind its own type so the prefix length and containment
//! rule can be swapped without touching the reconciler.

use std::collections::HashSet;

/// Default number of leading characters used for the containment check.
pub const DEFAULT_PREFIX_LEN: usize = 30;

/// Title-vs-scanned-keys matching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Leading characters of the normalized title used for the substring
    /// containment check.
    pub prefix_len: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }
}

impl MatchPolicy {
    /// Creates a policy with a custom prefix length.
    #[must_use]
    pub fn with_prefix_len(prefix_len: usize) -> Self {
        Self { prefix_len }
    }

    /// Returns true when `title` is judged already satisfied by a scanned
    /// key.
    ///
    /// Always false for an empty title (nothing to judge). Otherwise the
    /// title is normalized (lowercase, trim) and matches when it equals a
    /// key exactly, or when its prefix is contained in some key.
    #[must_use]
    pub fn is_satisfied(&self, title: &str, scanned_keys: &HashSet<String>) -> bool {
        if title.is_empty() {
            return false;
        }

        let normalized = title.to_lowercase().trim().to_string();
        if normalized.is_empty() {
            return false;
        }
        let prefix: String = normalized.chars().take(self.prefix_len).collect();

        scanned_keys
            .iter()
            .any(|key| normalized == *key || key.contains(&prefix))
    }
}
