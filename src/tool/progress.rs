//! Streaming progress-line parsing for the fetch tool's output.

use std::sync::LazyLock;

use regex::Regex;

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)%")
        .unwrap_or_else(|e| panic!("invalid static percent regex: {e}"))
});

/// Extracts the percentage from a recognizable progress line.
///
/// Only lines carrying the tool's `[download]` tag and a percent token are
/// considered; everything else (destination notices, post-processing chatter)
/// yields `None`.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<f32> {
    if !line.contains("[download]") || !line.contains('%') {
        return None;
    }
    let captures = PERCENT_RE.captures(line)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Per-item filter keeping observed progress strictly increasing.
///
/// The tool's stream can repeat a percentage or, on malformed output, emit a
/// regressed value; neither must reach the presentation layer.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: Option<f32>,
}

impl ProgressTracker {
    /// Creates a tracker with no progress observed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one parsed percentage; returns it only when it advances past
    /// everything seen so far.
    pub fn observe(&mut self, percent: f32) -> Option<f32> {
        match self.last {
            Some(previous) if percent <= previous => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }

    /// Returns the highest percentage accepted so far.
    #[must_use]
    pub fn last(&self) -> Option<f32> {
        self.last
    }
}
