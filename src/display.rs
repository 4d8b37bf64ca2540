//! Terminal output formatting and the sync progress UI.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use mediasync_core::{BatchStats, PendingFetch, SyncObserver};

/// Maximum characters shown for a title in previews and progress lines.
pub const MAX_TITLE_WIDTH: usize = 30;

/// Formats a byte count as `X.X MB` / `X.X GB`, or `Unknown` for zero.
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "Unknown".to_string();
    }
    let mb = size_bytes as f64 / (1024.0 * 1024.0);
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else {
        format!("{mb:.1} MB")
    }
}

/// Truncates text to at most `width` chars, appending `...` if truncated.
pub fn truncate_title(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Renders the preview table for a to-fetch set.
pub fn render_preview(items: &[PendingFetch]) -> String {
    let mut out = String::new();
    out.push_str("\nPending downloads:\n");
    out.push_str(&"-".repeat(50));
    out.push('\n');

    let mut total_size = 0u64;
    for item in items {
        let title = truncate_title(&item.title, MAX_TITLE_WIDTH);
        out.push_str(&format!(
            "{title:<30} {size:>12}\n",
            size = format_size(item.size_bytes)
        ));
        total_size = total_size.saturating_add(item.size_bytes);
    }

    out.push_str(&"-".repeat(50));
    out.push('\n');
    out.push_str(&format!(
        "Total: {} files | {}\n",
        items.len(),
        format_size(total_size)
    ));
    out
}

/// Terminal observer: checking spinner, preview table, per-item progress bar.
pub struct CliObserver {
    quiet: bool,
    active: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            active: Mutex::new(None),
        }
    }

    /// Clears any live bar; call once the run is over.
    pub fn finish(&self) {
        self.clear_active();
    }

    fn clear_active(&self) {
        if let Ok(mut guard) = self.active.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish_and_clear();
        }
    }

    fn set_active(&self, bar: ProgressBar) {
        if let Ok(mut guard) = self.active.lock() {
            if let Some(previous) = guard.take() {
                previous.finish_and_clear();
            }
            *guard = Some(bar);
        }
    }

    fn with_active(&self, apply: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.active.lock()
            && let Some(bar) = guard.as_ref()
        {
            apply(bar);
        }
    }
}

impl SyncObserver for CliObserver {
    fn probing(&self, current: usize, total: usize) {
        if self.quiet {
            return;
        }
        if current == 1 {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));
            self.set_active(spinner);
        }
        self.with_active(|bar| {
            bar.set_message(format!("[{current}/{total}] Checking metadata..."));
        });
    }

    fn preview(&self, items: &[PendingFetch]) {
        self.clear_active();
        if !self.quiet {
            print!("{}", render_preview(items));
            println!("\nDownloading:");
        }
    }

    fn fetch_started(&self, item: &PendingFetch) {
        self.clear_active();
        if self.quiet {
            return;
        }
        println!("\n> {}", truncate_title(&item.title, MAX_TITLE_WIDTH));
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("[{bar:30}] {percent}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        self.set_active(bar);
    }

    fn fetch_progress(&self, percent: f32) {
        self.with_active(|bar| {
            bar.set_position(percent.clamp(0.0, 100.0) as u64);
        });
    }

    fn fetch_completed(&self, _item: &PendingFetch) {
        self.with_active(ProgressBar::finish);
        self.clear_active();
        if !self.quiet {
            println!("Completed");
        }
    }

    fn fetch_failed(&self, _item: &PendingFetch) {
        self.clear_active();
        if !self.quiet {
            println!("Failed (will retry on a later run)");
        }
    }

    fn batch_completed(&self, stats: &BatchStats) {
        self.clear_active();
        if !self.quiet {
            println!(
                "\nBatch finished: {} completed, {} failed. Checking for new links...",
                stats.completed(),
                stats.failed()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_zero_is_unknown() {
        assert_eq!(format_size(0), "Unknown");
    }

    #[test]
    fn test_format_size_megabytes() {
        assert_eq!(format_size(3_000_000), "2.9 MB");
    }

    #[test]
    fn test_format_size_gigabytes() {
        assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2.0 GB");
    }

    #[test]
    fn test_truncate_title_short_unchanged() {
        assert_eq!(truncate_title("Song A", 30), "Song A");
    }

    #[test]
    fn test_truncate_title_long_gets_ellipsis() {
        let long = "A Title Considerably Longer Than Thirty Characters";
        let truncated = truncate_title(long, 30);
        assert_eq!(truncated.chars().count(), 30);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_render_preview_contains_totals() {
        let items = vec![
            PendingFetch {
                link: "https://example.com/v/1".to_string(),
                title: "Song A".to_string(),
                size_bytes: 3_000_000,
            },
            PendingFetch {
                link: "https://example.com/v/2".to_string(),
                title: "Song B".to_string(),
                size_bytes: 0,
            },
        ];
        let rendered = render_preview(&items);
        assert!(rendered.contains("Song A"));
        assert!(rendered.contains("2.9 MB"));
        assert!(rendered.contains("Unknown"));
        assert!(rendered.contains("Total: 2 files"));
    }
}
