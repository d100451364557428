//! Row progress on stderr
//!
//! stdout may carry the table, so the bar never draws there. A disabled
//! tracker still counts rows through a hidden bar.

use indicatif::{ProgressBar, ProgressStyle};

const ROW_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} rows ({per_sec}, eta {eta})";

/// Rows written so far, optionally drawn as a bar
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Track `target` rows; draw only when `visible`
    pub fn new(target: u64, visible: bool) -> Self {
        if !visible {
            return Self::hidden();
        }

        let bar = ProgressBar::new(target);
        let style = ProgressStyle::default_bar()
            .template(ROW_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }

    /// Tracker that counts without drawing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Set the number of rows written so far
    pub fn update(&self, rows: u64) {
        self.bar.set_position(rows);
    }

    pub fn rows(&self) -> u64 {
        self.bar.position()
    }

    /// Clear the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
