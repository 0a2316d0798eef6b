// src/pipeline/progress.rs

//! Progress bar shown around per-bundle loops.

use indicatif::{ProgressBar, ProgressStyle};

/// Progress display for a bundle loop. Hidden displays draw nothing.
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub fn new(total: usize, visible: bool) -> Self {
        if !visible {
            return Self::hidden();
        }
        let style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Show the bundle currently being processed.
    pub fn start(&self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
