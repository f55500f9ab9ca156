//! Progress reporting for directory analysis.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

/// A thread-safe progress bar shared by parallel workers.
#[derive(Clone)]
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Progress over `total` files. Hidden when stderr is not a terminal.
    pub fn new(total: usize, message: &str) -> Self {
        if !std::io::stderr().is_terminal() {
            return Self::hidden(total);
        }
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(message.to_string());
        Self { bar }
    }

    /// A tracker that draws nothing.
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);
        Self { bar }
    }

    /// Increment the progress counter by one.
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Finish and clear the progress bar.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Get the current count.
    pub fn count(&self) -> u64 {
        self.bar.position()
    }
}
