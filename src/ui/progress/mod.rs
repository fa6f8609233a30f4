// Thu Jan 22 2026 - Alex

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct ProgressManager {
    style: ProgressStyle,
    hidden: bool,
}

impl ProgressManager {
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ ");

        Self { style, hidden: false }
    }

    pub fn hidden() -> Self {
        let mut manager = Self::new();
        manager.hidden = true;
        manager
    }

    /// Bar over the scanned byte range.
    pub fn create_scan_progress(&self, total: u64, message: &str) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if self.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(self.style.clone());
        pb.set_message(message.to_string());
        pb
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}
