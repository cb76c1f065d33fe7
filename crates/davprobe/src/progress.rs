//! Live progress bar for a verification run.
//!
//! Example output:
//! ```text
//!   ⠋ client 3/9, file 4/9 (2 errors)
//!   ██████░░░░░░░░░░░░░░  22/81  ETA 00:00:08
//! ```

use crate::harness::RoundProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter fed from the harness's round callback.
pub struct RoundProgressReporter {
    progress: ProgressBar,
    color: bool,
    clients: usize,
    files_per_client: usize,
}

impl RoundProgressReporter {
    /// Create a visible progress bar for `total` rounds.
    pub fn new(total: u64, clients: usize, files_per_client: usize, color: bool) -> Self {
        Self::with_bar(ProgressBar::new(total), clients, files_per_client, color)
    }

    /// Create a reporter that draws nothing, for quiet or non-terminal runs.
    pub fn hidden(total: u64, clients: usize, files_per_client: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total);
        Self::with_bar(bar, clients, files_per_client, false)
    }

    fn with_bar(progress: ProgressBar, clients: usize, files_per_client: usize, color: bool) -> Self {
        let template = if color {
            "  {spinner:.cyan} {msg}\n  {bar:40.cyan/dim}  {pos}/{len}  ETA {eta}"
        } else {
            "  {spinner} {msg}\n  {bar:40}  {pos}/{len}  ETA {eta}"
        };

        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            progress.set_style(
                style
                    .progress_chars("█▓░")
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        progress.set_message("Connecting...");
        progress.enable_steady_tick(Duration::from_millis(100));

        Self {
            progress,
            color,
            clients,
            files_per_client,
        }
    }

    /// Update the bar after a round.
    pub fn update(&self, round: &RoundProgress) {
        use owo_colors::OwoColorize;

        self.progress.set_position(round.completed);

        let position = format!(
            "client {}/{}, file {}/{}",
            round.client, self.clients, round.file, self.files_per_client
        );
        let message = match (round.errors, self.color) {
            (0, _) => position,
            (errors, true) => format!("{position} ({})", format!("{errors} errors").red()),
            (errors, false) => format!("{position} ({errors} errors)"),
        };
        self.progress.set_message(message);
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.progress.position()
    }

    /// Clear the bar.
    pub fn finish(self) {
        self.progress.finish_and_clear();
    }
}
