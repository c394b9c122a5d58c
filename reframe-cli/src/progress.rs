// ============================================================================
// reframe-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Terminal progress for remux and edit runs
//
// Import progress is shown as a spinner with the running sample count and
// media size. Finalization of each output file switches to a byte bar.
// indicatif hides both when stderr is not a terminal.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reframe_core::{ProgressReporter, RemuxProgress, format_bytes};

/// ProgressReporter that draws on the terminal.
#[derive(Default)]
pub struct CliProgress {
    import: Option<ProgressBar>,
    finalize: Option<ProgressBar>,
}

impl CliProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn import_bar(&mut self) -> &ProgressBar {
        self.import.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner} Importing: {msg} ({elapsed})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        })
    }

    fn finalize_bar(&mut self, total: u64) -> &ProgressBar {
        if let Some(pb) = self.import.take() {
            pb.finish_and_clear();
        }
        let pb = self.finalize.get_or_insert_with(|| {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  Finalizing: {percent:>3}% [{bar:30}] {bytes}/{total_bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##."),
            );
            pb
        });
        pb.set_length(total);
        pb
    }

    /// Message shown next to the import spinner.
    pub fn import_message(progress: &RemuxProgress) -> String {
        format!(
            "{} samples, {}",
            progress.appended_samples,
            format_bytes(progress.total_media_size)
        )
    }
}

impl ProgressReporter for CliProgress {
    fn imported(&mut self, progress: &RemuxProgress) {
        let message = Self::import_message(progress);
        self.import_bar().set_message(message);
    }

    fn finalizing(&mut self, written: u64, total: u64) {
        self.finalize_bar(total).set_position(written);
    }

    fn done(&mut self) {
        for pb in [self.import.take(), self.finalize.take()].into_iter().flatten() {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_message_shows_count_and_size() {
        let progress = RemuxProgress {
            appended_samples: 1200,
            total_media_size: 8 * 1024 * 1024,
            ..RemuxProgress::default()
        };
        assert_eq!(CliProgress::import_message(&progress), "1200 samples, 8.00 MiB");
    }

    #[test]
    fn done_clears_bars() {
        let mut progress = CliProgress::new();
        progress.imported(&RemuxProgress::default());
        progress.finalizing(10, 100);
        progress.done();
        assert!(progress.import.is_none() && progress.finalize.is_none());
    }
}
