//! Progress reporting for remux and edit runs.
//!
//! The scheduler returns a `StepOutcome` from every step instead of bumping
//! shared counters. The run folds outcomes into a `RemuxProgress` and hands
//! it to a `ProgressReporter` every few megabytes of imported media. The
//! same reporter receives byte progress while the writer finalizes a file.

/// What happened to the sample of the visited track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// A sample was appended to the output.
    Appended { bytes: u64 },
    /// A sample was discarded because its description was excluded.
    Dropped,
    /// The visited track held its sample back.
    Skipped,
    /// The visited track had nothing to do.
    Idle,
    /// Every track reached its end.
    Finished,
}

/// Result of one scheduler step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub sample: SampleOutcome,
    /// A movie fragment was closed before the sample was considered.
    pub fragment_flushed: bool,
    /// The flush also opened a new segment file.
    pub segment_switched: bool,
}

impl StepOutcome {
    pub fn new(sample: SampleOutcome) -> Self {
        Self { sample, fragment_flushed: false, segment_switched: false }
    }

    pub fn is_finished(&self) -> bool {
        self.sample == SampleOutcome::Finished
    }
}

/// Running totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemuxProgress {
    pub appended_samples: u64,
    pub dropped_samples: u64,
    pub skipped_steps: u64,
    pub total_media_size: u64,
    pub fragments: u32,
    pub segments: u32,
}

impl RemuxProgress {
    /// Folds one step into the totals.
    pub fn record(&mut self, outcome: StepOutcome) {
        if outcome.fragment_flushed {
            self.fragments += 1;
        }
        if outcome.segment_switched {
            self.segments += 1;
        }
        match outcome.sample {
            SampleOutcome::Appended { bytes } => {
                self.appended_samples += 1;
                self.total_media_size += bytes;
            }
            SampleOutcome::Dropped => self.dropped_samples += 1,
            SampleOutcome::Skipped => self.skipped_steps += 1,
            SampleOutcome::Idle | SampleOutcome::Finished => {}
        }
    }
}

/// Imported media between two `ProgressReporter::imported` calls.
pub const IMPORT_REPORT_INTERVAL: u64 = 4 * 1024 * 1024;

/// Receives progress of a run.
pub trait ProgressReporter {
    /// Called each time another `IMPORT_REPORT_INTERVAL` bytes were appended.
    fn imported(&mut self, _progress: &RemuxProgress) {}

    /// Byte progress while the writer finalizes a file.
    fn finalizing(&mut self, written: u64, total: u64);

    fn done(&mut self) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn finalizing(&mut self, _written: u64, _total: u64) {}
}
