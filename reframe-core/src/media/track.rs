// ============================================================================
// reframe-core/src/media/track.rs
// ============================================================================
//
// TRACK MODEL: Read cursors over input tracks and state of output tracks
//
// An InputTrack is a view onto one track of a shared MediaSource. It holds
// the 1-based sample cursor and at most one pending sample. The pending
// sample is fetched on the first peek, served unchanged by later peeks,
// and handed over on advance.
//
// On fetch the sample's description index is mapped through the remap table
// and its timestamps are shifted so the first fetched sample starts at 0.

use log::trace;

use crate::config::TrackOptions;
use crate::engine::MediaSource;
use crate::error::{CoreError, CoreResult};
use crate::media::{MediaParams, Sample, SampleInfo, Summary, TrackParams};

/// A sample description of an input track and where it lands in the output.
#[derive(Debug, Clone)]
pub struct InputSummary {
    pub summary: Summary,
    pub active: bool,
    /// 1-based output index, 0 until attached.
    pub output_index: u32,
}

/// Result of peeking at a track.
#[derive(Debug, PartialEq, Eq)]
pub enum Peek<'a> {
    Sample(&'a Sample),
    EndOfTrack,
}

#[derive(Debug, Clone)]
pub struct InputTrack {
    pub track_id: u32,
    pub active: bool,
    pub track_params: TrackParams,
    pub media_params: MediaParams,
    pub summaries: Vec<InputSummary>,
    pub last_sample_delta: u32,
    pub options: TrackOptions,
    /// Presentation offset of the starting random-access point, in media ticks.
    pub composition_delay: u64,
    /// Presentation time hidden after a RAP-respecting seek, in media ticks.
    pub skip_duration: u64,
    cursor: u32,
    pending: Option<Sample>,
    reached_end: bool,
    timestamp_offset: Option<u64>,
    rebase_timestamps: bool,
    current_summary_index: u32,
}

impl InputTrack {
    pub fn new(
        track_id: u32,
        track_params: TrackParams,
        media_params: MediaParams,
        summaries: Vec<Summary>,
        last_sample_delta: u32,
    ) -> Self {
        let summaries = summaries
            .into_iter()
            .map(|summary| InputSummary { active: !summary.unsupported, summary, output_index: 0 })
            .collect();
        Self {
            track_id,
            active: true,
            track_params,
            media_params,
            summaries,
            last_sample_delta,
            options: TrackOptions::default(),
            composition_delay: 0,
            skip_duration: 0,
            cursor: 1,
            pending: None,
            reached_end: false,
            timestamp_offset: None,
            rebase_timestamps: true,
            current_summary_index: 0,
        }
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Moves the cursor, e.g. to a seek point. Drops any pending sample.
    pub fn set_cursor(&mut self, sample_number: u32) {
        self.cursor = sample_number.max(1);
        self.pending = None;
    }

    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    pub fn has_active_summary(&self) -> bool {
        self.summaries.iter().any(|s| s.active)
    }

    /// Description index of the most recently appended sample.
    pub fn current_summary_index(&self) -> u32 {
        self.current_summary_index
    }

    pub fn set_current_summary_index(&mut self, index: u32) {
        self.current_summary_index = index;
    }

    pub fn pending(&self) -> Option<&Sample> {
        self.pending.as_ref()
    }

    pub fn seconds(&self, ticks: u64) -> f64 {
        ticks as f64 / self.media_params.timescale as f64
    }

    /// Offset subtracted from every timestamp of this track.
    pub fn timestamp_offset(&self) -> u64 {
        self.timestamp_offset.unwrap_or(0)
    }

    /// Keeps source timestamps as they are instead of starting at DTS 0.
    pub fn keep_source_timestamps(&mut self) {
        self.rebase_timestamps = false;
        self.timestamp_offset = Some(0);
    }

    /// Maps a raw description index to an output index. 0 means "drop".
    ///
    /// Indices outside `[1, count]` are clamped rather than rejected: 0 reads
    /// as the first description and anything past the end as the last one.
    /// This leniency tolerates malformed inputs and is not a format rule.
    pub fn map_summary_index(&self, raw_index: u32) -> u32 {
        let count = self.summaries.len() as u32;
        if count == 0 {
            return 0;
        }
        let index = raw_index.clamp(1, count);
        let summary = &self.summaries[(index - 1) as usize];
        if summary.active { summary.output_index } else { 0 }
    }

    /// Returns the next unconsumed sample without advancing.
    ///
    /// Repeated calls return the same sample until `advance`. A sample that
    /// cannot be fetched while the source still reports it as present is a
    /// `Scheduling` error; a missing sample is the clean end of the track.
    pub fn peek_next_sample(&mut self, source: &dyn MediaSource) -> CoreResult<Peek<'_>> {
        if self.pending.is_none() && !self.reached_end {
            match source.fetch_sample(self.track_id, self.cursor) {
                Some(mut sample) => {
                    sample.index = self.map_summary_index(sample.index);
                    if self.current_summary_index == 0 {
                        self.current_summary_index = sample.index;
                    }
                    // Dropped samples never fix the offset.
                    if sample.index != 0 && self.timestamp_offset.is_none() {
                        self.timestamp_offset = Some(if self.rebase_timestamps { sample.dts } else { 0 });
                    }
                    let offset = self.timestamp_offset();
                    sample.dts = sample.dts.saturating_sub(offset);
                    sample.cts = sample.cts.saturating_sub(offset);
                    self.pending = Some(sample);
                }
                None if source.sample_exists(self.track_id, self.cursor) => {
                    return Err(CoreError::Scheduling(format!(
                        "failed to get sample {} of track {} from {}",
                        self.cursor,
                        self.track_id,
                        source.name()
                    )));
                }
                None => {
                    trace!("Track {} of {} reached its end", self.track_id, source.name());
                    self.reached_end = true;
                }
            }
        }
        Ok(match &self.pending {
            Some(sample) => Peek::Sample(sample),
            None => Peek::EndOfTrack,
        })
    }

    /// Consumes the pending sample and moves the cursor forward.
    pub fn advance(&mut self) -> Option<Sample> {
        let sample = self.pending.take()?;
        self.cursor += 1;
        Some(sample)
    }

    /// Metadata of the sample `ahead` positions after the cursor, timestamps shifted.
    pub fn probe(&self, source: &dyn MediaSource, ahead: u32) -> Option<SampleInfo> {
        let offset = self.timestamp_offset();
        source.sample_info(self.track_id, self.cursor + ahead).map(|mut info| {
            info.dts = info.dts.saturating_sub(offset);
            info.cts = info.cts.saturating_sub(offset);
            info
        })
    }
}

/// An output track bound to one active input track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTrack {
    /// Track ID assigned by the sink.
    pub track_id: u32,
    /// Position of the bound input movie.
    pub movie: usize,
    /// Position of the bound track inside its movie.
    pub track: usize,
    pub media_timescale: u32,
    pub sample_count: u32,
    pub last_sample_dts: u64,
    pub last_sample_delta: u32,
}

impl OutputTrack {
    pub fn new(track_id: u32, movie: usize, track: usize, media_timescale: u32, last_sample_delta: u32) -> Self {
        Self {
            track_id,
            movie,
            track,
            media_timescale,
            sample_count: 0,
            last_sample_dts: 0,
            last_sample_delta,
        }
    }
}
