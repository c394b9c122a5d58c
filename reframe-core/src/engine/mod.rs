// ============================================================================
// reframe-core/src/engine/mod.rs
// ============================================================================
//
// CONTAINER ENGINE: Storage abstraction consumed by the remuxer
//
// The core never touches boxes or bytes on disk. Everything it needs from a
// container goes through two traits:
//
// - MediaSource: one per physical input. Tracks are addressed by 1-based
//   track ID and share the single handle.
// - MediaSink: one per output session, covering track creation, sample
//   appends, fragment/segment boundaries and edit lists.
//
// The bundled implementation (`memory`) stores a movie as a JSON layout
// manifest (`manifest`).

pub mod manifest;
pub mod memory;

use std::path::Path;

use crate::error::CoreResult;
use crate::media::{
    DataReference, Edit, FileParams, HandlerKind, MediaParams, MediaTimestamp, MovieParams,
    Sample, SampleInfo, SegmentParams, Summary, TrackParams, WriterOptions,
};
use crate::progress::ProgressReporter;

pub use manifest::{MovieManifest, SampleRecord, TrackManifest};
pub use memory::{MemorySink, MemorySource, SinkEvent};

/// Read side of the container engine.
pub trait MediaSource {
    /// Human-readable name for log lines.
    fn name(&self) -> &str;

    fn file_params(&self) -> FileParams;
    fn movie_params(&self) -> MovieParams;
    fn track_ids(&self) -> Vec<u32>;

    fn track_params(&self, track_id: u32) -> CoreResult<TrackParams>;
    fn media_params(&self, track_id: u32) -> CoreResult<MediaParams>;
    fn summaries(&self, track_id: u32) -> CoreResult<Vec<Summary>>;
    fn data_references(&self, track_id: u32) -> CoreResult<Vec<DataReference>>;
    fn attach_data_reference(&mut self, track_id: u32, index: u32, location: &Path) -> CoreResult<()>;
    fn last_sample_delta(&self, track_id: u32) -> CoreResult<u32>;
    fn edits(&self, track_id: u32) -> CoreResult<Vec<Edit>>;
    fn composition_to_decode_shift(&self, track_id: u32) -> CoreResult<u32>;

    /// Fetches the sample at a 1-based position, payload included.
    fn fetch_sample(&self, track_id: u32, number: u32) -> Option<Sample>;
    /// Cheap metadata probe. `None` past the end of the track.
    fn sample_info(&self, track_id: u32, number: u32) -> Option<SampleInfo>;

    fn sample_exists(&self, track_id: u32, number: u32) -> bool {
        self.sample_info(track_id, number).is_some()
    }

    /// Closest random-access point at or before `number`, else the first one after it.
    fn closest_random_access_point(&self, track_id: u32, number: u32) -> Option<u32> {
        let is_rap = |n: u32| self.sample_info(track_id, n).map(|info| info.is_rap());
        (1..=number).rev().find(|&n| is_rap(n) == Some(true)).or_else(|| {
            (number.max(1)..)
                .map_while(|n| is_rap(n).map(|rap| (n, rap)))
                .find_map(|(n, rap)| rap.then_some(n))
        })
    }

    /// Decode-ordered timestamps for every sample of a track.
    fn timestamps(&self, track_id: u32) -> CoreResult<Vec<MediaTimestamp>>;
    fn replace_timestamps(&mut self, track_id: u32, timestamps: Vec<MediaTimestamp>) -> CoreResult<()>;
    fn set_media_timescale(&mut self, track_id: u32, timescale: u32) -> CoreResult<()>;
}

/// Write side of the container engine.
pub trait MediaSink {
    fn configure(&mut self, file: &FileParams, options: &WriterOptions) -> CoreResult<()>;
    fn set_movie_params(&mut self, params: &MovieParams) -> CoreResult<()>;
    fn movie_timescale(&self) -> u32;

    /// Creates a track and returns its ID.
    fn create_track(&mut self, handler: HandlerKind) -> CoreResult<u32>;
    fn delete_track(&mut self, track_id: u32);
    fn set_track_params(&mut self, track_id: u32, params: &TrackParams) -> CoreResult<()>;
    fn set_media_params(&mut self, track_id: u32, params: &MediaParams) -> CoreResult<()>;
    fn media_timescale(&self, track_id: u32) -> CoreResult<u32>;

    /// Adds a sample description and returns its 1-based index.
    fn add_summary(&mut self, track_id: u32, summary: &Summary) -> CoreResult<u32>;

    /// Appends a sample. The sample is consumed on failure too.
    fn append_sample(&mut self, track_id: u32, sample: Sample) -> CoreResult<()>;
    /// Flushes pooled samples, giving the last one the supplied duration.
    fn flush_pooled_samples(&mut self, track_id: u32, last_sample_delta: u64) -> CoreResult<()>;

    fn clear_edits(&mut self, track_id: u32) -> CoreResult<()>;
    fn push_edit(&mut self, track_id: u32, edit: Edit) -> CoreResult<()>;
    fn composition_to_decode_shift(&self, track_id: u32) -> CoreResult<u32>;

    fn create_fragment(&mut self) -> CoreResult<()>;
    /// Closes the current file and continues writing into `path`.
    fn switch_segment(
        &mut self,
        path: &Path,
        params: &SegmentParams,
        progress: &mut dyn ProgressReporter,
    ) -> CoreResult<()>;
    fn finish(&mut self, progress: &mut dyn ProgressReporter) -> CoreResult<()>;

    /// Removes every durable artifact written so far.
    fn discard(&mut self);
}
