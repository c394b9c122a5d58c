// ============================================================================
// reframe-core/src/remux/session.rs
// ============================================================================
//
// OUTPUT SESSION: One output file (or segment series) being written
//
// The session owns the output-track table and the fragment and segment
// state, and borrows the sink and the progress reporter for the duration of
// a run. It is the only place that talks to the sink:
//
// - `prepare` creates one output track per active input track, excluding
//   the tracks the sink refuses.
// - `flush_fragment` closes a movie fragment and, when segmenting, may open
//   the next segment file.
// - `finish` closes the last file.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::engine::{MediaSink, MediaSource};
use crate::error::{CoreError, CoreResult};
use crate::media::{Edit, FileParams, InputMovie, InputTrack, MovieParams, OutputTrack, Sample, WriterOptions};
use crate::progress::{ProgressReporter, RemuxProgress};

use super::fragment::FragmentState;
use super::seek::set_starting_point;
use super::segment::SegmentState;
use super::timeline_map::{construct_timeline_maps, replace_timeline};

/// File-level parameters of an output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub file: FileParams,
    pub movie: MovieParams,
    pub writer: WriterOptions,
}

/// Fragmentation and segmentation settings of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub output: PathBuf,
    /// 1-based output track whose random-access points cut fragments. 0 disables fragmentation.
    pub fragment_base_track: u32,
    pub min_fragment_duration: f64,
    /// 0 writes everything into `output`.
    pub subsegments_per_segment: u32,
}

impl SessionOptions {
    /// A plain, non-fragmented movie.
    pub fn unfragmented(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            fragment_base_track: 0,
            min_fragment_duration: 0.0,
            subsegments_per_segment: 0,
        }
    }
}

/// Sets up one output track. Errors leave the created track in the sink.
fn attach_track(
    sink: &mut dyn MediaSink,
    source: &dyn MediaSource,
    track: &mut InputTrack,
    track_id: u32,
) -> CoreResult<()> {
    sink.set_track_params(track_id, &track.track_params)?;
    sink.set_media_params(track_id, &track.media_params)?;

    for (i, entry) in track.summaries.iter_mut().enumerate() {
        entry.output_index = 0;
        if !entry.active {
            continue;
        }
        match sink.add_summary(track_id, &entry.summary) {
            Ok(index) => entry.output_index = index,
            Err(e) => {
                warn!(
                    "{}: dropping sample description {} of track {}: {}",
                    source.name(),
                    i + 1,
                    track.track_id,
                    e
                );
                entry.active = false;
            }
        }
    }
    if !track.has_active_summary() {
        return Err(CoreError::ContainerWrite(
            "no sample description could be added".to_string(),
        ));
    }
    set_starting_point(source, track)
}

pub struct OutputSession<'s> {
    sink: &'s mut dyn MediaSink,
    reporter: &'s mut dyn ProgressReporter,
    tracks: Vec<OutputTrack>,
    fragment: FragmentState,
    segment: SegmentState,
}

impl<'s> OutputSession<'s> {
    /// Configures the sink and creates the output tracks.
    ///
    /// A track whose parameters, sample descriptions or starting point the
    /// sink or source cannot honor is excluded with a warning. No remaining
    /// track is a `Configuration` error.
    pub fn prepare(
        sink: &'s mut dyn MediaSink,
        reporter: &'s mut dyn ProgressReporter,
        movies: &mut [InputMovie],
        layout: &OutputLayout,
        options: &SessionOptions,
    ) -> CoreResult<Self> {
        sink.configure(&layout.file, &layout.writer)?;
        sink.set_movie_params(&layout.movie)?;

        let mut tracks = Vec::new();
        for (m, movie) in movies.iter_mut().enumerate() {
            let (source, inputs) = movie.parts_mut();
            for (t, track) in inputs.iter_mut().enumerate() {
                if !track.active {
                    continue;
                }
                let track_id = sink.create_track(track.media_params.handler)?;
                match attach_track(sink, source, track, track_id) {
                    Ok(()) => {
                        debug!(
                            "{}: track {} becomes output track {}",
                            source.name(),
                            track.track_id,
                            track_id
                        );
                        tracks.push(OutputTrack::new(
                            track_id,
                            m,
                            t,
                            track.media_params.timescale,
                            track.last_sample_delta,
                        ));
                    }
                    Err(e) => {
                        warn!("{}: excluding track {}: {}", source.name(), track.track_id, e);
                        sink.delete_track(track_id);
                        track.active = false;
                    }
                }
            }
        }
        if tracks.is_empty() {
            return Err(CoreError::Configuration("no output tracks remain".to_string()));
        }

        let fragment = match options.fragment_base_track {
            0 => FragmentState::disabled(),
            base if base as usize > tracks.len() => {
                return Err(CoreError::Configuration(format!(
                    "fragment base track {} does not exist, the output has {} tracks",
                    base,
                    tracks.len()
                )));
            }
            base => FragmentState::new(base as usize - 1, options.min_fragment_duration),
        };
        let per_segment = if fragment.is_enabled() { options.subsegments_per_segment } else { 0 };
        let segment = SegmentState::new(
            per_segment,
            options.output.clone(),
            layout.file.clone(),
            layout.writer.mode,
        );
        info!("Prepared {} output tracks", tracks.len());
        Ok(Self { sink, reporter, tracks, fragment, segment })
    }

    pub fn tracks(&self) -> &[OutputTrack] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn fragment(&self) -> &FragmentState {
        &self.fragment
    }

    pub fn fragment_mut(&mut self) -> &mut FragmentState {
        &mut self.fragment
    }

    /// Appends a sample to the output track of `lane`.
    pub fn append(&mut self, lane: usize, sample: Sample) -> CoreResult<()> {
        let out = &mut self.tracks[lane];
        let count = out.sample_count.checked_add(1).ok_or_else(|| {
            CoreError::ResourceExhausted(format!("output track {} is full", out.track_id))
        })?;
        let dts = sample.dts;
        self.sink.append_sample(out.track_id, sample)?;
        out.sample_count = count;
        out.last_sample_dts = dts;
        Ok(())
    }

    pub fn report_import(&mut self, progress: &RemuxProgress) {
        self.reporter.imported(progress);
    }

    /// Closes the current movie fragment and opens the next one.
    ///
    /// Each track's last pooled sample lasts until the track's next sample,
    /// or its last known sample duration once the track has ended. Returns
    /// whether a new segment file was opened.
    pub fn flush_fragment(&mut self, movies: &mut [InputMovie]) -> CoreResult<bool> {
        for out in &self.tracks {
            let movie = &movies[out.movie];
            let track = &movie.tracks[out.track];
            let delta = if track.reached_end() || out.sample_count == 0 {
                out.last_sample_delta as u64
            } else {
                match track.probe(movie.source(), 0) {
                    Some(next) => next.dts.saturating_sub(out.last_sample_dts),
                    None => out.last_sample_delta as u64,
                }
            };
            self.sink.flush_pooled_samples(out.track_id, delta)?;
        }
        let switched = self.handle_segmentation()?;
        self.sink.create_fragment()?;
        self.fragment.complete_flush();

        // A new fragment may start with a different sample description.
        for out in &self.tracks {
            let track = &mut movies[out.movie].tracks[out.track];
            let index = track.pending().map_or(0, |sample| sample.index);
            track.set_current_summary_index(index);
        }
        Ok(switched)
    }

    fn handle_segmentation(&mut self) -> CoreResult<bool> {
        let Some(switch) = self.segment.on_fragment_flushed() else {
            return Ok(false);
        };
        info!("Starting segment {}", switch.path.display());
        self.sink.switch_segment(&switch.path, &switch.params, &mut *self.reporter)?;
        Ok(true)
    }

    /// Flushes every output track with its last known sample duration.
    pub fn flush_remaining(&mut self) -> CoreResult<()> {
        for out in &self.tracks {
            self.sink.flush_pooled_samples(out.track_id, out.last_sample_delta as u64)?;
        }
        Ok(())
    }

    pub fn construct_timeline_maps(&mut self, movies: &[InputMovie]) -> CoreResult<()> {
        let fragmented = self.fragment.is_enabled();
        construct_timeline_maps(&mut *self.sink, &self.tracks, movies, fragmented)
    }

    pub fn replace_timeline(&mut self, lane: usize, edits: &[Edit]) -> CoreResult<()> {
        let track_id = self.tracks[lane].track_id;
        replace_timeline(&mut *self.sink, track_id, edits)
    }

    /// Closes the last file.
    pub fn finish(self) -> CoreResult<()> {
        self.sink.finish(self.reporter)
    }
}
