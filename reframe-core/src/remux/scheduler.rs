// ============================================================================
// reframe-core/src/remux/scheduler.rs
// ============================================================================
//
// INTERLEAVING SCHEDULER: Which track contributes the next output sample
//
// Output tracks are visited round-robin in input order. Each step looks at
// the pending sample of one track and either appends it, drops it (its
// sample description was excluded) or holds it back:
//
// - Outside a pending fragment flush, a sample is appended when its DTS does
//   not pass the largest DTS appended so far, or when every unfinished track
//   has been skipped in a row.
// - While a flush is pending, the base track holds back and every other
//   track only appends up to its last sample before a random-access point at
//   or before the boundary.
//
// The pending flush happens at the start of a step once every unfinished
// track was skipped, or immediately when nothing has been appended yet.

use log::{debug, trace};

use crate::error::{CoreError, CoreResult};
use crate::media::{InputMovie, Peek};
use crate::progress::{IMPORT_REPORT_INTERVAL, RemuxProgress, SampleOutcome, StepOutcome};

use super::session::OutputSession;

/// Copy of the pending sample fields a step needs after the peek borrow ends.
#[derive(Debug, Clone, Copy)]
struct PendingView {
    seconds: f64,
    is_rap: bool,
    index: u32,
    current_index: u32,
}

impl PendingView {
    /// A sample switching to another description needs a fresh fragment.
    fn needs_new_fragment(&self, fragmenting: bool) -> bool {
        fragmenting && self.index != 0 && self.index != self.current_index
    }
}

#[derive(Debug)]
pub struct Scheduler {
    lane_count: usize,
    cursor: usize,
    /// Largest appended DTS across all tracks, in seconds.
    largest_dts: f64,
    consecutive_skips: usize,
    unfinished: usize,
    media_size: u64,
}

impl Scheduler {
    pub fn new(lane_count: usize) -> Self {
        Self {
            lane_count,
            cursor: 0,
            largest_dts: 0.0,
            consecutive_skips: 0,
            unfinished: lane_count,
            media_size: 0,
        }
    }

    fn all_skipped(&self) -> bool {
        self.consecutive_skips >= self.unfinished
    }

    /// Visits the next track.
    pub fn step(&mut self, movies: &mut [InputMovie], session: &mut OutputSession<'_>) -> CoreResult<StepOutcome> {
        if self.unfinished == 0 || self.lane_count == 0 {
            return Ok(StepOutcome::new(SampleOutcome::Finished));
        }
        let lane = self.cursor;
        self.cursor = (self.cursor + 1) % self.lane_count;
        let (m, t) = {
            let out = &session.tracks()[lane];
            (out.movie, out.track)
        };

        let view = {
            let (source, tracks) = movies[m].parts_mut();
            let track = &mut tracks[t];
            if track.reached_end() {
                return Ok(StepOutcome::new(SampleOutcome::Idle));
            }
            let timescale = track.media_params.timescale as f64;
            let current_index = track.current_summary_index();
            match track.peek_next_sample(source)? {
                Peek::Sample(sample) => Some(PendingView {
                    seconds: sample.dts as f64 / timescale,
                    is_rap: sample.is_rap(),
                    index: sample.index,
                    current_index,
                }),
                Peek::EndOfTrack => None,
            }
        };
        let Some(mut view) = view else {
            self.unfinished -= 1;
            debug!("Output lane {} finished, {} remaining", lane, self.unfinished);
            let outcome = if self.unfinished == 0 { SampleOutcome::Finished } else { SampleOutcome::Idle };
            return Ok(StepOutcome::new(outcome));
        };
        // Peeking may have set the current description of a fresh track.
        view.current_index = movies[m].tracks[t].current_summary_index();

        let fragmenting = session.fragment().is_enabled();
        let mut outcome = StepOutcome::new(SampleOutcome::Skipped);
        if fragmenting {
            if !session.fragment().is_pending() {
                if session.fragment().is_boundary(lane, view.is_rap, view.seconds)
                    || view.needs_new_fragment(fragmenting)
                {
                    trace!("Fragment boundary pending at {:.3}s", view.seconds);
                    session.fragment_mut().begin_pending(view.seconds);
                }
            } else if self.all_skipped() || self.media_size == 0 {
                outcome.segment_switched = session.flush_fragment(movies)?;
                outcome.fragment_flushed = true;
                view.current_index = movies[m].tracks[t].current_summary_index();
            }
        }

        let need_new_fragment = view.needs_new_fragment(fragmenting);
        let fragment = session.fragment();
        let append = if !fragment.is_pending() {
            (view.seconds <= self.largest_dts || self.all_skipped()) && !need_new_fragment
        } else if !fragment.is_base_lane(lane) && !need_new_fragment {
            // Stop each track right before a random-access point at or before the boundary.
            !view.is_rap || {
                let movie = &movies[m];
                let track = &movie.tracks[t];
                track.probe(movie.source(), 1).is_some_and(|next| {
                    next.random_access.is_rap() && track.seconds(next.dts) <= fragment.base_dts()
                })
            }
        } else {
            false
        };

        if !append {
            self.consecutive_skips += 1;
            return Ok(outcome);
        }

        let track = &mut movies[m].tracks[t];
        let sample = track.advance().ok_or_else(|| {
            CoreError::Scheduling(format!("track {} lost its pending sample", track.track_id))
        })?;
        if sample.index == 0 {
            outcome.sample = SampleOutcome::Dropped;
            return Ok(outcome);
        }
        let index = sample.index;
        let bytes = sample.len() as u64;
        track.set_current_summary_index(index);
        session.append(lane, sample)?;
        self.largest_dts = self.largest_dts.max(view.seconds);
        self.consecutive_skips = 0;
        self.media_size += bytes;
        outcome.sample = SampleOutcome::Appended { bytes };
        Ok(outcome)
    }

    /// Steps until every track has ended, then flushes the remaining samples.
    pub fn run(&mut self, movies: &mut [InputMovie], session: &mut OutputSession<'_>) -> CoreResult<RemuxProgress> {
        let mut progress = RemuxProgress::default();
        let mut reported = 0;
        loop {
            let outcome = self.step(movies, session)?;
            progress.record(outcome);
            if outcome.is_finished() {
                break;
            }
            if progress.total_media_size / IMPORT_REPORT_INTERVAL > reported {
                reported = progress.total_media_size / IMPORT_REPORT_INTERVAL;
                session.report_import(&progress);
            }
        }
        session.flush_remaining()?;
        debug!(
            "Appended {} samples ({} bytes), dropped {}, {} fragments",
            progress.appended_samples, progress.total_media_size, progress.dropped_samples, progress.fragments
        );
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemorySink, MemorySource, MovieManifest, SampleRecord, SinkEvent, TrackManifest};
    use crate::media::{
        FileMode, FileParams, FourCc, HandlerKind, MovieParams, RandomAccess, Summary, WriterOptions,
    };
    use crate::progress::NullProgress;
    use crate::remux::session::{OutputLayout, SessionOptions};

    /// Track with samples at the given times (in 1/1000 s), RAP flags and sizes of 100 bytes.
    fn track(id: u32, handler: HandlerKind, samples: &[(u64, bool)]) -> TrackManifest {
        let mut track = TrackManifest::new(id, handler, 1000);
        track.summaries.push(Summary::new(FourCc::new(b"test")));
        for &(dts, rap) in samples {
            let ra = if rap { RandomAccess::Sync } else { RandomAccess::None };
            track.samples.push(SampleRecord::new(dts, dts, 100, ra));
        }
        track
    }

    fn movie(tracks: Vec<TrackManifest>) -> InputMovie {
        let manifest = MovieManifest {
            file: FileParams { major_brand: FourCc::new(b"isom"), minor_version: 0, brands: vec![] },
            movie: MovieParams { timescale: 1000 },
            writer: None,
            tracks,
        };
        InputMovie::open(Box::new(MemorySource::new("sched", manifest)), None).unwrap()
    }

    fn layout(fragmented: bool) -> OutputLayout {
        OutputLayout {
            file: FileParams { major_brand: FourCc::new(b"mp42"), minor_version: 0, brands: vec![] },
            movie: MovieParams { timescale: 1000 },
            writer: WriterOptions {
                mode: FileMode { fragmented, ..FileMode::default() },
                max_chunk_duration: 0.5,
                max_chunk_size: 1 << 20,
                compact_size_table: false,
            },
        }
    }

    fn run(movies: &mut [InputMovie], options: &SessionOptions) -> (MemorySink, RemuxProgress) {
        let mut sink = MemorySink::new("sched.json", true);
        let mut reporter = NullProgress;
        let fragmented = options.fragment_base_track != 0;
        let progress = {
            let mut session =
                OutputSession::prepare(&mut sink, &mut reporter, movies, &layout(fragmented), options).unwrap();
            let mut scheduler = Scheduler::new(session.track_count());
            let progress = scheduler.run(movies, &mut session).unwrap();
            session.finish().unwrap();
            progress
        };
        (sink, progress)
    }

    fn every(step: u64, count: u64, rap_every: u64) -> Vec<(u64, bool)> {
        (0..count).map(|i| (i * step, i % rap_every == 0)).collect()
    }

    #[test]
    fn interleaves_in_dts_order() {
        let mut movies = vec![movie(vec![
            track(1, HandlerKind::Video, &every(40, 5, 1)),
            track(2, HandlerKind::Audio, &every(20, 10, 1)),
        ])];
        let (sink, progress) = run(&mut movies, &SessionOptions::unfragmented("sched.json"));
        assert_eq!(progress.appended_samples, 15);

        let mut last = [None::<u64>; 3];
        let mut largest = 0;
        for event in sink.events() {
            if let SinkEvent::Append { track_id, dts, .. } = *event {
                let slot = &mut last[track_id as usize];
                assert!(slot.is_none_or(|prev| dts > prev), "DTS must increase within a track");
                *slot = Some(dts);
                // No track runs more than one sample period ahead of the others.
                assert!(dts <= largest + 40);
                largest = largest.max(dts);
            }
        }
    }

    #[test]
    fn a_track_far_ahead_is_not_starved() {
        let mut movies = vec![movie(vec![
            track(1, HandlerKind::Video, &[(5000, true), (6000, true)]),
            track(2, HandlerKind::Audio, &every(100, 3, 1)),
        ])];
        let (_, progress) = run(&mut movies, &SessionOptions::unfragmented("sched.json"));
        assert_eq!(progress.appended_samples, 5);
    }

    #[test]
    fn samples_of_excluded_descriptions_are_dropped() {
        let mut video = track(1, HandlerKind::Video, &every(40, 4, 1));
        let mut unsupported = Summary::new(FourCc::new(b"bad!"));
        unsupported.unsupported = true;
        video.summaries.push(unsupported);
        video.samples[1].index = 2;
        video.samples[2].index = 2;
        let mut movies = vec![movie(vec![video])];
        let (sink, progress) = run(&mut movies, &SessionOptions::unfragmented("sched.json"));
        assert_eq!(progress.appended_samples, 2);
        assert_eq!(progress.dropped_samples, 2);
        let (_, manifest) = &sink.outputs()[0];
        let dts: Vec<u64> = manifest.tracks[0].samples.iter().map(|s| s.dts).collect();
        assert_eq!(dts, vec![0, 120]);
    }

    #[test]
    fn fragments_cut_on_base_track_raps_after_minimum_duration() {
        // Video RAPs at 0, 2.1 and 4.3 seconds, audio all RAPs.
        let video: Vec<(u64, bool)> = (0..60).map(|i| (i * 100, [0, 21, 43].contains(&i))).collect();
        let audio = every(50, 120, 1);
        let mut movies = vec![movie(vec![
            track(1, HandlerKind::Video, &video),
            track(2, HandlerKind::Audio, &audio),
        ])];
        let options = SessionOptions {
            fragment_base_track: 1,
            min_fragment_duration: 2.0,
            ..SessionOptions::unfragmented("sched.json")
        };
        let (sink, progress) = run(&mut movies, &options);
        assert_eq!(progress.appended_samples, 180);

        let (_, manifest) = &sink.outputs()[0];
        let first_video_dts_per_fragment: Vec<u64> = {
            let mut seen = Vec::new();
            let mut firsts = Vec::new();
            for s in &manifest.tracks[0].samples {
                if !seen.contains(&s.fragment) {
                    seen.push(s.fragment);
                    firsts.push(s.dts);
                }
            }
            firsts
        };
        assert_eq!(first_video_dts_per_fragment, vec![0, 2100, 4300]);
        assert_eq!(progress.fragments, 3);

        // Every audio fragment also starts at or after the video boundary.
        for s in &manifest.tracks[1].samples {
            let boundary = match s.fragment {
                1 => 0,
                2 => 2100,
                _ => 4300,
            };
            assert!(s.dts >= boundary, "audio sample {} leaked into fragment {}", s.dts, s.fragment);
        }
    }

    #[test]
    fn non_fragmented_runs_never_flush_fragments() {
        let mut movies = vec![movie(vec![track(1, HandlerKind::Video, &every(40, 30, 5))])];
        let (sink, progress) = run(&mut movies, &SessionOptions::unfragmented("sched.json"));
        assert_eq!(progress.fragments, 0);
        assert!(!sink.events().iter().any(|e| matches!(e, SinkEvent::Fragment { .. })));
    }

    #[test]
    fn fetch_failure_aborts_the_run() {
        let manifest = MovieManifest {
            file: FileParams { major_brand: FourCc::new(b"isom"), minor_version: 0, brands: vec![] },
            movie: MovieParams { timescale: 1000 },
            writer: None,
            tracks: vec![track(1, HandlerKind::Video, &every(40, 5, 1))],
        };
        let source = MemorySource::new("broken", manifest).with_fetch_failure(1, 3);
        let mut movies = vec![InputMovie::open(Box::new(source), None).unwrap()];
        let mut sink = MemorySink::new("sched.json", true);
        let mut reporter = NullProgress;
        let mut session = OutputSession::prepare(
            &mut sink,
            &mut reporter,
            &mut movies,
            &layout(false),
            &SessionOptions::unfragmented("sched.json"),
        )
        .unwrap();
        let err = Scheduler::new(1).run(&mut movies, &mut session).unwrap_err();
        assert!(matches!(err, CoreError::Scheduling(_)));
    }
}
