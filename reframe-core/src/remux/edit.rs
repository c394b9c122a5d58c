// ============================================================================
// reframe-core/src/remux/edit.rs
// ============================================================================
//
// TIMELINE EDIT: Re-time one track and rewrite the movie around it
//
// The edited track gets new timestamps, a new media timescale and a fresh
// edit list. Every other track is copied unchanged with its edit list. The
// output is always a plain, non-fragmented movie.

use log::info;

use crate::config::{DEFAULT_MAX_CHUNK_DURATION_MS, DEFAULT_MAX_CHUNK_SIZE, TimelineEditConfig};
use crate::engine::{MediaSink, MediaSource, MemorySink, MemorySource};
use crate::error::{CoreError, CoreResult};
use crate::media::{Edit, FileMode, InputMovie, MovieParams, WriterOptions};
use crate::progress::{ProgressReporter, RemuxProgress};
use crate::timeline::editor::apply;
use crate::timeline::{TimecodeFile, edit_list, retime};

use super::brand::edited_file_params;
use super::scheduler::Scheduler;
use super::session::{OutputLayout, OutputSession, SessionOptions};

/// Outcome of a timeline edit.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEditReport {
    pub track_id: u32,
    pub media_timescale: u32,
    /// Timescale of the edit durations.
    pub movie_timescale: u32,
    /// Largest number of samples presented ahead of their decode position.
    pub sample_delay: u32,
    pub edits: Vec<Edit>,
    pub progress: RemuxProgress,
}

/// Edits the manifest at `config.input` and writes `config.output`.
pub fn edit_timeline(config: &TimelineEditConfig, reporter: &mut dyn ProgressReporter) -> CoreResult<TimelineEditReport> {
    let source = MemorySource::open(&config.input)?;
    let mut sink = MemorySink::new(&config.output, false);
    edit_source(config, Box::new(source), &mut sink, reporter)
}

/// Edits an opened source into `sink`. On error, everything the sink wrote is discarded.
pub fn edit_source(
    config: &TimelineEditConfig,
    source: Box<dyn MediaSource>,
    sink: &mut dyn MediaSink,
    reporter: &mut dyn ProgressReporter,
) -> CoreResult<TimelineEditReport> {
    let result = edit_inner(config, source, sink, reporter);
    if result.is_err() {
        sink.discard();
    }
    result
}

fn edit_inner(
    config: &TimelineEditConfig,
    mut source: Box<dyn MediaSource>,
    sink: &mut dyn MediaSink,
    reporter: &mut dyn ProgressReporter,
) -> CoreResult<TimelineEditReport> {
    let track_ids = source.track_ids();
    let track_id = config
        .track_number
        .checked_sub(1)
        .and_then(|i| track_ids.get(i as usize).copied())
        .ok_or_else(|| {
            CoreError::Configuration(format!(
                "{}: track {} requested but the input has {} tracks",
                source.name(),
                config.track_number,
                track_ids.len()
            ))
        })?;

    let timecode = config.timecode.as_deref().map(TimecodeFile::load).transpose()?;
    let timestamps = source.timestamps(track_id)?;
    let native_timescale = source.media_params(track_id)?.timescale;
    let retimed = retime(&timestamps, native_timescale, config, timecode.as_ref())?;
    apply(source.as_mut(), track_id, &retimed)?;

    let mut movie = InputMovie::open(source, config.input.parent())?;
    let position = movie
        .tracks
        .iter()
        .position(|t| t.track_id == track_id)
        .ok_or_else(|| CoreError::SourceRead(format!("track {} disappeared", track_id)))?;
    movie.tracks[position].last_sample_delta = retimed.last_sample_delta.min(u32::MAX as u64) as u32;
    for track in &mut movie.tracks {
        track.keep_source_timestamps();
    }

    // A lone track lends its original media timescale to the movie.
    let movie_params = match track_ids.len() {
        1 => MovieParams { timescale: native_timescale },
        _ => movie.movie_params,
    };
    let layout = OutputLayout {
        file: edited_file_params(&movie.file_params),
        movie: movie_params,
        writer: WriterOptions {
            mode: FileMode::default(),
            max_chunk_duration: DEFAULT_MAX_CHUNK_DURATION_MS as f64 * 1e-3,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            compact_size_table: false,
        },
    };
    let movie_timescale = layout.movie.timescale;
    let mut movies = vec![movie];
    let mut session = OutputSession::prepare(
        sink,
        reporter,
        &mut movies,
        &layout,
        &SessionOptions::unfragmented(config.output.clone()),
    )?;
    let lane = session
        .tracks()
        .iter()
        .position(|t| t.track == position)
        .ok_or_else(|| {
            CoreError::Configuration(format!("track {} cannot be written to the output", config.track_number))
        })?;

    let progress = Scheduler::new(session.track_count()).run(&mut movies, &mut session)?;
    session.construct_timeline_maps(&movies)?;
    let edits = edit_list(&retimed, config, movie_timescale);
    session.replace_timeline(lane, &edits)?;
    session.finish()?;

    info!(
        "Track {} now has timescale {} and {} edits",
        config.track_number,
        retimed.timescale,
        edits.len()
    );
    Ok(TimelineEditReport {
        track_id,
        media_timescale: retimed.timescale,
        movie_timescale,
        sample_delay: retimed.sample_delay,
        edits,
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineEditConfigBuilder;
    use crate::engine::{MovieManifest, SampleRecord, TrackManifest};
    use crate::media::{FileParams, FourCc, HandlerKind, MovieParams, RandomAccess, Summary};
    use crate::progress::NullProgress;
    use crate::timeline::Rational;

    /// Video at 24000/1001 fps in a 90 kHz timescale plus 10 audio frames.
    fn source() -> MemorySource {
        let mut video = TrackManifest::new(1, HandlerKind::Video, 90000);
        video.summaries.push(Summary::new(FourCc::new(b"avc1")));
        for i in 0..4u64 {
            video.samples.push(SampleRecord::new(i * 3754, i * 3754, 500, RandomAccess::Sync));
        }
        let mut audio = TrackManifest::new(2, HandlerKind::Audio, 48000);
        audio.summaries.push(Summary::new(FourCc::new(b"mp4a")));
        audio.edits.push(Edit::normal(4000, 0));
        for i in 0..10u64 {
            audio.samples.push(SampleRecord::new(i * 1024, i * 1024, 50, RandomAccess::Sync));
        }
        MemorySource::new(
            "edit",
            MovieManifest {
                file: FileParams { major_brand: FourCc::new(b"f4v "), minor_version: 0, brands: vec![] },
                movie: MovieParams { timescale: 1000 },
                writer: None,
                tracks: vec![video, audio],
            },
        )
    }

    fn config() -> TimelineEditConfigBuilder {
        TimelineEditConfigBuilder::new().input("in.json").output("out.json")
    }

    fn edit(config: &TimelineEditConfig) -> (MemorySink, TimelineEditReport) {
        let mut sink = MemorySink::new("out.json", true);
        let report = edit_source(config, Box::new(source()), &mut sink, &mut NullProgress).unwrap();
        (sink, report)
    }

    #[test]
    fn edited_track_is_rewritten_and_others_copied() {
        let config = config().media_timescale(24000).media_timebase(1001).build().unwrap();
        let (sink, report) = edit(&config);
        assert_eq!(report.media_timescale, 24000);
        assert_eq!(report.progress.appended_samples, 14);

        let (_, manifest) = &sink.outputs()[0];
        assert_eq!(manifest.file.major_brand, FourCc::new(b"mp42"));
        let video = &manifest.tracks[0];
        assert_eq!(video.timescale, 24000);
        let dts: Vec<u64> = video.samples.iter().map(|s| s.dts).collect();
        assert_eq!(dts, vec![0, 1001, 2002, 3003]);
        assert_eq!(video.edits, report.edits);

        let audio = &manifest.tracks[1];
        assert_eq!(audio.timescale, 48000);
        assert_eq!(audio.samples.len(), 10);
        assert_eq!(audio.edits, vec![Edit::normal(4000, 0)]);
    }

    #[test]
    fn delay_adds_an_empty_edit() {
        let config = config()
            .media_timescale(24000)
            .media_timebase(1001)
            .delay(Rational::new(1, 2).unwrap())
            .build()
            .unwrap();
        let (_, report) = edit(&config);
        // 4 frames of 1001 ticks + 12000 ticks of delay, in a 1000 Hz movie timescale.
        assert_eq!(report.edits, vec![Edit::empty(500), Edit::normal(167, 0)]);
    }

    #[test]
    fn unknown_track_is_a_configuration_error() {
        let config = config().track_number(3).build().unwrap();
        let mut sink = MemorySink::new("out.json", true);
        let err = edit_source(&config, Box::new(source()), &mut sink, &mut NullProgress).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }
}
