// ============================================================================
// reframe-core/src/remux/mod.rs
// ============================================================================
//
// REMUX: Merging input movies into one output
//
// A run goes through these phases:
//
// 1. Open every input and apply the per-track options.
// 2. Derive the output layout: brands, movie timescale, file mode.
// 3. Prepare the output session (one output track per active input track).
// 4. Write the timeline maps up front when fragmenting.
// 5. Interleave samples until every track ends.
// 6. Write the timeline maps afterwards when not fragmenting, then finish.
//
// Any error after the sink was touched discards what it wrote.

pub mod brand;
pub mod edit;
pub mod fragment;
pub mod scheduler;
pub mod seek;
pub mod segment;
pub mod session;
pub mod timeline_map;

use log::info;

use crate::config::{DEFAULT_MOVIE_TIMESCALE, RemuxConfig};
use crate::engine::{MediaSink, MemorySink, MemorySource};
use crate::error::{CoreError, CoreResult};
use crate::media::{FileMode, InputMovie, MovieParams, WriterOptions};
use crate::progress::{ProgressReporter, RemuxProgress};
use crate::utils::format_bytes;

pub use brand::{BrandPolicy, edited_file_params, output_file_params};
pub use edit::{TimelineEditReport, edit_source, edit_timeline};
pub use fragment::FragmentState;
pub use scheduler::Scheduler;
pub use seek::set_starting_point;
pub use segment::{SegmentState, SegmentSwitch, segment_path};
pub use session::{OutputLayout, OutputSession, SessionOptions};

/// Totals of a finished remux.
#[derive(Debug, Clone, PartialEq)]
pub struct RemuxReport {
    pub progress: RemuxProgress,
    pub output_tracks: usize,
    pub layout: OutputLayout,
}

/// A remux run over already opened inputs.
#[derive(Debug)]
pub struct Remuxer {
    config: RemuxConfig,
    movies: Vec<InputMovie>,
}

impl Remuxer {
    /// Binds opened inputs to the configuration and applies track options.
    ///
    /// `movies` must be in the same order as `config.inputs`.
    pub fn new(config: RemuxConfig, mut movies: Vec<InputMovie>) -> CoreResult<Self> {
        if movies.len() != config.inputs.len() {
            return Err(CoreError::Configuration(format!(
                "{} inputs configured but {} opened",
                config.inputs.len(),
                movies.len()
            )));
        }
        for (movie, spec) in movies.iter_mut().zip(&config.inputs) {
            movie.apply_options(spec, config.default_language.as_deref())?;
        }
        Ok(Self { config, movies })
    }

    /// Opens every configured input as a layout manifest.
    pub fn open(config: RemuxConfig) -> CoreResult<Self> {
        let movies = config
            .inputs
            .iter()
            .map(|spec| {
                let source = MemorySource::open(&spec.path)?;
                InputMovie::open(Box::new(source), spec.path.parent())
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Self::new(config, movies)
    }

    /// Brands, movie timescale and file mode of the output.
    pub fn layout(&self) -> OutputLayout {
        let fragmented = self.config.is_fragmented();
        let dash = self.config.is_dash();
        let subsegments = self.config.subsegments_per_segment();
        let self_contained = dash && subsegments == 0;

        let active: Vec<_> = self.movies.iter().flat_map(|m| m.tracks.iter()).filter(|t| t.active).collect();
        let policy = BrandPolicy::for_tracks(
            fragmented,
            dash,
            active.iter().map(|t| (t.media_params.handler, t.summaries.len())),
        );
        let inputs: Vec<_> = self.movies.iter().map(|m| m.file_params.clone()).collect();
        let file = output_file_params(&inputs, policy, self_contained);

        let timescale = match active.as_slice() {
            [only] => only.media_params.timescale,
            _ => DEFAULT_MOVIE_TIMESCALE,
        };
        let mode = FileMode {
            fragmented,
            index: self_contained,
            media: !(dash && subsegments > 0),
            segment: dash,
            initialization: true,
        };
        OutputLayout {
            file,
            movie: MovieParams { timescale },
            writer: WriterOptions {
                mode,
                max_chunk_duration: self.config.max_chunk_duration_ms as f64 * 1e-3,
                max_chunk_size: self.config.max_chunk_size,
                compact_size_table: self.config.compact_size_table,
            },
        }
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            output: self.config.output.clone(),
            fragment_base_track: self.config.fragment_base_track,
            min_fragment_duration: self.config.min_fragment_duration,
            subsegments_per_segment: self.config.subsegments_per_segment(),
        }
    }

    /// Writes the output into `sink`. On error, everything the sink wrote is discarded.
    pub fn run(&mut self, sink: &mut dyn MediaSink, reporter: &mut dyn ProgressReporter) -> CoreResult<RemuxReport> {
        let result = self.run_inner(sink, reporter);
        if result.is_err() {
            sink.discard();
        }
        result
    }

    fn run_inner(&mut self, sink: &mut dyn MediaSink, reporter: &mut dyn ProgressReporter) -> CoreResult<RemuxReport> {
        let layout = self.layout();
        info!(
            "Output brand {} (minor version {}), movie timescale {}",
            layout.file.major_brand, layout.file.minor_version, layout.movie.timescale
        );
        let options = self.session_options();
        let mut session = OutputSession::prepare(sink, reporter, &mut self.movies, &layout, &options)?;
        let fragmented = session.fragment().is_enabled();
        if fragmented {
            session.construct_timeline_maps(&self.movies)?;
        }

        let mut scheduler = Scheduler::new(session.track_count());
        let progress = scheduler.run(&mut self.movies, &mut session)?;
        if !fragmented {
            session.construct_timeline_maps(&self.movies)?;
        }
        let output_tracks = session.track_count();
        session.finish()?;

        info!(
            "Remuxed {} samples ({}) into {} tracks",
            progress.appended_samples,
            format_bytes(progress.total_media_size),
            output_tracks
        );
        Ok(RemuxReport { progress, output_tracks, layout })
    }
}

/// Remuxes the configured manifest inputs into `config.output`.
pub fn remux_files(config: RemuxConfig, reporter: &mut dyn ProgressReporter) -> CoreResult<RemuxReport> {
    let mut sink = MemorySink::new(config.output.clone(), config.dry_run);
    let mut remuxer = Remuxer::open(config)?;
    remuxer.run(&mut sink, reporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InputSpec, RemuxConfigBuilder};
    use crate::engine::{MovieManifest, SampleRecord, TrackManifest};
    use crate::media::{FileParams, FourCc, HandlerKind, RandomAccess, Summary};

    fn movie(handlers: &[(HandlerKind, u32)]) -> InputMovie {
        let tracks = handlers
            .iter()
            .enumerate()
            .map(|(i, &(handler, timescale))| {
                let mut track = TrackManifest::new(i as u32 + 1, handler, timescale);
                track.summaries.push(Summary::new(FourCc::new(b"test")));
                track.samples.push(SampleRecord::new(0, 0, 4, RandomAccess::Sync));
                track
            })
            .collect();
        let manifest = MovieManifest {
            file: FileParams { major_brand: FourCc::new(b"isom"), minor_version: 0, brands: vec![] },
            movie: MovieParams { timescale: 1000 },
            writer: None,
            tracks,
        };
        InputMovie::open(Box::new(MemorySource::new("layout", manifest)), None).unwrap()
    }

    fn config(inputs: usize) -> RemuxConfigBuilder {
        RemuxConfigBuilder::new()
            .inputs((0..inputs).map(|i| InputSpec::new(format!("in{}.json", i))))
            .output("out.json")
    }

    #[test]
    fn single_track_output_uses_its_media_timescale() {
        let remuxer =
            Remuxer::new(config(1).build().unwrap(), vec![movie(&[(HandlerKind::Audio, 48000)])]).unwrap();
        assert_eq!(remuxer.layout().movie.timescale, 48000);

        let remuxer = Remuxer::new(
            config(1).build().unwrap(),
            vec![movie(&[(HandlerKind::Video, 24000), (HandlerKind::Audio, 48000)])],
        )
        .unwrap();
        assert_eq!(remuxer.layout().movie.timescale, DEFAULT_MOVIE_TIMESCALE);
    }

    #[test]
    fn segmented_dash_output_carries_no_media_in_the_initialization_file() {
        let config = config(1).fragment_base_track(1).dash_subsegments(3).build().unwrap();
        let remuxer = Remuxer::new(config, vec![movie(&[(HandlerKind::Video, 24000)])]).unwrap();
        let mode = remuxer.layout().writer.mode;
        assert!(mode.fragmented && mode.segment && !mode.media && !mode.index);
    }

    #[test]
    fn self_contained_dash_output_is_indexed() {
        let config = config(1).fragment_base_track(1).dash_subsegments(0).build().unwrap();
        let remuxer = Remuxer::new(config, vec![movie(&[(HandlerKind::Video, 24000)])]).unwrap();
        let layout = remuxer.layout();
        assert!(layout.writer.mode.index && layout.writer.mode.media);
        assert_eq!(layout.file.major_brand, brand::DASH);
    }

    #[test]
    fn input_count_must_match() {
        let err = Remuxer::new(config(2).build().unwrap(), vec![movie(&[(HandlerKind::Video, 1000)])])
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }
}
