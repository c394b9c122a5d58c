//! Configuration structures and constants for the reframe-core library.
//!
//! `RemuxConfig` drives a remux run (inputs, fragmentation, segmentation,
//! chunking). `TimelineEditConfig` drives a timeline edit of a single track.
//! Both are normally created through their builders, which validate
//! cross-field rules.

mod builder;
mod input;

use std::path::PathBuf;

pub use builder::{RemuxConfigBuilder, TimelineEditConfigBuilder};
pub use input::{InputSpec, TrackOptions, parse_language};

use crate::timeline::Rational;

// Default constants

/// Maximum duration of one chunk of interleaved samples, in milliseconds.
pub const DEFAULT_MAX_CHUNK_DURATION_MS: u32 = 500;

/// Maximum size of one chunk of interleaved samples, in bytes.
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Movie timescale of outputs with more than one track.
pub const DEFAULT_MOVIE_TIMESCALE: u32 = 600;

/// Fragment base track value meaning "do not fragment".
pub const NO_FRAGMENTATION: u32 = 0;

/// Track edited when none is named.
pub const DEFAULT_EDIT_TRACK: u32 = 1;

/// Settings for one remux run.
///
/// # Examples
///
/// ```rust
/// use reframe_core::config::{InputSpec, RemuxConfigBuilder};
///
/// let config = RemuxConfigBuilder::new()
///     .input(InputSpec::new("video.json"))
///     .input("audio.json?1:language=jpn".parse().unwrap())
///     .output("out.json")
///     .fragment_base_track(1)
///     .min_fragment_duration(2.0)
///     .build()
///     .unwrap();
/// assert!(config.is_fragmented());
/// ```
#[derive(Debug, Clone)]
pub struct RemuxConfig {
    pub inputs: Vec<InputSpec>,
    pub output: PathBuf,

    /// Language applied to every track that does not set its own.
    pub default_language: Option<String>,

    /// 1-based output track whose random-access points cut fragments. 0 disables fragmentation.
    pub fragment_base_track: u32,

    /// Minimum fragment duration in seconds. 0 means unconstrained.
    pub min_fragment_duration: f64,

    /// DASH sub-segments per segment. `Some(0)` writes one self-contained segment.
    pub dash_subsegments: Option<u32>,

    pub max_chunk_duration_ms: u32,
    pub max_chunk_size: u64,
    pub compact_size_table: bool,

    /// Run everything but write nothing.
    pub dry_run: bool,
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::new(),
            default_language: None,
            fragment_base_track: NO_FRAGMENTATION,
            min_fragment_duration: 0.0,
            dash_subsegments: None,
            max_chunk_duration_ms: DEFAULT_MAX_CHUNK_DURATION_MS,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            compact_size_table: false,
            dry_run: false,
        }
    }
}

impl RemuxConfig {
    pub fn is_fragmented(&self) -> bool {
        self.fragment_base_track != NO_FRAGMENTATION
    }

    pub fn is_dash(&self) -> bool {
        self.is_fragmented() && self.dash_subsegments.is_some()
    }

    /// Fragments per segment file. 0 when segments are not split into files.
    pub fn subsegments_per_segment(&self) -> u32 {
        if self.is_fragmented() { self.dash_subsegments.unwrap_or(0) } else { 0 }
    }
}

/// Settings for re-timing one track.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEditConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// 1-based track number in the input.
    pub track_number: u32,
    pub timecode: Option<PathBuf>,
    /// Explicit output media timescale. Disables DTS compression.
    pub media_timescale: Option<u32>,
    pub media_timebase: Option<u32>,
    /// Seconds of media trimmed from the start of presentation.
    pub skip: Rational,
    /// Seconds of empty presentation inserted before the media.
    pub delay: Rational,
    pub dts_compression: bool,
}

impl Default for TimelineEditConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            track_number: DEFAULT_EDIT_TRACK,
            timecode: None,
            media_timescale: None,
            media_timebase: None,
            skip: Rational::ZERO,
            delay: Rational::ZERO,
            dts_compression: false,
        }
    }
}

impl TimelineEditConfig {
    /// DTS compression is only honored without a pinned timescale.
    pub fn effective_dts_compression(&self) -> bool {
        self.dts_compression && self.media_timescale.is_none()
    }
}
