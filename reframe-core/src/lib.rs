//! Core library for remuxing and re-timing ISO base media movies.
//!
//! This crate merges the tracks of several input movies into one output,
//! interleaving samples by decode time, optionally cutting movie fragments
//! at random-access points and splitting them into segment files. It also
//! re-times a single track (new timescale, optional timecode file, B-frame
//! aware DTS generation) and rewrites the movie around it.
//!
//! Containers are reached through the `MediaSource`/`MediaSink` traits. The
//! bundled engine reads and writes JSON layout manifests.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use reframe_core::config::{InputSpec, RemuxConfigBuilder};
//! use reframe_core::progress::NullProgress;
//!
//! let config = RemuxConfigBuilder::new()
//!     .input(InputSpec::new("video.json"))
//!     .input(InputSpec::new("audio.json"))
//!     .output("movie.json")
//!     .fragment_base_track(1)
//!     .min_fragment_duration(2.0)
//!     .build()
//!     .unwrap();
//!
//! let report = reframe_core::remux_files(config, &mut NullProgress).unwrap();
//! println!("{} samples written", report.progress.appended_samples);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod media;
pub mod progress;
pub mod remux;
pub mod timeline;
pub mod utils;

// Re-exports for public API
pub use config::{RemuxConfig, TimelineEditConfig};
pub use error::{CoreError, CoreResult};
pub use progress::{NullProgress, ProgressReporter, RemuxProgress};
pub use remux::{RemuxReport, Remuxer, TimelineEditReport, edit_timeline, remux_files};
pub use utils::{format_bytes, format_duration, format_ticks};
