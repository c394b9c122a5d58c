// reframe-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use reframe_core::config::{DEFAULT_EDIT_TRACK, DEFAULT_MAX_CHUNK_DURATION_MS, DEFAULT_MAX_CHUNK_SIZE};
use reframe_core::timeline::Rational;
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Reframe: ISO media remuxer and timeline editor",
    long_about = "Merges tracks of several movies into one output, optionally fragmented \
                  and split into DASH segments, and re-times single tracks."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interleaves the tracks of one or more inputs into a single output
    Remux(RemuxArgs),
    /// Re-times one track and rewrites the movie around it
    Edit(EditArgs),
}

#[derive(Args, Debug)]
pub struct RemuxArgs {
    /// Input with optional per-track options, e.g. 'in.json?1:language=jpn,seek=48?2:remove'.
    /// May be given several times.
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT[?N:OPTS]")]
    pub inputs: Vec<String>,

    /// Output movie
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Fragment at the random-access points of this 1-based output track (0: no fragments)
    #[arg(long = "fragment", value_name = "TRACK", default_value_t = 0)]
    pub fragment_base_track: u32,

    /// Minimum fragment duration in seconds
    #[arg(long = "min-frag-duration", value_name = "SECS")]
    pub min_fragment_duration: Option<f64>,

    /// Write DASH segments of N sub-segments each (0: one self-contained segment)
    #[arg(long = "dash", value_name = "N")]
    pub dash_subsegments: Option<u32>,

    /// Maximum chunk duration in milliseconds
    #[arg(
        long = "chunk-duration",
        value_name = "MS",
        env = "REFRAME_MAX_CHUNK_DURATION",
        default_value_t = DEFAULT_MAX_CHUNK_DURATION_MS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_chunk_duration_ms: u32,

    /// Maximum chunk size in bytes
    #[arg(
        long = "chunk-size",
        value_name = "BYTES",
        env = "REFRAME_MAX_CHUNK_SIZE",
        default_value_t = DEFAULT_MAX_CHUNK_SIZE,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub max_chunk_size: u64,

    /// Use the compact sample size table
    #[arg(long)]
    pub compact_size_table: bool,

    /// ISO 639-2 language for tracks without their own
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Run every step but write no files
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Input movie
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT")]
    pub input: PathBuf,

    /// Output movie
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT")]
    pub output: PathBuf,

    /// 1-based number of the track to re-time
    #[arg(long = "track", value_name = "N", default_value_t = DEFAULT_EDIT_TRACK,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub track_number: u32,

    /// Timecode file (format v1 or v2)
    #[arg(long, value_name = "FILE")]
    pub timecode: Option<PathBuf>,

    /// Output media timescale (disables DTS compression)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub media_timescale: Option<u32>,

    /// Output media timebase
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub media_timebase: Option<u32>,

    /// Seconds trimmed from the start of presentation, as 'n' or 'n/d'
    #[arg(long, value_name = "SECS")]
    pub skip: Option<Rational>,

    /// Seconds of empty presentation before the media, as 'n' or 'n/d'
    #[arg(long, value_name = "SECS")]
    pub delay: Option<Rational>,

    /// Keep the first DTS values small by raising the timescale
    #[arg(long)]
    pub dts_compression: bool,
}
