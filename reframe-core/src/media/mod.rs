//! Track model: samples, parameter blocks, input/output tracks and movies.

mod movie;
mod params;
mod sample;
mod track;

pub use movie::InputMovie;
pub use params::{
    DataReference, Edit, EditStart, FileMode, FileParams, FourCc, HandlerKind, MediaParams,
    MovieParams, SegmentParams, Summary, TrackParams, WriterOptions,
};
pub use sample::{MediaTimestamp, RandomAccess, Sample, SampleInfo};
pub use track::{InputSummary, InputTrack, OutputTrack, Peek};
