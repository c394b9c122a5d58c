// ============================================================================
// reframe-core/src/media/params.rs
// ============================================================================
//
// PARAMETER BLOCKS: File, movie, track and media level settings
//
// These are the parameter sets exchanged with the container engine. They are
// plain data and serialize directly into the layout manifest.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Four-character code used for brands and sample entry types.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({})", self)
    }
}

impl FromStr for FourCc {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s.as_bytes().try_into().map_err(|_| {
            CoreError::Configuration(format!("'{}' is not a four-character code", s))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for FourCc {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FourCc> for String {
    fn from(code: FourCc) -> Self {
        code.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Video,
    Audio,
    Text,
    Hint,
    Other,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerKind::Video => "video",
            HandlerKind::Audio => "audio",
            HandlerKind::Text => "text",
            HandlerKind::Hint => "hint",
            HandlerKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// File-type parameters: the brands a file declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileParams {
    pub major_brand: FourCc,
    #[serde(default)]
    pub minor_version: u32,
    #[serde(default)]
    pub brands: Vec<FourCc>,
}

/// How an output file is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMode {
    pub fragmented: bool,
    /// Carries a segment index.
    pub index: bool,
    /// Carries media data.
    pub media: bool,
    /// Part of a segmented presentation.
    pub segment: bool,
    /// Carries the movie header needed to initialize decoding.
    pub initialization: bool,
}

impl Default for FileMode {
    fn default() -> Self {
        Self {
            fragmented: false,
            index: false,
            media: true,
            segment: false,
            initialization: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieParams {
    pub timescale: u32,
}

/// Writer settings that do not belong to any box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterOptions {
    pub mode: FileMode,
    /// Seconds.
    pub max_chunk_duration: f64,
    pub max_chunk_size: u64,
    pub compact_size_table: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackParams {
    pub enabled: bool,
    pub alternate_group: u16,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self { enabled: true, alternate_group: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaParams {
    pub timescale: u32,
    pub handler: HandlerKind,
    /// ISO 639-2/T code.
    pub language: Option<String>,
    pub handler_name: Option<String>,
}

/// A sample description. The engine owns its binary form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub sample_type: FourCc,
    /// Set by the engine when it cannot remux this codec.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unsupported: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codec_private: Vec<u8>,
}

impl Summary {
    pub fn new(sample_type: FourCc) -> Self {
        Self { sample_type, unsupported: false, codec_private: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataReference {
    pub index: u32,
    /// `None` means the media lives in the same file.
    #[serde(default)]
    pub location: Option<PathBuf>,
}

/// Where an edit starts in media time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditStart {
    /// Presentation gap.
    Empty,
    Media(u64),
}

/// One edit list entry. `duration` is in movie timescale ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub duration: u64,
    pub start: EditStart,
    /// 16.16 fixed point.
    pub rate: u32,
}

impl Edit {
    pub const NORMAL_RATE: u32 = 0x0001_0000;
    /// Duration placeholder resolved by the writer from the fragments.
    pub const IMPLICIT_DURATION: u64 = 0;

    pub fn empty(duration: u64) -> Self {
        Self { duration, start: EditStart::Empty, rate: Self::NORMAL_RATE }
    }

    pub fn normal(duration: u64, start_time: u64) -> Self {
        Self { duration, start: EditStart::Media(start_time), rate: Self::NORMAL_RATE }
    }
}

/// Parameters of a newly opened segment file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentParams {
    pub file: FileParams,
    pub mode: FileMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_round_trips_through_strings() {
        let code: FourCc = "avc1".parse().unwrap();
        assert_eq!(code, FourCc::new(b"avc1"));
        assert_eq!(code.to_string(), "avc1");
        assert!("avc".parse::<FourCc>().is_err());

        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"avc1\"");
    }

    #[test]
    fn default_file_mode_is_a_plain_movie() {
        let mode = FileMode::default();
        assert!(mode.media && mode.initialization);
        assert!(!mode.fragmented && !mode.segment && !mode.index);
    }
}
