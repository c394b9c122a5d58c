//! Samples and the timing records the track model moves around.

use serde::{Deserialize, Serialize};

/// Random-access property of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RandomAccess {
    #[default]
    None,
    /// Sync sample.
    Sync,
    ClosedRap,
    /// Followed by leading samples that may be undecodable.
    OpenRap,
    PostRoll,
    PreRoll,
}

impl RandomAccess {
    pub fn is_rap(self) -> bool {
        self != RandomAccess::None
    }
}

/// One decodable unit fetched from a source.
///
/// A sample is owned by whoever fetched it last and is consumed by being
/// appended to an output track or dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub dts: u64,
    pub cts: u64,
    /// 1-based sample description index. 0 after remapping means "drop".
    pub index: u32,
    pub random_access: RandomAccess,
    pub data: Vec<u8>,
}

impl Sample {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_rap(&self) -> bool {
        self.random_access.is_rap()
    }
}

/// Sample metadata without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    pub dts: u64,
    pub cts: u64,
    pub length: u32,
    pub index: u32,
    pub random_access: RandomAccess,
}

impl SampleInfo {
    pub fn is_rap(&self) -> bool {
        self.random_access.is_rap()
    }
}

/// Decode/composition pair for one sample, in media timescale ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTimestamp {
    pub dts: u64,
    pub cts: u64,
}

impl MediaTimestamp {
    pub fn new(dts: u64, cts: u64) -> Self {
        Self { dts, cts }
    }
}
