//! JSON layout manifest.
//!
//! A manifest describes one movie: its brands, movie timescale, and for each
//! track the parameters, sample descriptions, edit list and sample table.
//! Sample payloads are optional; when absent the payload is a zero-filled
//! buffer of the recorded size.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::media::{
    DataReference, Edit, FileParams, HandlerKind, MovieParams, RandomAccess, Summary, WriterOptions,
};

fn default_index() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieManifest {
    pub file: FileParams,
    pub movie: MovieParams,
    /// Present on written outputs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<WriterOptions>,
    pub tracks: Vec<TrackManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackManifest {
    pub track_id: u32,
    pub handler: HandlerKind,
    pub timescale: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub alternate_group: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_name: Option<String>,
    pub summaries: Vec<Summary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_references: Vec<DataReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<Edit>,
    /// Duration of the final sample. Derived from the last two DTS when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sample_delta: Option<u32>,
    pub samples: Vec<SampleRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub dts: u64,
    pub cts: u64,
    pub size: u32,
    #[serde(default = "default_index")]
    pub index: u32,
    #[serde(default)]
    pub random_access: RandomAccess,
    /// 1-based movie fragment sequence number, 0 when not fragmented.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub fragment: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl MovieManifest {
    pub fn from_json(text: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a manifest file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            CoreError::SourceRead(format!("failed to open {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            CoreError::SourceRead(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> CoreResult<u64> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, &text).map_err(|e| {
            CoreError::ContainerWrite(format!("failed to write {}: {}", path.display(), e))
        })?;
        Ok(text.len() as u64)
    }

    pub fn track(&self, track_id: u32) -> Option<&TrackManifest> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }
}

impl SampleRecord {
    /// Sample using the first description, outside any fragment, with no stored payload.
    pub fn new(dts: u64, cts: u64, size: u32, random_access: RandomAccess) -> Self {
        Self { dts, cts, size, index: 1, random_access, fragment: 0, data: Vec::new() }
    }
}

impl TrackManifest {
    /// Track with no samples.
    pub fn new(track_id: u32, handler: HandlerKind, timescale: u32) -> Self {
        Self {
            track_id,
            handler,
            timescale,
            enabled: true,
            alternate_group: 0,
            language: None,
            handler_name: None,
            summaries: Vec::new(),
            data_references: Vec::new(),
            edits: Vec::new(),
            last_sample_delta: None,
            samples: Vec::new(),
        }
    }

    pub fn effective_last_sample_delta(&self) -> u32 {
        if let Some(delta) = self.last_sample_delta {
            return delta;
        }
        match self.samples.as_slice() {
            [.., a, b] => b.dts.saturating_sub(a.dts).min(u32::MAX as u64) as u32,
            _ => 0,
        }
    }
}
