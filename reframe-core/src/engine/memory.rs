// ============================================================================
// reframe-core/src/engine/memory.rs
// ============================================================================
//
// MANIFEST ENGINE: In-memory source and sink backed by layout manifests
//
// MemorySource serves samples from a parsed MovieManifest. MemorySink builds
// one manifest per output file (or per segment), records every call it
// receives as a SinkEvent, and writes the manifests to disk unless it runs
// in dry-run mode.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::manifest::{MovieManifest, SampleRecord, TrackManifest};
use super::{MediaSink, MediaSource};
use crate::error::{CoreError, CoreResult};
use crate::media::{
    DataReference, Edit, FileMode, FileParams, FourCc, HandlerKind, MediaParams, MediaTimestamp,
    MovieParams, Sample, SampleInfo, SegmentParams, Summary, TrackParams, WriterOptions,
};
use crate::progress::ProgressReporter;

// ============================================================================
// SOURCE
// ============================================================================

/// Read-only access to a movie described by a manifest.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    manifest: MovieManifest,
    fetch_failures: Vec<(u32, u32)>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, manifest: MovieManifest) -> Self {
        Self { name: name.into(), manifest, fetch_failures: Vec::new() }
    }

    /// Loads a manifest file.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let manifest = MovieManifest::load(path)?;
        Ok(Self::new(path.display().to_string(), manifest))
    }

    /// Makes fetching a given sample fail while it still reports as present.
    pub fn with_fetch_failure(mut self, track_id: u32, number: u32) -> Self {
        self.fetch_failures.push((track_id, number));
        self
    }

    pub fn manifest(&self) -> &MovieManifest {
        &self.manifest
    }

    fn track(&self, track_id: u32) -> CoreResult<&TrackManifest> {
        self.manifest.track(track_id).ok_or_else(|| {
            CoreError::SourceRead(format!("{}: no track with ID {}", self.name, track_id))
        })
    }

    fn track_mut(&mut self, track_id: u32) -> CoreResult<&mut TrackManifest> {
        let name = &self.name;
        self.manifest
            .tracks
            .iter_mut()
            .find(|t| t.track_id == track_id)
            .ok_or_else(|| CoreError::SourceRead(format!("{}: no track with ID {}", name, track_id)))
    }

    fn record(&self, track_id: u32, number: u32) -> Option<&SampleRecord> {
        let index = number.checked_sub(1)? as usize;
        self.manifest.track(track_id)?.samples.get(index)
    }
}

impl MediaSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn file_params(&self) -> FileParams {
        self.manifest.file.clone()
    }

    fn movie_params(&self) -> MovieParams {
        self.manifest.movie
    }

    fn track_ids(&self) -> Vec<u32> {
        self.manifest.tracks.iter().map(|t| t.track_id).collect()
    }

    fn track_params(&self, track_id: u32) -> CoreResult<TrackParams> {
        let track = self.track(track_id)?;
        Ok(TrackParams { enabled: track.enabled, alternate_group: track.alternate_group })
    }

    fn media_params(&self, track_id: u32) -> CoreResult<MediaParams> {
        let track = self.track(track_id)?;
        Ok(MediaParams {
            timescale: track.timescale,
            handler: track.handler,
            language: track.language.clone(),
            handler_name: track.handler_name.clone(),
        })
    }

    fn summaries(&self, track_id: u32) -> CoreResult<Vec<Summary>> {
        Ok(self.track(track_id)?.summaries.clone())
    }

    fn data_references(&self, track_id: u32) -> CoreResult<Vec<DataReference>> {
        Ok(self.track(track_id)?.data_references.clone())
    }

    fn attach_data_reference(&mut self, track_id: u32, index: u32, location: &Path) -> CoreResult<()> {
        if !location.is_file() {
            return Err(CoreError::SourceRead(format!(
                "data reference {} points at missing file {}",
                index,
                location.display()
            )));
        }
        let track = self.track_mut(track_id)?;
        let reference = track
            .data_references
            .iter_mut()
            .find(|r| r.index == index)
            .ok_or_else(|| CoreError::SourceRead(format!("no data reference {}", index)))?;
        reference.location = Some(location.to_path_buf());
        Ok(())
    }

    fn last_sample_delta(&self, track_id: u32) -> CoreResult<u32> {
        Ok(self.track(track_id)?.effective_last_sample_delta())
    }

    fn edits(&self, track_id: u32) -> CoreResult<Vec<Edit>> {
        Ok(self.track(track_id)?.edits.clone())
    }

    fn composition_to_decode_shift(&self, track_id: u32) -> CoreResult<u32> {
        let shift = self
            .track(track_id)?
            .samples
            .iter()
            .map(|s| s.dts.saturating_sub(s.cts))
            .max()
            .unwrap_or(0);
        Ok(shift.min(u32::MAX as u64) as u32)
    }

    fn fetch_sample(&self, track_id: u32, number: u32) -> Option<Sample> {
        if self.fetch_failures.contains(&(track_id, number)) {
            return None;
        }
        let record = self.record(track_id, number)?;
        let data = if record.data.is_empty() {
            vec![0; record.size as usize]
        } else {
            record.data.clone()
        };
        Some(Sample {
            dts: record.dts,
            cts: record.cts,
            index: record.index,
            random_access: record.random_access,
            data,
        })
    }

    fn sample_info(&self, track_id: u32, number: u32) -> Option<SampleInfo> {
        self.record(track_id, number).map(|r| SampleInfo {
            dts: r.dts,
            cts: r.cts,
            length: r.size,
            index: r.index,
            random_access: r.random_access,
        })
    }

    fn timestamps(&self, track_id: u32) -> CoreResult<Vec<MediaTimestamp>> {
        Ok(self
            .track(track_id)?
            .samples
            .iter()
            .map(|s| MediaTimestamp::new(s.dts, s.cts))
            .collect())
    }

    fn replace_timestamps(&mut self, track_id: u32, timestamps: Vec<MediaTimestamp>) -> CoreResult<()> {
        let track = self.track_mut(track_id)?;
        if timestamps.len() != track.samples.len() {
            return Err(CoreError::SourceRead(format!(
                "track {} has {} samples, got {} timestamps",
                track_id,
                track.samples.len(),
                timestamps.len()
            )));
        }
        for (record, ts) in track.samples.iter_mut().zip(timestamps) {
            record.dts = ts.dts;
            record.cts = ts.cts;
        }
        // The derived delta no longer applies.
        track.last_sample_delta = None;
        Ok(())
    }

    fn set_media_timescale(&mut self, track_id: u32, timescale: u32) -> CoreResult<()> {
        self.track_mut(track_id)?.timescale = timescale;
        Ok(())
    }
}

// ============================================================================
// SINK
// ============================================================================

/// One call observed by a `MemorySink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Append { track_id: u32, dts: u64, cts: u64, size: u64 },
    Flush { track_id: u32, last_sample_delta: u64 },
    Fragment { number: u32 },
    Segment { path: PathBuf },
    Edit { track_id: u32, edit: Edit },
    Finish,
}

#[derive(Debug)]
struct SinkTrack {
    manifest: TrackManifest,
    pooled: Vec<SampleRecord>,
    last_dts: Option<u64>,
    max_ctd_shift: u64,
}

/// Output writer producing one manifest per file.
#[derive(Debug)]
pub struct MemorySink {
    dry_run: bool,
    options: Option<WriterOptions>,
    movie: MovieParams,
    tracks: Vec<SinkTrack>,
    next_track_id: u32,
    fragment_number: u32,
    current_path: PathBuf,
    current_file: Option<FileParams>,
    current_mode: FileMode,
    outputs: Vec<(PathBuf, MovieManifest)>,
    written: Vec<PathBuf>,
    events: Vec<SinkEvent>,
    rejected_types: Vec<FourCc>,
}

impl MemorySink {
    pub fn new(path: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            dry_run,
            options: None,
            movie: MovieParams { timescale: 0 },
            tracks: Vec::new(),
            next_track_id: 1,
            fragment_number: 0,
            current_path: path.into(),
            current_file: None,
            current_mode: FileMode::default(),
            outputs: Vec::new(),
            written: Vec::new(),
            events: Vec::new(),
            rejected_types: Vec::new(),
        }
    }

    /// Refuses sample descriptions of the given type.
    pub fn reject_sample_type(mut self, sample_type: FourCc) -> Self {
        self.rejected_types.push(sample_type);
        self
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Every file closed so far with its contents, written to disk or not.
    pub fn outputs(&self) -> &[(PathBuf, MovieManifest)] {
        &self.outputs
    }

    /// Files actually written to disk.
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track(&self, track_id: u32) -> CoreResult<&SinkTrack> {
        self.tracks
            .iter()
            .find(|t| t.manifest.track_id == track_id)
            .ok_or_else(|| CoreError::ContainerWrite(format!("no output track with ID {}", track_id)))
    }

    fn track_mut(&mut self, track_id: u32) -> CoreResult<&mut SinkTrack> {
        self.tracks
            .iter_mut()
            .find(|t| t.manifest.track_id == track_id)
            .ok_or_else(|| CoreError::ContainerWrite(format!("no output track with ID {}", track_id)))
    }

    fn close_current(&mut self, progress: &mut dyn ProgressReporter) -> CoreResult<()> {
        let file = self
            .current_file
            .clone()
            .ok_or_else(|| CoreError::ContainerWrite("output was never configured".to_string()))?;
        let writer = self.options.clone().map(|mut options| {
            options.mode = self.current_mode;
            options
        });
        let manifest = MovieManifest {
            file,
            movie: self.movie,
            writer,
            tracks: self.tracks.iter().map(|t| t.manifest.clone()).collect(),
        };
        for track in &mut self.tracks {
            track.manifest.samples.clear();
        }

        if self.dry_run {
            debug!("Dry run: skipping write of {}", self.current_path.display());
        } else {
            let size = manifest.save(&self.current_path)?;
            progress.finalizing(size, size);
            self.written.push(self.current_path.clone());
        }
        self.outputs.push((self.current_path.clone(), manifest));
        Ok(())
    }
}

impl MediaSink for MemorySink {
    fn configure(&mut self, file: &FileParams, options: &WriterOptions) -> CoreResult<()> {
        self.current_file = Some(file.clone());
        self.current_mode = options.mode;
        self.options = Some(options.clone());
        Ok(())
    }

    fn set_movie_params(&mut self, params: &MovieParams) -> CoreResult<()> {
        if params.timescale == 0 {
            return Err(CoreError::ContainerWrite("movie timescale must not be 0".to_string()));
        }
        self.movie = *params;
        Ok(())
    }

    fn movie_timescale(&self) -> u32 {
        self.movie.timescale
    }

    fn create_track(&mut self, handler: HandlerKind) -> CoreResult<u32> {
        let track_id = self.next_track_id;
        self.next_track_id += 1;
        self.tracks.push(SinkTrack {
            manifest: TrackManifest::new(track_id, handler, 0),
            pooled: Vec::new(),
            last_dts: None,
            max_ctd_shift: 0,
        });
        Ok(track_id)
    }

    fn delete_track(&mut self, track_id: u32) {
        self.tracks.retain(|t| t.manifest.track_id != track_id);
    }

    fn set_track_params(&mut self, track_id: u32, params: &TrackParams) -> CoreResult<()> {
        let track = self.track_mut(track_id)?;
        track.manifest.enabled = params.enabled;
        track.manifest.alternate_group = params.alternate_group;
        Ok(())
    }

    fn set_media_params(&mut self, track_id: u32, params: &MediaParams) -> CoreResult<()> {
        if params.timescale == 0 {
            return Err(CoreError::ContainerWrite(format!(
                "media timescale of track {} must not be 0",
                track_id
            )));
        }
        let track = self.track_mut(track_id)?;
        track.manifest.timescale = params.timescale;
        track.manifest.handler = params.handler;
        track.manifest.language = params.language.clone();
        track.manifest.handler_name = params.handler_name.clone();
        Ok(())
    }

    fn media_timescale(&self, track_id: u32) -> CoreResult<u32> {
        Ok(self.track(track_id)?.manifest.timescale)
    }

    fn add_summary(&mut self, track_id: u32, summary: &Summary) -> CoreResult<u32> {
        if self.rejected_types.contains(&summary.sample_type) {
            return Err(CoreError::ContainerWrite(format!(
                "sample type {} is not supported by the writer",
                summary.sample_type
            )));
        }
        let track = self.track_mut(track_id)?;
        track.manifest.summaries.push(summary.clone());
        Ok(track.manifest.summaries.len() as u32)
    }

    fn append_sample(&mut self, track_id: u32, sample: Sample) -> CoreResult<()> {
        let fragment = self.fragment_number;
        let track = self.track_mut(track_id)?;
        if track.last_dts.is_some_and(|last| sample.dts <= last) {
            return Err(CoreError::ContainerWrite(format!(
                "non-increasing DTS {} on track {}",
                sample.dts, track_id
            )));
        }
        if sample.index == 0 || sample.index as usize > track.manifest.summaries.len() {
            return Err(CoreError::ContainerWrite(format!(
                "sample description index {} out of range on track {}",
                sample.index, track_id
            )));
        }
        track.last_dts = Some(sample.dts);
        track.max_ctd_shift = track.max_ctd_shift.max(sample.dts.saturating_sub(sample.cts));
        let size = sample.len() as u64;
        track.pooled.push(SampleRecord {
            dts: sample.dts,
            cts: sample.cts,
            size: sample.len() as u32,
            index: sample.index,
            random_access: sample.random_access,
            fragment,
            data: Vec::new(),
        });
        self.events.push(SinkEvent::Append { track_id, dts: sample.dts, cts: sample.cts, size });
        Ok(())
    }

    fn flush_pooled_samples(&mut self, track_id: u32, last_sample_delta: u64) -> CoreResult<()> {
        let track = self.track_mut(track_id)?;
        let pooled = std::mem::take(&mut track.pooled);
        track.manifest.samples.extend(pooled);
        track.manifest.last_sample_delta = Some(last_sample_delta.min(u32::MAX as u64) as u32);
        self.events.push(SinkEvent::Flush { track_id, last_sample_delta });
        Ok(())
    }

    fn clear_edits(&mut self, track_id: u32) -> CoreResult<()> {
        self.track_mut(track_id)?.manifest.edits.clear();
        Ok(())
    }

    fn push_edit(&mut self, track_id: u32, edit: Edit) -> CoreResult<()> {
        self.track_mut(track_id)?.manifest.edits.push(edit);
        self.events.push(SinkEvent::Edit { track_id, edit });
        Ok(())
    }

    fn composition_to_decode_shift(&self, track_id: u32) -> CoreResult<u32> {
        Ok(self.track(track_id)?.max_ctd_shift.min(u32::MAX as u64) as u32)
    }

    fn create_fragment(&mut self) -> CoreResult<()> {
        if !self.current_mode.fragmented {
            return Err(CoreError::ContainerWrite(
                "cannot create a movie fragment in a non-fragmented file".to_string(),
            ));
        }
        self.fragment_number += 1;
        self.events.push(SinkEvent::Fragment { number: self.fragment_number });
        Ok(())
    }

    fn switch_segment(
        &mut self,
        path: &Path,
        params: &SegmentParams,
        progress: &mut dyn ProgressReporter,
    ) -> CoreResult<()> {
        if self.tracks.iter().any(|t| !t.pooled.is_empty()) {
            return Err(CoreError::ContainerWrite(
                "segment switch with unflushed samples".to_string(),
            ));
        }
        self.close_current(progress)?;
        self.current_path = path.to_path_buf();
        self.current_file = Some(params.file.clone());
        self.current_mode = params.mode;
        self.events.push(SinkEvent::Segment { path: path.to_path_buf() });
        Ok(())
    }

    fn finish(&mut self, progress: &mut dyn ProgressReporter) -> CoreResult<()> {
        self.close_current(progress)?;
        progress.done();
        self.events.push(SinkEvent::Finish);
        Ok(())
    }

    fn discard(&mut self) {
        for path in self.written.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}
