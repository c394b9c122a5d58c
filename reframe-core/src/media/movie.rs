//! Input movies: one shared source handle plus a view per track.

use std::path::Path;

use log::{debug, info, warn};

use crate::config::InputSpec;
use crate::engine::MediaSource;
use crate::error::{CoreError, CoreResult};
use crate::media::{FileParams, InputTrack, MovieParams};

/// An opened input and its track views.
pub struct InputMovie {
    source: Box<dyn MediaSource>,
    pub file_params: FileParams,
    pub movie_params: MovieParams,
    pub tracks: Vec<InputTrack>,
}

impl std::fmt::Debug for InputMovie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputMovie")
            .field("source", &self.source.name())
            .field("movie_params", &self.movie_params)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

impl InputMovie {
    /// Reads every track of `source`.
    ///
    /// Relative data references are resolved against `base_dir`. Unsupported
    /// sample descriptions and unreachable data references only produce
    /// warnings.
    pub fn open(mut source: Box<dyn MediaSource>, base_dir: Option<&Path>) -> CoreResult<Self> {
        let file_params = source.file_params();
        let movie_params = source.movie_params();
        if movie_params.timescale == 0 {
            return Err(CoreError::SourceRead(format!("{}: movie timescale is 0", source.name())));
        }
        let track_ids = source.track_ids();
        if track_ids.is_empty() {
            return Err(CoreError::SourceRead(format!("{}: no tracks found", source.name())));
        }

        let mut tracks = Vec::with_capacity(track_ids.len());
        for track_id in track_ids {
            let media_params = source.media_params(track_id)?;
            if media_params.timescale == 0 {
                return Err(CoreError::SourceRead(format!(
                    "{}: media timescale of track {} is 0",
                    source.name(),
                    track_id
                )));
            }
            let mut track = InputTrack::new(
                track_id,
                source.track_params(track_id)?,
                media_params,
                source.summaries(track_id)?,
                source.last_sample_delta(track_id)?,
            );
            for (i, entry) in track.summaries.iter().enumerate() {
                if !entry.active {
                    warn!(
                        "{}: sample description {} ({}) of track {} is not supported",
                        source.name(),
                        i + 1,
                        entry.summary.sample_type,
                        track_id
                    );
                }
            }
            if !track.has_active_summary() {
                warn!("{}: track {} has no supported codec; skipping it", source.name(), track_id);
                track.active = false;
            }

            for reference in source.data_references(track_id)? {
                let Some(location) = reference.location.as_deref() else {
                    continue;
                };
                let resolved = match base_dir {
                    Some(dir) if location.is_relative() => dir.join(location),
                    _ => location.to_path_buf(),
                };
                if let Err(e) = source.attach_data_reference(track_id, reference.index, &resolved) {
                    warn!("{}: track {}: {}", source.name(), track_id, e);
                }
            }
            tracks.push(track);
        }

        debug!("Opened {} with {} tracks", source.name(), tracks.len());
        Ok(Self { source, file_params, movie_params, tracks })
    }

    pub fn source(&self) -> &dyn MediaSource {
        self.source.as_ref()
    }

    /// Splits into the shared source and the track views for simultaneous use.
    pub fn parts_mut(&mut self) -> (&dyn MediaSource, &mut [InputTrack]) {
        (self.source.as_ref(), &mut self.tracks)
    }

    /// Applies per-track user options and the default language.
    pub fn apply_options(&mut self, spec: &InputSpec, default_language: Option<&str>) -> CoreResult<()> {
        if let Some(highest) = spec.highest_track_number() {
            if highest as usize > self.tracks.len() {
                return Err(CoreError::Configuration(format!(
                    "{}: track {} requested but the input has {} tracks",
                    self.source.name(),
                    highest,
                    self.tracks.len()
                )));
            }
        }
        for (i, track) in self.tracks.iter_mut().enumerate() {
            let options = spec.options_for(i as u32 + 1);
            if options.remove {
                info!("{}: removing track {}", self.source.name(), track.track_id);
                track.active = false;
            }
            if options.disable {
                track.track_params.enabled = false;
            }
            if let Some(group) = options.alternate_group {
                track.track_params.alternate_group = group;
            }
            if let Some(language) = options.language.as_deref().or(default_language) {
                track.media_params.language = Some(language.to_string());
            }
            if let Some(name) = &options.handler_name {
                track.media_params.handler_name = Some(name.clone());
            }
            track.options = options;
        }
        Ok(())
    }
}
