// ============================================================================
// reframe-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDERS: Builder Pattern for RemuxConfig and TimelineEditConfig
//
// Fluent builders for the two run configurations. `build()` checks the rules
// that span several fields and returns a Configuration error when they are
// violated.
//
// KEY COMPONENTS:
// - RemuxConfigBuilder: inputs, output, fragmentation, DASH, chunking
// - TimelineEditConfigBuilder: track, timecode, timescale, skip/delay

use std::path::PathBuf;

use log::warn;

use super::{InputSpec, RemuxConfig, TimelineEditConfig, parse_language};
use crate::error::{CoreError, CoreResult};
use crate::timeline::Rational;

/// Builder for creating RemuxConfig instances.
#[derive(Debug, Clone, Default)]
pub struct RemuxConfigBuilder {
    config: RemuxConfig,
}

impl RemuxConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: InputSpec) -> Self {
        self.config.inputs.push(input);
        self
    }

    pub fn inputs(mut self, inputs: impl IntoIterator<Item = InputSpec>) -> Self {
        self.config.inputs.extend(inputs);
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.config.default_language = Some(language.into());
        self
    }

    pub fn fragment_base_track(mut self, track: u32) -> Self {
        self.config.fragment_base_track = track;
        self
    }

    pub fn min_fragment_duration(mut self, seconds: f64) -> Self {
        self.config.min_fragment_duration = seconds;
        self
    }

    pub fn dash_subsegments(mut self, subsegments: u32) -> Self {
        self.config.dash_subsegments = Some(subsegments);
        self
    }

    pub fn max_chunk_duration_ms(mut self, ms: u32) -> Self {
        self.config.max_chunk_duration_ms = ms;
        self
    }

    pub fn max_chunk_size(mut self, bytes: u64) -> Self {
        self.config.max_chunk_size = bytes;
        self
    }

    pub fn compact_size_table(mut self, enable: bool) -> Self {
        self.config.compact_size_table = enable;
        self
    }

    pub fn dry_run(mut self, enable: bool) -> Self {
        self.config.dry_run = enable;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(mut self) -> CoreResult<RemuxConfig> {
        let config = &mut self.config;
        if config.inputs.is_empty() {
            return Err(CoreError::Configuration("at least one input is required".to_string()));
        }
        if config.output.as_os_str().is_empty() {
            return Err(CoreError::Configuration("an output path is required".to_string()));
        }
        if let Some(language) = config.default_language.take() {
            config.default_language = Some(parse_language(&language)?);
        }
        if !config.min_fragment_duration.is_finite() || config.min_fragment_duration < 0.0 {
            return Err(CoreError::Configuration(format!(
                "invalid minimum fragment duration {}",
                config.min_fragment_duration
            )));
        }
        if config.min_fragment_duration > 0.0 && !config.is_fragmented() {
            return Err(CoreError::Configuration(
                "a minimum fragment duration requires fragmentation".to_string(),
            ));
        }
        if config.dash_subsegments.is_some() && !config.is_fragmented() {
            warn!("DASH segmentation requires fragmentation; ignoring it");
            config.dash_subsegments = None;
        }
        if config.max_chunk_duration_ms == 0 || config.max_chunk_size == 0 {
            return Err(CoreError::Configuration("chunk limits must be positive".to_string()));
        }
        Ok(self.config)
    }
}

/// Builder for creating TimelineEditConfig instances.
#[derive(Debug, Clone, Default)]
pub struct TimelineEditConfigBuilder {
    config: TimelineEditConfig,
}

impl TimelineEditConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input = path.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    pub fn track_number(mut self, track: u32) -> Self {
        self.config.track_number = track;
        self
    }

    pub fn timecode(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.timecode = Some(path.into());
        self
    }

    pub fn media_timescale(mut self, timescale: u32) -> Self {
        self.config.media_timescale = Some(timescale);
        self
    }

    pub fn media_timebase(mut self, timebase: u32) -> Self {
        self.config.media_timebase = Some(timebase);
        self
    }

    pub fn skip(mut self, seconds: Rational) -> Self {
        self.config.skip = seconds;
        self
    }

    pub fn delay(mut self, seconds: Rational) -> Self {
        self.config.delay = seconds;
        self
    }

    pub fn dts_compression(mut self, enable: bool) -> Self {
        self.config.dts_compression = enable;
        self
    }

    pub fn build(self) -> CoreResult<TimelineEditConfig> {
        let config = self.config;
        if config.input.as_os_str().is_empty() || config.output.as_os_str().is_empty() {
            return Err(CoreError::Configuration("input and output paths are required".to_string()));
        }
        if config.track_number == 0 {
            return Err(CoreError::Configuration("track numbers start at 1".to_string()));
        }
        if config.media_timescale == Some(0) || config.media_timebase == Some(0) {
            return Err(CoreError::Configuration(
                "media timescale and timebase must be positive".to_string(),
            ));
        }
        if config.dts_compression && config.media_timescale.is_some() {
            warn!("DTS compression is ignored when the media timescale is set explicitly");
        }
        Ok(config)
    }
}
