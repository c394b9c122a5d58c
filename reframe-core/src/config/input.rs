// ============================================================================
// reframe-core/src/config/input.rs
// ============================================================================
//
// INPUT SPECIFICATIONS: Per-input path plus per-track options
//
// Grammar: PATH[?N:opt[,opt...]][?M:...]
//
//   movie.json?1:language=jpn,alternate-group=1?2:remove
//
// N is the 1-based track number inside that input. Recognized options:
// remove, disable, language=xxx, alternate-group=n, handler=name, seek=n,
// safe-seek=n.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::CoreError;

/// User overrides for one input track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackOptions {
    pub remove: bool,
    pub disable: bool,
    pub language: Option<String>,
    pub alternate_group: Option<u16>,
    pub handler_name: Option<String>,
    /// 1-based sample number to start from.
    pub seek: Option<u32>,
    /// Start exactly on a random-access point and hide the lead-in.
    pub consider_rap: bool,
}

impl TrackOptions {
    fn apply(&mut self, option: &str) -> Result<bool, CoreError> {
        let (key, value) = match option.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (option.trim(), None),
        };
        match key {
            "remove" => {
                self.remove = true;
                return Ok(false);
            }
            "disable" => self.disable = true,
            "language" => self.language = Some(parse_language(need(key, value)?)?),
            "alternate-group" => {
                let v = need(key, value)?;
                self.alternate_group = Some(v.parse().map_err(|_| {
                    CoreError::Configuration(format!("invalid alternate group '{}'", v))
                })?);
            }
            "handler" => self.handler_name = Some(need(key, value)?.to_string()),
            "seek" | "safe-seek" => {
                let v = need(key, value)?;
                let sample = v.parse::<u32>().ok().filter(|&n| n > 0).ok_or_else(|| {
                    CoreError::Configuration(format!("invalid seek position '{}'", v))
                })?;
                self.seek = Some(sample);
                self.consider_rap = key == "safe-seek";
            }
            other => {
                return Err(CoreError::Configuration(format!("unknown track option '{}'", other)));
            }
        }
        Ok(true)
    }
}

fn need<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str, CoreError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::Configuration(format!("track option '{}' needs a value", key)))
}

/// Validates an ISO 639-2 language code.
pub fn parse_language(code: &str) -> Result<String, CoreError> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(code.to_ascii_lowercase())
    } else {
        Err(CoreError::Configuration(format!("invalid ISO 639-2 language code '{}'", code)))
    }
}

/// One input source and the overrides for its tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub path: PathBuf,
    pub track_options: BTreeMap<u32, TrackOptions>,
}

impl InputSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), track_options: BTreeMap::new() }
    }

    pub fn options_for(&self, track_number: u32) -> TrackOptions {
        self.track_options.get(&track_number).cloned().unwrap_or_default()
    }

    /// Highest track number that carries options.
    pub fn highest_track_number(&self) -> Option<u32> {
        self.track_options.keys().next_back().copied()
    }
}

impl FromStr for InputSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('?');
        let path = parts.next().unwrap_or_default();
        if path.is_empty() {
            return Err(CoreError::Configuration("empty input path".to_string()));
        }
        let mut spec = InputSpec::new(path);
        for group in parts {
            let (number, options) = group.split_once(':').ok_or_else(|| {
                CoreError::Configuration(format!("track options '{}' lack a track number", group))
            })?;
            let number = number.trim().parse::<u32>().ok().filter(|&n| n > 0).ok_or_else(|| {
                CoreError::Configuration(format!("invalid track number '{}'", number))
            })?;
            let entry = spec.track_options.entry(number).or_default();
            for option in options.split(',').filter(|o| !o.trim().is_empty()) {
                if !entry.apply(option)? {
                    break;
                }
            }
        }
        Ok(spec)
    }
}
