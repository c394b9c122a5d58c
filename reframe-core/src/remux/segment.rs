//! DASH segment files.
//!
//! The output path itself receives the initialization segment. Media
//! segments go to `name_1.ext`, `name_2.ext` and so on, each holding
//! `per_segment` fragments.

use std::path::{Path, PathBuf};

use crate::media::{FileMode, FileParams, SegmentParams};

use super::brand::{MSDH, MSIX};

/// Path of media segment `number` of `output`.
pub fn segment_path(output: &Path, number: u32) -> PathBuf {
    let stem = output.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{}_{}.{}", stem, number, ext.to_string_lossy()),
        None => format!("{}_{}", stem, number),
    };
    output.with_file_name(name)
}

/// Parameters of the first media segment following the initialization segment.
fn media_segment_params(output: &FileParams) -> SegmentParams {
    let mut brands = vec![MSDH, MSIX];
    brands.extend(output.brands.iter().copied());
    SegmentParams {
        file: FileParams { major_brand: MSDH, minor_version: 0, brands },
        mode: FileMode {
            fragmented: true,
            index: true,
            media: true,
            segment: true,
            initialization: false,
        },
    }
}

/// A segment switch decided by `SegmentState::on_fragment_flushed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSwitch {
    pub path: PathBuf,
    pub params: SegmentParams,
}

/// Segment and sub-segment counters of a segmented write.
#[derive(Debug, Clone)]
pub struct SegmentState {
    per_segment: u32,
    /// Number of the next segment file.
    segment_number: u32,
    /// Fragments already written into the current segment.
    subsegment_number: u32,
    output: PathBuf,
    output_file: FileParams,
    current: SegmentParams,
}

impl SegmentState {
    /// `per_segment` of 0 keeps everything in the output file.
    pub fn new(per_segment: u32, output: PathBuf, output_file: FileParams, mode: FileMode) -> Self {
        let current = SegmentParams { file: output_file.clone(), mode };
        Self {
            per_segment,
            segment_number: 1,
            subsegment_number: 0,
            output,
            output_file,
            current,
        }
    }

    pub fn is_segmenting(&self) -> bool {
        self.per_segment > 0
    }

    pub fn segment_number(&self) -> u32 {
        self.segment_number
    }

    pub fn subsegment_number(&self) -> u32 {
        self.subsegment_number
    }

    /// Counts a fragment flush and returns the segment to switch to, if any.
    ///
    /// The first flush always switches, so the initialization segment holds
    /// no media.
    pub fn on_fragment_flushed(&mut self) -> Option<SegmentSwitch> {
        if !self.is_segmenting() {
            return None;
        }
        if self.subsegment_number == self.per_segment || self.segment_number == 1 {
            let params = if self.current.mode.initialization {
                media_segment_params(&self.output_file)
            } else {
                self.current.clone()
            };
            let switch = SegmentSwitch { path: segment_path(&self.output, self.segment_number), params };
            self.current = switch.params.clone();
            self.subsegment_number = 1;
            self.segment_number += 1;
            Some(switch)
        } else {
            self.subsegment_number += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FourCc;

    fn state(per_segment: u32) -> SegmentState {
        let file = FileParams {
            major_brand: FourCc::new(b"iso6"),
            minor_version: 0,
            brands: vec![FourCc::new(b"iso6"), FourCc::new(b"mp41")],
        };
        let mode = FileMode { fragmented: true, media: false, segment: true, ..FileMode::default() };
        SegmentState::new(per_segment, PathBuf::from("/out/movie.mp4"), file, mode)
    }

    #[test]
    fn segment_names_insert_the_number_before_the_extension() {
        assert_eq!(segment_path(Path::new("/out/movie.mp4"), 3), PathBuf::from("/out/movie_3.mp4"));
        assert_eq!(segment_path(Path::new("movie"), 12), PathBuf::from("movie_12"));
        assert_eq!(segment_path(Path::new("a.b.json"), 1), PathBuf::from("a.b_1.json"));
    }

    #[test]
    fn switches_on_first_fourth_and_seventh_flush() {
        let mut state = state(3);
        let switched: Vec<usize> =
            (1..=9).filter_map(|flush| state.on_fragment_flushed().map(|_| flush)).collect();
        assert_eq!(switched, vec![1, 4, 7]);
    }

    #[test]
    fn subsegment_counter_resets_after_a_switch() {
        let mut state = state(3);
        let first = state.on_fragment_flushed().unwrap();
        assert_eq!(first.path, PathBuf::from("/out/movie_1.mp4"));
        assert_eq!(state.subsegment_number(), 1);
        assert_eq!(state.segment_number(), 2);
        state.on_fragment_flushed();
        state.on_fragment_flushed();
        assert_eq!(state.subsegment_number(), 3);
        let second = state.on_fragment_flushed().unwrap();
        assert_eq!(second.path, PathBuf::from("/out/movie_2.mp4"));
        assert_eq!(state.subsegment_number(), 1);
    }

    #[test]
    fn first_media_segment_gets_msdh_and_later_ones_copy_it() {
        let mut state = state(1);
        let first = state.on_fragment_flushed().unwrap();
        assert_eq!(first.params.file.major_brand, MSDH);
        assert_eq!(
            first.params.file.brands,
            vec![MSDH, MSIX, FourCc::new(b"iso6"), FourCc::new(b"mp41")]
        );
        assert!(!first.params.mode.initialization);
        assert!(first.params.mode.index && first.params.mode.media);

        let second = state.on_fragment_flushed().unwrap();
        assert_eq!(second.params, first.params);
    }

    #[test]
    fn self_contained_output_never_switches() {
        let mut state = state(0);
        assert!(!state.is_segmenting());
        assert!((0..5).all(|_| state.on_fragment_flushed().is_none()));
    }
}
