// ============================================================================
// reframe-core/src/remux/brand.rs
// ============================================================================
//
// BRANDS: Output file-type brands derived from the inputs
//
// Every input brand is first replaced by one the writer can honor, then the
// most used (major brand, minor version) pair becomes the output major brand
// and all brands are merged in first-seen order.

use crate::media::{FileParams, FourCc, HandlerKind};

pub const MP42: FourCc = FourCc::new(b"mp42");
pub const ISO6: FourCc = FourCc::new(b"iso6");
pub const DASH: FourCc = FourCc::new(b"dash");
pub const MSDH: FourCc = FourCc::new(b"msdh");
pub const MSIX: FourCc = FourCc::new(b"msix");

/// 3GPP release 6 general profile.
const GENERAL_PROFILE_3GPP: FourCc = FourCc::new(b"3gg6");
const GENERAL_PROFILE_MINOR_VERSION: u32 = 0x0000_0700;

/// Brands the writer can produce files for.
const SUPPORTED_BRANDS: [&[u8; 4]; 26] = [
    b"3g2a", b"3gg6", b"3gg9", b"3gp4", b"3gp5", b"3gp6", b"3gp7", b"3gp8", b"3gp9", b"3gr6",
    b"3gr9", b"M4A ", b"M4B ", b"M4V ", b"avc1", b"dby1", b"iso2", b"iso3", b"iso4", b"iso5",
    b"iso6", b"iso7", b"isom", b"mp41", b"mp42", b"qt  ",
];

/// Brands the timeline editor keeps as the major brand.
const EDITOR_BRANDS: [&[u8; 4]; 25] = [
    b"3g2a", b"3gg6", b"3gg9", b"3gp4", b"3gp5", b"3gp6", b"3gp7", b"3gp8", b"3gp9", b"3gr6",
    b"3gr9", b"M4A ", b"M4B ", b"M4V ", b"avc1", b"dby1", b"iso2", b"iso3", b"iso4", b"iso5",
    b"iso6", b"isom", b"mp41", b"mp42", b"qt  ",
];

fn is_supported(brand: FourCc) -> bool {
    SUPPORTED_BRANDS.iter().any(|b| brand.as_bytes() == *b)
}

/// Output properties that decide how brands are rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrandPolicy {
    pub fragmented: bool,
    pub dash: bool,
    /// One video and one audio track at most, each with one sample description.
    pub basic_profile: bool,
}

impl BrandPolicy {
    /// Checks the 3GPP basic profile track limits over all input tracks.
    pub fn for_tracks(fragmented: bool, dash: bool, tracks: impl IntoIterator<Item = (HandlerKind, usize)>) -> Self {
        let (mut video, mut audio) = (0usize, 0usize);
        let (mut video_summaries, mut audio_summaries) = (0usize, 0usize);
        for (handler, summaries) in tracks {
            match handler {
                HandlerKind::Video => {
                    video += 1;
                    if video == 1 {
                        video_summaries = summaries;
                    }
                }
                HandlerKind::Audio => {
                    audio += 1;
                    if audio == 1 {
                        audio_summaries = summaries;
                    }
                }
                _ => {}
            }
        }
        let basic_profile = video <= 1 && audio <= 1 && video_summaries <= 1 && audio_summaries <= 1;
        Self { fragmented, dash, basic_profile }
    }
}

/// Replacement for one brand and, for a major brand, the minor version it forces.
fn replace_brand(brand: FourCc, policy: BrandPolicy) -> (FourCc, Option<u32>) {
    if !is_supported(brand) {
        return (MP42, Some(0));
    }
    let [a, b, c, d] = *brand.as_bytes();
    if a == b'3' && b == b'g' && (c == b'p' || c == b'r') {
        // Movie fragments are not allowed in the basic profile.
        if policy.fragmented || !policy.basic_profile {
            return if d < b'6' {
                (GENERAL_PROFILE_3GPP, Some(GENERAL_PROFILE_MINOR_VERSION))
            } else {
                (FourCc::new(&[b'3', b'g', b'g', d]), None)
            };
        }
    }
    let iso_up_to_5 = a == b'i' && b == b's' && c == b'o' && (d == b'm' || d < b'6');
    if policy.dash && (brand == FourCc::new(b"avc1") || iso_up_to_5) {
        return (ISO6, None);
    }
    (brand, None)
}

fn sanitize(file: &FileParams, policy: BrandPolicy) -> FileParams {
    let (major_brand, forced) = replace_brand(file.major_brand, policy);
    FileParams {
        major_brand,
        minor_version: forced.unwrap_or(file.minor_version),
        brands: file.brands.iter().map(|&b| replace_brand(b, policy).0).collect(),
    }
}

/// The most used (major brand, minor version) pair. Ties go to the first seen.
fn most_used_major_brand(inputs: &[FileParams]) -> Option<(FourCc, u32)> {
    let mut counts: Vec<((FourCc, u32), usize)> = Vec::new();
    for file in inputs {
        let key = (file.major_brand, file.minor_version);
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => counts.push((key, 1)),
        }
    }
    let mut best: Option<((FourCc, u32), usize)> = None;
    for (key, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}

/// Brands of a remuxed output.
///
/// A self-contained DASH output (`self_contained_segment`) gets `dash` as
/// both major brand and first compatible brand.
pub fn output_file_params(inputs: &[FileParams], policy: BrandPolicy, self_contained_segment: bool) -> FileParams {
    let inputs: Vec<FileParams> = inputs.iter().map(|f| sanitize(f, policy)).collect();
    let (major_brand, minor_version) = if self_contained_segment {
        (DASH, 0)
    } else {
        most_used_major_brand(&inputs).unwrap_or((MP42, 0))
    };

    let mut brands: Vec<FourCc> = Vec::new();
    let candidates = self_contained_segment
        .then_some(DASH)
        .into_iter()
        .chain(inputs.iter().flat_map(|f| std::iter::once(f.major_brand).chain(f.brands.iter().copied())));
    for brand in candidates {
        if brand.as_bytes() != &[0; 4] && !brands.contains(&brand) {
            brands.push(brand);
        }
    }
    FileParams { major_brand, minor_version, brands }
}

/// Brands of a timeline-edited output: unknown major brands become `mp42`,
/// which is then listed as compatible.
pub fn edited_file_params(input: &FileParams) -> FileParams {
    let known = EDITOR_BRANDS.iter().any(|b| input.major_brand.as_bytes() == *b);
    if known {
        return input.clone();
    }
    let mut brands = input.brands.clone();
    if !brands.contains(&MP42) {
        brands.push(MP42);
    }
    FileParams { major_brand: MP42, minor_version: 0, brands }
}
