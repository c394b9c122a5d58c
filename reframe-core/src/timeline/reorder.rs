//! Decode/composition order helpers for reordered (B-frame style) tracks.

use crate::media::MediaTimestamp;

/// Decode positions listed in composition order.
///
/// `result[k]` is the decode index of the k-th sample to be presented. The
/// sort is stable, so equal CTS values keep their decode order.
pub fn composition_order(timestamps: &[MediaTimestamp]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..timestamps.len()).collect();
    order.sort_by_key(|&i| timestamps[i].cts);
    order
}

/// Largest number of samples by which a sample is presented before its
/// decode position. 0 for tracks without reordering.
pub fn max_sample_delay(timestamps: &[MediaTimestamp]) -> u32 {
    composition_order(timestamps)
        .iter()
        .enumerate()
        .map(|(presented, &decoded)| decoded.saturating_sub(presented))
        .max()
        .unwrap_or(0)
        .min(u32::MAX as usize) as u32
}
