// ============================================================================
// reframe-core/src/timeline/editor.rs
// ============================================================================
//
// TIMELINE EDITOR: Regenerates DTS/CTS for one track and its edit list
//
// WORKFLOW:
// 1. Derive the output (timescale, timebase) from the track's own ticks,
//    optionally converted to a caller-pinned timescale and/or timebase.
// 2. Build one presentation tick per sample, either from the track's CTS
//    (in composition order) or from a reconciled timecode description.
// 3. Without reordering, DTS = CTS = tick. With a reorder depth of D,
//    CTS = tick + composition delay and the DTS of the i-th decoded sample
//    is the (i - D)-th presentation time, fed through a D-long window. The
//    first D + 1 DTS values either copy the ticks or, under DTS compression,
//    form a ramp on a timescale multiplied by D + 1.
// 4. Emit an empty edit for any delay and a normal edit over the duration.

use std::collections::VecDeque;

use log::{debug, info};

use crate::config::TimelineEditConfig;
use crate::engine::MediaSource;
use crate::error::{CoreError, CoreResult};
use crate::media::{Edit, MediaTimestamp};
use crate::timeline::rational::{MAX_32, rescale};
use crate::timeline::reconcile::{
    ReconcileRequest, TimescaleSpec, native_timebase, reconcile_timecode,
};
use crate::timeline::reorder::{composition_order, max_sample_delay};
use crate::timeline::timecode::TimecodeFile;

/// Re-timed state of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetimedTrack {
    /// New timestamps in decode order.
    pub timestamps: Vec<MediaTimestamp>,
    pub timescale: u32,
    /// Reorder depth in samples.
    pub sample_delay: u32,
    /// Offset added to every CTS, in media ticks.
    pub composition_delay: u64,
    pub last_sample_delta: u64,
    /// Presentation length of the media, in media ticks.
    pub duration: u64,
    /// Presentation time before the first sample taken from the timecode, in media ticks.
    pub empty_delay: u64,
}

fn unreachable_timescale(timescale: u64) -> CoreError {
    CoreError::ReconciliationOverflow(format!("media timescale {} is not usable", timescale))
}

/// Output (timescale, timebase, tick multiplier) before any timecode is applied.
fn convert_native(
    native_timescale: u32,
    native_timebase: u64,
    config: &TimelineEditConfig,
) -> CoreResult<(u64, u64, f64)> {
    if config.media_timescale.is_none() && config.media_timebase.is_none() {
        let spec = TimescaleSpec::reduced(native_timescale as u64, native_timebase)?;
        return Ok((spec.timescale as u64, spec.timebase as u64, 1.0));
    }
    let native_timescale = native_timescale as u64;
    let timebase = config.media_timebase.map_or(native_timebase, u64::from);
    let mut timescale = config.media_timescale.map_or(native_timescale, u64::from);
    if config.media_timescale.is_none() && timebase > native_timebase {
        timescale = (timescale as f64 * (timebase as f64 / native_timebase as f64) + 0.5) as u64;
    }
    let multiplier = (timescale as f64 / native_timescale as f64) * (native_timebase as f64 / timebase as f64);
    Ok((timescale, timebase, multiplier))
}

/// Presentation ticks converted from the track's own CTS values.
fn convert_ticks(
    timestamps: &[MediaTimestamp],
    order: &[usize],
    native_timebase: u64,
    multiplier: f64,
    timebase: u64,
) -> CoreResult<Vec<u64>> {
    let first = timestamps[order[0]].cts;
    let mut ticks: Vec<u64> = Vec::with_capacity(order.len());
    for (k, &i) in order.iter().enumerate() {
        let units = timestamps[i].cts.saturating_sub(first) / native_timebase;
        let tick = (units as f64 * multiplier + 0.5) as u64 * timebase;
        if ticks.last().is_some_and(|&prev| tick <= prev) {
            return Err(CoreError::Configuration(format!(
                "timescale conversion merges samples {} and {}",
                k - 1,
                k
            )));
        }
        ticks.push(tick);
    }
    Ok(ticks)
}

/// Computes new timestamps for a track.
///
/// `timestamps` are the track's current timestamps in decode order.
pub fn retime(
    timestamps: &[MediaTimestamp],
    native_timescale: u32,
    config: &TimelineEditConfig,
    timecode: Option<&TimecodeFile>,
) -> CoreResult<RetimedTrack> {
    let sample_count = timestamps.len();
    if sample_count == 0 {
        return Err(CoreError::SourceRead("track has no samples".to_string()));
    }
    let native_tb = native_timebase(timestamps);
    if native_tb == 0 {
        return Err(CoreError::SourceRead("failed to derive the media timebase".to_string()));
    }
    let (mut timescale, mut timebase, multiplier) = convert_native(native_timescale, native_tb, config)?;

    let mut empty_delay = 0;
    let reconciled = match timecode {
        Some(file) => {
            let request = ReconcileRequest {
                timescale,
                timebase,
                auto_timescale: config.media_timescale.is_none(),
                auto_timebase: config.media_timebase.is_none(),
            };
            let series = reconcile_timecode(file, sample_count, request)?;
            timescale = series.spec.timescale as u64;
            timebase = series.spec.timebase as u64;
            empty_delay = series.empty_delay;
            Some(series.timestamps)
        }
        None => None,
    };
    if timescale == 0 || timescale > MAX_32 || timebase == 0 {
        return Err(unreachable_timescale(timescale));
    }

    let sample_delay = max_sample_delay(timestamps);
    let order: Vec<usize> = if sample_delay > 0 {
        composition_order(timestamps)
    } else {
        (0..sample_count).collect()
    };
    let mut ticks = match reconciled {
        Some(ticks) => ticks,
        None => convert_ticks(timestamps, &order, native_tb, multiplier, timebase)?,
    };

    let mut retimed: Vec<MediaTimestamp> = vec![MediaTimestamp::new(0, 0); sample_count];
    let mut composition_delay = 0;
    if sample_delay > 0 {
        let delay = sample_delay as usize;
        let compression = config.effective_dts_compression();
        let factor = if compression { sample_delay as u64 + 1 } else { 1 };
        let initial_delta = ticks[1];
        timescale = timescale
            .checked_mul(factor)
            .filter(|&ts| ts <= MAX_32)
            .ok_or_else(|| unreachable_timescale(timescale.saturating_mul(factor)))?;
        if factor > 1 {
            ticks.iter_mut().for_each(|t| *t *= factor);
        }
        composition_delay = if compression { 0 } else { ticks[delay] };

        for (k, &i) in order.iter().enumerate() {
            retimed[i].cts = ticks[k] + composition_delay;
        }
        // Holds the `delay` most recent presentation times in decode position order.
        let mut window: VecDeque<u64> = VecDeque::with_capacity(delay + 1);
        for i in 0..sample_count {
            let dts = if i > delay {
                window.front().copied().unwrap_or_default()
            } else if compression {
                i as u64 * initial_delta
            } else {
                ticks[i]
            };
            if i > 0 && dts <= retimed[i - 1].dts {
                return Err(CoreError::ReconciliationOverflow(format!(
                    "generated DTS stops increasing at sample {}",
                    i
                )));
            }
            retimed[i].dts = dts;
            window.push_back(ticks[i] + composition_delay);
            if window.len() > delay {
                window.pop_front();
            }
        }
    } else {
        for (ts, &tick) in retimed.iter_mut().zip(&ticks) {
            *ts = MediaTimestamp::new(tick, tick);
        }
    }

    let (last_sample_delta, duration) = if sample_count > 1 {
        let delta = ticks[sample_count - 1] - ticks[sample_count - 2];
        (delta, ticks[sample_count - 1] + delta)
    } else {
        // Still image.
        (MAX_32, MAX_32)
    };

    debug!(
        "Retimed {} samples: timescale {}, reorder depth {}, composition delay {}",
        sample_count, timescale, sample_delay, composition_delay
    );
    Ok(RetimedTrack {
        timestamps: retimed,
        timescale: timescale as u32,
        sample_delay,
        composition_delay,
        last_sample_delta,
        duration,
        empty_delay,
    })
}

/// Edit list for a re-timed track. Durations are in movie ticks.
pub fn edit_list(track: &RetimedTrack, config: &TimelineEditConfig, movie_timescale: u32) -> Vec<Edit> {
    let media_timescale = track.timescale;
    let empty_delay = track.empty_delay + config.delay.to_ticks(media_timescale as u64);
    let duration = rescale(track.duration + empty_delay, media_timescale, movie_timescale);
    let start_time = track.composition_delay + config.skip.to_ticks(media_timescale as u64);

    let mut edits = Vec::with_capacity(2);
    if empty_delay > 0 {
        let empty = rescale(empty_delay, media_timescale, movie_timescale);
        edits.push(Edit::empty(empty));
        edits.push(Edit::normal(duration.saturating_sub(empty), start_time));
    } else {
        edits.push(Edit::normal(duration, start_time));
    }
    edits
}

/// Writes the re-timed timestamps and timescale back into the source.
pub fn apply(source: &mut dyn MediaSource, track_id: u32, track: &RetimedTrack) -> CoreResult<()> {
    source.set_media_timescale(track_id, track.timescale)?;
    source.replace_timestamps(track_id, track.timestamps.clone())?;
    info!(
        "Track {} re-timed to timescale {} ({} samples)",
        track_id,
        track.timescale,
        track.timestamps.len()
    );
    Ok(())
}
