// ============================================================================
// reframe-core/src/timeline/reconcile.rs
// ============================================================================
//
// TIMESCALE RECONCILER: Derives (timescale, timebase) and per-sample ticks
//
// Native mode takes the GCD of every DTS/CTS tick as the timebase and reduces
// it against the track's timescale. Timecode mode turns a v1/v2 timecode
// description into presentation times, corrects every frame rate to an exact
// rational over the current timebase and, when asked to, picks the LCM of the
// corrected numerators as the timescale. If that LCM leaves the 32-bit range
// the reconciler falls back to a 1e9 timescale with a timebase derived from
// the rates.

use log::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::media::MediaTimestamp;
use crate::timeline::rational::{MAX_32, gcd, lcm, sigexp10};
use crate::timeline::timecode::{FrameRateRun, TimecodeFile};

/// Relative tolerance when matching a frame rate to a rational.
pub const RATE_TOLERANCE: f64 = 5e-6;

/// Largest denominator multiplier tried per rate. Beyond it the rounding
/// error of any significand is already inside `RATE_TOLERANCE`.
pub const MAX_RATE_MULTIPLIER: u64 = 200_000;

/// High-precision timescale used when no common timescale fits in 32 bits.
pub const FALLBACK_TIMESCALE: u64 = 1_000_000_000;

/// A reduced (timescale, timebase) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimescaleSpec {
    pub timescale: u32,
    pub timebase: u32,
}

impl TimescaleSpec {
    /// Reduces the pair by its GCD and checks both fit in 32 bits.
    pub fn reduced(timescale: u64, timebase: u64) -> CoreResult<Self> {
        if timescale == 0 || timebase == 0 {
            return Err(CoreError::ReconciliationOverflow(format!(
                "cannot reduce timescale {} with timebase {}",
                timescale, timebase
            )));
        }
        let divisor = gcd(timescale, timebase);
        let (timescale, timebase) = (timescale / divisor, timebase / divisor);
        if timescale > MAX_32 || timebase > MAX_32 {
            return Err(CoreError::ReconciliationOverflow(format!(
                "timescale {} / timebase {} exceed 32 bits",
                timescale, timebase
            )));
        }
        Ok(Self { timescale: timescale as u32, timebase: timebase as u32 })
    }
}

/// GCD of every CTS and DTS tick. 0 when all timestamps are 0.
pub fn native_timebase(timestamps: &[MediaTimestamp]) -> u64 {
    timestamps
        .iter()
        .flat_map(|ts| [ts.cts, ts.dts])
        .fold(0, gcd)
}

/// Reconciles a track's own timestamps against its declared timescale.
pub fn reconcile_native(timestamps: &[MediaTimestamp], timescale: u32) -> CoreResult<TimescaleSpec> {
    let timebase = native_timebase(timestamps);
    if timebase == 0 {
        return Err(CoreError::SourceRead("track timestamps carry no timebase".to_string()));
    }
    TimescaleSpec::reduced(timescale as u64, timebase)
}

/// Starting point and freedom of a timecode reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileRequest {
    /// Ignored when `auto_timescale` is set.
    pub timescale: u64,
    pub timebase: u64,
    pub auto_timescale: bool,
    pub auto_timebase: bool,
}

/// Result of timecode reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledSeries {
    pub spec: TimescaleSpec,
    /// Presentation ticks per sample, first sample at 0.
    pub timestamps: Vec<u64>,
    /// Ticks before the first timecode.
    pub empty_delay: u64,
}

/// Corrects frame rates to exact rationals over a timebase.
struct RateCorrector {
    timescale: u64,
    timebase: u64,
    auto_timescale: bool,
    overflowed: bool,
}

impl RateCorrector {
    /// Searches `den = k * timebase` for the first `num/den` within tolerance.
    ///
    /// Returns `None` when the numerator would exceed 32 bits or no
    /// multiplier up to `MAX_RATE_MULTIPLIER` matches.
    fn search(&self, fps: f64) -> Option<(u64, u64)> {
        let (significand, exponent) = sigexp10(fps);
        for k in 1..=MAX_RATE_MULTIPLIER {
            let den = k * self.timebase;
            let num = ((den as f64 * significand).round() * exponent) as u64;
            if num > MAX_32 {
                return None;
            }
            if num > 0 && ((num as f64 / den as f64) / exponent - significand).abs() < RATE_TOLERANCE {
                return Some((num, den));
            }
        }
        debug!("No rational within tolerance for {} fps over timebase {}", fps, self.timebase);
        None
    }

    fn absorb(&mut self, num: u64) {
        if !self.auto_timescale || self.overflowed {
            return;
        }
        let next = if self.timescale == 0 { Some(num) } else { lcm(self.timescale, num) };
        match next.filter(|&ts| ts <= MAX_32) {
            Some(ts) => self.timescale = ts,
            None => {
                debug!("Common timescale for rate numerator {} exceeds 32 bits", num);
                self.overflowed = true;
            }
        }
    }

    fn correct(&mut self, fps: f64) -> CoreResult<f64> {
        let (num, den) = self.search(fps).ok_or_else(|| {
            CoreError::ReconciliationOverflow(format!(
                "frame rate {} cannot be expressed over timebase {} in 32 bits",
                fps, self.timebase
            ))
        })?;
        self.absorb(num);
        Ok(num as f64 / den as f64)
    }

    fn auto_timescale_active(&self) -> bool {
        self.auto_timescale && !self.overflowed
    }
}

/// Rate corrected to the 1e9 timebase grid.
fn fallback_rate(fps: f64) -> f64 {
    let (significand, exponent) = sigexp10(fps);
    FALLBACK_TIMESCALE as f64 / ((FALLBACK_TIMESCALE as f64 / significand).round() / exponent)
}

/// Timebase on the 1e9 timescale that divides every frame duration.
fn fallback_timebase(rates: &[f64]) -> CoreResult<u64> {
    let mut timebase = 0u64;
    for &fps in rates {
        let (significand, exponent) = sigexp10(fps);
        let den = ((FALLBACK_TIMESCALE as f64 / significand).round() / exponent) as u64;
        timebase = if den != 0 && timebase != 0 { gcd(timebase, den) } else { den };
        if timebase == 0 || timebase > MAX_32 {
            return Err(CoreError::ReconciliationOverflow(
                "no usable timebase on the 1e9 timescale; set the timescale manually".to_string(),
            ));
        }
    }
    Ok(timebase)
}

/// Presentation times for a v1 description. `correct` maps a raw rate to
/// the rate actually used and `seen` collects the raw rates that applied.
fn generate_v1(
    assumed_fps: f64,
    runs: &[FrameRateRun],
    sample_count: usize,
    correct: &mut dyn FnMut(f64) -> CoreResult<f64>,
    seen: &mut Vec<f64>,
) -> CoreResult<Vec<f64>> {
    let mut times = vec![0.0; sample_count];
    let last = sample_count.saturating_sub(1) as u64;
    let assumed = correct(assumed_fps)?;
    let mut i = 0u64;
    for run in runs {
        if i >= last {
            break;
        }
        while i < run.start && i < last {
            times[i as usize + 1] = times[i as usize] + 1.0 / assumed;
            i += 1;
        }
        if i < last {
            seen.push(run.fps);
            let fps = correct(run.fps)?;
            i = run.start;
            while i <= run.end && i < last {
                times[i as usize + 1] = times[i as usize] + 1.0 / fps;
                i += 1;
            }
        }
    }
    while i < last {
        times[i as usize + 1] = times[i as usize] + 1.0 / assumed;
        i += 1;
    }
    seen.push(assumed_fps);
    Ok(times)
}

/// Reconciles a timecode description for `sample_count` samples.
pub fn reconcile_timecode(
    file: &TimecodeFile,
    sample_count: usize,
    request: ReconcileRequest,
) -> CoreResult<ReconciledSeries> {
    if sample_count == 0 {
        return Err(CoreError::TimecodeFormat("track has no samples".to_string()));
    }
    let mut corrector = RateCorrector {
        timescale: if request.auto_timescale { 0 } else { request.timescale },
        timebase: request.timebase,
        auto_timescale: request.auto_timescale,
        overflowed: false,
    };
    if corrector.timebase == 0 {
        return Err(CoreError::ReconciliationOverflow("timebase is 0".to_string()));
    }

    let times = match file {
        TimecodeFile::V1 { assumed_fps, runs } => {
            let mut seen = Vec::new();
            let mut times = generate_v1(
                *assumed_fps,
                runs,
                sample_count,
                &mut |fps: f64| corrector.correct(fps),
                &mut seen,
            )?;
            if request.auto_timebase && corrector.overflowed {
                warn!("Falling back to a 1e9 timescale for this timecode");
                corrector.timescale = FALLBACK_TIMESCALE;
                corrector.timebase = fallback_timebase(&seen)?;
                times = generate_v1(
                    *assumed_fps,
                    runs,
                    sample_count,
                    &mut |fps: f64| -> CoreResult<f64> { Ok(fallback_rate(fps)) },
                    &mut Vec::new(),
                )?;
            }
            times
        }
        TimecodeFile::V2 { times } => {
            if times.len() < sample_count {
                return Err(CoreError::TimecodeFormat(format!(
                    "{} timecodes for {} samples",
                    times.len(),
                    sample_count
                )));
            }
            let times = times[..sample_count].to_vec();
            if sample_count > 1 && corrector.auto_timescale {
                let rates: Vec<f64> = times.windows(2).map(|w| 1.0 / (w[1] - w[0])).collect();
                for &fps in &rates {
                    // An overflowing numerator is not fatal here; it pushes the
                    // reconciler onto the fallback timescale instead.
                    match corrector.search(fps) {
                        Some((num, _)) => corrector.absorb(num),
                        None => corrector.overflowed = true,
                    }
                }
                if request.auto_timebase && corrector.overflowed {
                    warn!("Falling back to a 1e9 timescale for this timecode");
                    corrector.timescale = FALLBACK_TIMESCALE;
                    corrector.timebase = fallback_timebase(&rates)?;
                }
            }
            times
        }
    };

    if corrector.overflowed && !request.auto_timebase {
        return Err(CoreError::ReconciliationOverflow(
            "common timescale exceeds 32 bits with a fixed timebase; set the timescale manually"
                .to_string(),
        ));
    }
    let (timescale, timebase) = if corrector.auto_timescale_active() || request.auto_timebase {
        let divisor = gcd(corrector.timebase, corrector.timescale).max(1);
        (corrector.timescale / divisor, corrector.timebase / divisor)
    } else {
        (corrector.timescale, corrector.timebase)
    };
    if timescale == 0 || timescale > MAX_32 || timebase > MAX_32 {
        return Err(CoreError::ReconciliationOverflow(format!(
            "could not derive a timescale (got {}); set one manually",
            timescale
        )));
    }

    let scale = timescale as f64 / timebase as f64;
    let first = times[0];
    let empty_delay = (first * scale + 0.5) as u64 * timebase;
    let mut timestamps = Vec::with_capacity(sample_count);
    timestamps.push(0u64);
    for (i, &time) in times.iter().enumerate().skip(1) {
        let ticks = ((time - first) * scale + 0.5) as u64 * timebase;
        if timestamps.last().is_some_and(|&prev| ticks <= prev) {
            return Err(CoreError::TimecodeFormat(format!(
                "timecode {} does not advance at timescale {}",
                i, timescale
            )));
        }
        timestamps.push(ticks);
    }

    Ok(ReconciledSeries {
        spec: TimescaleSpec { timescale: timescale as u32, timebase: timebase as u32 },
        timestamps,
        empty_delay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto(timebase: u64) -> ReconcileRequest {
        ReconcileRequest { timescale: 0, timebase, auto_timescale: true, auto_timebase: true }
    }

    #[test]
    fn native_timebase_is_gcd_of_all_ticks() {
        let ts = [
            MediaTimestamp::new(0, 2002),
            MediaTimestamp::new(1001, 1001),
            MediaTimestamp::new(2002, 3003),
        ];
        assert_eq!(native_timebase(&ts), 1001);
        assert_eq!(reconcile_native(&ts, 24000).unwrap(), TimescaleSpec { timescale: 24000, timebase: 1001 });
        assert!(reconcile_native(&[MediaTimestamp::new(0, 0)], 24000).is_err());
    }

    #[test]
    fn reduction_is_idempotent() {
        let spec = TimescaleSpec::reduced(48, 2).unwrap();
        assert_eq!(spec, TimescaleSpec { timescale: 24, timebase: 1 });
        let again = TimescaleSpec::reduced(spec.timescale as u64, spec.timebase as u64).unwrap();
        assert_eq!(again, spec);
    }

    #[test]
    fn v1_picks_lcm_of_corrected_numerators() {
        let file = TimecodeFile::parse("# timecode format v1\nAssume 24000/1001\n100,199,30000/1001\n").unwrap();
        let series = reconcile_timecode(&file, 300, auto(1001)).unwrap();
        assert_eq!(series.spec, TimescaleSpec { timescale: 120000, timebase: 1001 });
        // 24000/1001 fps -> 5005 ticks per frame, 30000/1001 fps -> 4004 ticks.
        assert_eq!(series.timestamps[1], 5005);
        assert_eq!(series.timestamps[101] - series.timestamps[100], 4004);
        assert_eq!(series.timestamps[201] - series.timestamps[200], 5005);
        assert_eq!(series.empty_delay, 0);
    }

    #[test]
    fn numerator_overflow_is_an_error() {
        let file = TimecodeFile::parse("# timecode format v1\nAssume 23.976\n").unwrap();
        let err = reconcile_timecode(&file, 10, auto(200_000_000)).unwrap_err();
        assert!(matches!(err, CoreError::ReconciliationOverflow(_)));
    }

    #[test]
    fn v2_round_trips_milliseconds() {
        let ms = [0.0, 33.367, 66.733, 100.1, 133.467, 166.833];
        let text: String = std::iter::once("# timecode format v2".to_string())
            .chain(ms.iter().map(|m| m.to_string()))
            .collect::<Vec<_>>()
            .join("\n");
        let file = TimecodeFile::parse(&text).unwrap();
        let request = ReconcileRequest { timescale: 30000, timebase: 1, auto_timescale: false, auto_timebase: false };
        let series = reconcile_timecode(&file, ms.len(), request).unwrap();
        for (ticks, expected) in series.timestamps.iter().zip(ms) {
            let back = *ticks as f64 * 1000.0 / series.spec.timescale as f64;
            assert!((back - expected).abs() <= 1.0, "{} vs {}", back, expected);
        }
    }

    #[test]
    fn v2_needs_enough_timecodes() {
        let file = TimecodeFile::parse("# timecode format v2\n0\n40\n").unwrap();
        let err = reconcile_timecode(&file, 3, auto(1)).unwrap_err();
        assert!(matches!(err, CoreError::TimecodeFormat(_)));
    }

    #[test]
    fn v2_first_timecode_becomes_empty_delay() {
        let file = TimecodeFile::parse("# timecode format v2\n1000\n1040\n1080\n").unwrap();
        let request = ReconcileRequest { timescale: 1000, timebase: 1, auto_timescale: false, auto_timebase: false };
        let series = reconcile_timecode(&file, 3, request).unwrap();
        assert_eq!(series.empty_delay, 1000);
        assert_eq!(series.timestamps, vec![0, 40, 80]);
    }

    #[test]
    fn v2_auto_timescale_from_intervals() {
        let file = TimecodeFile::parse("# timecode format v2\n0\n40\n80\n120\n").unwrap();
        let series = reconcile_timecode(&file, 4, auto(1)).unwrap();
        assert_eq!(series.spec, TimescaleSpec { timescale: 50, timebase: 1 });
        assert_eq!(series.timestamps, vec![0, 2, 4, 6]);
    }

    #[test]
    fn falls_back_to_high_precision_timescale() {
        // The exact interval rates have no common multiple below 2^32.
        let file = TimecodeFile::parse("# timecode format v2\n0\n33.37\n66.71\n100.13\n133.39\n166.83\n").unwrap();
        let series = reconcile_timecode(&file, 6, auto(1)).unwrap();
        assert_eq!(series.spec, TimescaleSpec { timescale: 100_000, timebase: 1 });
        assert_eq!(series.timestamps, vec![0, 3337, 6671, 10013, 13339, 16683]);
    }

    #[test]
    fn rate_search_stops_at_the_multiplier_limit() {
        let corrector = RateCorrector { timescale: 0, timebase: 1, auto_timescale: true, overflowed: false };
        // 29.97 first lands inside the tolerance at 998/333 of its significand.
        assert_eq!(corrector.search(29.97), Some((9980, 333)));
        // A numerator of 1 would need a multiplier of 1e9.
        assert_eq!(corrector.search(1e-9), None);
    }

    #[test]
    fn vanishing_rate_falls_back_then_reports_overflow() {
        // Frames one billion seconds apart have no 32-bit timescale at all.
        let file = TimecodeFile::parse("# timecode format v2\n0\n1000000000000\n").unwrap();
        let err = reconcile_timecode(&file, 2, auto(1)).unwrap_err();
        assert!(matches!(err, CoreError::ReconciliationOverflow(_)));
    }

    #[test]
    fn overflow_with_fixed_timebase_is_an_error() {
        let file = TimecodeFile::parse("# timecode format v2\n0\n33.37\n66.71\n100.13\n133.39\n166.83\n").unwrap();
        let request = ReconcileRequest { timescale: 0, timebase: 1, auto_timescale: true, auto_timebase: false };
        let err = reconcile_timecode(&file, 6, request).unwrap_err();
        assert!(matches!(err, CoreError::ReconciliationOverflow(_)));
    }
}
