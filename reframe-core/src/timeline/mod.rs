//! Timescale reconciliation and timeline editing.
//!
//! `reconcile` turns native ticks or a timecode file into one reduced
//! (timescale, timebase) pair and a tick per sample. `editor` builds the
//! final DTS/CTS of a track from those ticks and the matching edit list.

pub mod editor;
pub mod rational;
pub mod reconcile;
pub mod reorder;
pub mod timecode;

pub use editor::{RetimedTrack, edit_list, retime};
pub use rational::{Rational, gcd, lcm, rescale};
pub use reconcile::{
    ReconcileRequest, ReconciledSeries, TimescaleSpec, reconcile_native, reconcile_timecode,
};
pub use timecode::{FrameRateRun, TimecodeFile};
