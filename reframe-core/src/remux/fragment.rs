//! Movie fragment boundary state.
//!
//! A fragmented run starts with a flush pending, so the very first step cuts
//! an empty leading fragment. After that a boundary becomes pending when the
//! base track offers a random-access point at least `min_duration` seconds
//! after the previous boundary, or when any track switches sample description.

/// Accumulating/pending-flush state of the fragment controller.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentState {
    /// Scheduler lane of the base track. `None` when not fragmenting.
    base_lane: Option<usize>,
    /// Seconds. 0 means any random-access point cuts.
    min_duration: f64,
    pending_flush: bool,
    /// Reference time of the pending (or last) boundary, in seconds.
    base_dts: f64,
}

impl FragmentState {
    pub fn disabled() -> Self {
        Self { base_lane: None, min_duration: 0.0, pending_flush: false, base_dts: 0.0 }
    }

    pub fn new(base_lane: usize, min_duration: f64) -> Self {
        Self { base_lane: Some(base_lane), min_duration, pending_flush: true, base_dts: 0.0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_lane.is_some()
    }

    pub fn is_base_lane(&self, lane: usize) -> bool {
        self.base_lane == Some(lane)
    }

    pub fn is_pending(&self) -> bool {
        self.pending_flush
    }

    pub fn base_dts(&self) -> f64 {
        self.base_dts
    }

    /// Whether a sample of `lane` at `seconds` opens a new boundary.
    pub fn is_boundary(&self, lane: usize, is_rap: bool, seconds: f64) -> bool {
        self.is_base_lane(lane)
            && is_rap
            && (self.min_duration == 0.0 || seconds - self.base_dts >= self.min_duration)
    }

    pub fn begin_pending(&mut self, at: f64) {
        self.pending_flush = true;
        self.base_dts = at;
    }

    pub fn complete_flush(&mut self) {
        self.pending_flush = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_a_pending_leading_flush() {
        let state = FragmentState::new(0, 2.0);
        assert!(state.is_enabled());
        assert!(state.is_pending());
        assert!(!FragmentState::disabled().is_pending());
    }

    #[test]
    fn minimum_duration_gates_boundaries() {
        let mut state = FragmentState::new(0, 2.0);
        state.complete_flush();
        assert!(!state.is_boundary(0, true, 0.0));
        assert!(!state.is_boundary(0, true, 1.9));
        assert!(!state.is_boundary(0, false, 2.1));
        assert!(!state.is_boundary(1, true, 2.1), "only the base lane cuts");
        assert!(state.is_boundary(0, true, 2.1));

        state.begin_pending(2.1);
        state.complete_flush();
        assert!(!state.is_boundary(0, true, 4.0));
        assert!(state.is_boundary(0, true, 4.3));
    }

    #[test]
    fn zero_minimum_cuts_on_every_rap() {
        let state = FragmentState::new(2, 0.0);
        assert!(state.is_boundary(2, true, 0.0));
        assert!(state.is_boundary(2, true, 0.04));
    }
}
