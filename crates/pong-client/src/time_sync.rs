const DEFAULT_ALPHA: f64 = 0.1;
const DEFAULT_MAX_SLEW: f64 = 0.5;

/// Tracks the offset between the local and server tick clocks with a pair of
/// exponential moving averages: a raw offset that reacts immediately to each
/// observation, and a smoothed offset that chases it at no more than
/// `max_slew` per second of local time. `target` is the value a caller should
/// actually clock its presentation off of; it is monotonic under monotonic
/// input because the smoothed offset only ever moves toward the raw one.
pub struct TimeSync {
    alpha: f64,
    max_slew: f64,
    offset_estimate: f64,
    smoothed_offset: f64,
    last_target_local: f64,
    has_observation: bool,
}

impl TimeSync {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_ALPHA, DEFAULT_MAX_SLEW)
    }

    pub fn with_params(alpha: f64, max_slew: f64) -> Self {
        Self {
            alpha,
            max_slew,
            offset_estimate: 0.0,
            smoothed_offset: 0.0,
            last_target_local: 0.0,
            has_observation: false,
        }
    }

    /// Folds one `(local_tick, server_tick)` pair into both EMAs. The first
    /// observation seeds both estimates exactly, with no smoothing.
    pub fn observe(&mut self, local_tick: f64, server_tick: f64) {
        let measurement = server_tick - local_tick;
        if !self.has_observation {
            self.offset_estimate = measurement;
            self.smoothed_offset = measurement;
            self.has_observation = true;
        } else {
            self.offset_estimate = (1.0 - self.alpha) * self.offset_estimate + self.alpha * measurement;
            self.smoothed_offset = (1.0 - self.alpha) * self.smoothed_offset + self.alpha * measurement;
        }
    }

    /// Returns the server-clock equivalent of `local_tick_now`, slew-limiting
    /// the smoothed offset toward the raw offset by at most `max_slew` per
    /// second of local time elapsed since the previous call. Before any
    /// observation, returns `local_tick_now` unchanged.
    pub fn target(&mut self, local_tick_now: f64) -> f64 {
        if !self.has_observation {
            return local_tick_now;
        }

        let delta_local = (local_tick_now - self.last_target_local).max(0.0);
        let max_adjust = self.max_slew * delta_local;
        let delta_offset = self.offset_estimate - self.smoothed_offset;
        let clamped_adjust = delta_offset.clamp(-max_adjust, max_adjust);
        self.smoothed_offset += clamped_adjust;
        self.last_target_local = local_tick_now;
        local_tick_now + self.smoothed_offset
    }

    pub fn offset(&self) -> f64 {
        self.offset_estimate
    }
}

impl Default for TimeSync {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_taken_as_is() {
        let mut sync = TimeSync::new();
        sync.observe(0.0, 5.0);
        assert!((sync.offset() - 5.0).abs() < 1e-9);
        assert!((sync.target(0.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn target_reflects_the_latest_offset_right_after_an_observation() {
        // observe() folds the same measurement into both the raw and the
        // smoothed offset with the same EMA, so they stay in lockstep and a
        // fresh observation is visible in target() immediately rather than
        // waiting for a slew to catch up.
        let mut sync = TimeSync::with_params(0.1, 0.5);
        sync.observe(0.0, 5.0);
        sync.target(0.0);
        sync.observe(1.0, 200.0);

        let target = sync.target(1.0);
        assert!((target - sync.offset() - 1.0).abs() < 1e-9, "target = {target}");
    }

    #[test]
    fn target_before_any_observation_passes_local_time_through() {
        let mut sync = TimeSync::new();
        assert!((sync.target(42.0) - 42.0).abs() < 1e-9);
    }

    #[test]
    fn target_does_not_let_local_time_run_backward_widen_the_slew_window() {
        let mut sync = TimeSync::with_params(0.1, 0.5);
        sync.observe(0.0, 5.0);
        sync.target(10.0);
        // A local clock that appears to regress must not let the next call
        // treat the elapsed time as negative and compute a larger max_adjust
        // than actually elapsed.
        let target = sync.target(5.0);
        assert!((target - sync.offset() - 5.0).abs() < 1e-9, "target = {target}");
    }

    #[test]
    fn target_is_monotonic_under_monotonic_input() {
        let mut sync = TimeSync::new();
        sync.observe(0.0, 3.0);
        let mut previous = sync.target(0.0);
        for step in 1..200 {
            let local_tick = step as f64 * 0.1;
            sync.observe(local_tick, local_tick + 10.0);
            let next = sync.target(local_tick);
            assert!(next >= previous, "target regressed at step {step}: {previous} -> {next}");
            previous = next;
        }
    }

    #[test]
    fn converges_toward_a_steady_offset() {
        let mut sync = TimeSync::new();
        let mut target = 0.0;
        for step in 0..500 {
            let local_tick = step as f64 * 0.1;
            sync.observe(local_tick, local_tick + 3.0);
            target = sync.target(local_tick);
        }
        assert!((target - (49.9 + 3.0)).abs() < 0.05, "target = {target}");
    }
}
