use log::debug;
use pong_sim::WorldState;
use std::collections::VecDeque;

const DEFAULT_EPSILON: f64 = 0.5;
const DEFAULT_CAPACITY: usize = 256;

/// Outcome of comparing one predicted tick against the authoritative state
/// the server actually produced for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconciliationResult {
    pub needs_correction: bool,
    pub position_error: f64,
    pub corrected_ticks: u64,
}

/// Keeps the client's own predicted history so an incoming authoritative
/// snapshot can be compared against what was actually predicted for that
/// tick, rather than the client's current (already-advanced) state.
pub struct Reconciler {
    epsilon: f64,
    capacity: usize,
    history: VecDeque<WorldState>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_EPSILON, DEFAULT_CAPACITY)
    }

    pub fn with_params(epsilon: f64, capacity: usize) -> Self {
        Self {
            epsilon,
            capacity: capacity.max(1),
            history: VecDeque::new(),
        }
    }

    pub fn record_prediction(&mut self, state: WorldState) {
        self.history.push_back(state);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Compares `authoritative` against the recorded prediction for the same
    /// tick. If the max of ball-position error and either paddle's error
    /// exceeds `epsilon`, the caller should reseed its predictor from
    /// `authoritative` and replay `corrected_ticks` worth of local input.
    /// Returns a no-op result if no prediction was recorded for that tick
    /// (e.g. after a fresh connect), after dropping any predictions now
    /// older than `authoritative`.
    pub fn reconcile(&mut self, authoritative: WorldState) -> ReconciliationResult {
        let Some(predicted) = self
            .history
            .iter()
            .find(|s| s.tick == authoritative.tick)
            .copied()
        else {
            while matches!(self.history.front(), Some(s) if s.tick < authoritative.tick) {
                self.history.pop_front();
            }
            return ReconciliationResult {
                needs_correction: false,
                position_error: 0.0,
                corrected_ticks: 0,
            };
        };

        let ball_error = ((predicted.ball_x - authoritative.ball_x).powi(2)
            + (predicted.ball_y - authoritative.ball_y).powi(2))
        .sqrt();
        let left_error = (predicted.left_paddle_y - authoritative.left_paddle_y).abs();
        let right_error = (predicted.right_paddle_y - authoritative.right_paddle_y).abs();
        let position_error = ball_error.max(left_error).max(right_error);
        let needs_correction = position_error > self.epsilon;

        let corrected_ticks = if needs_correction {
            self.history
                .iter()
                .filter(|s| s.tick >= authoritative.tick)
                .count() as u64
        } else {
            0
        };

        if needs_correction {
            debug!(
                "reconciling tick {}: position_error={position_error:.3} replaying {corrected_ticks} ticks",
                authoritative.tick
            );
        }

        // Drop predictions up to and including the authoritative tick,
        // unconditionally — this runs whether or not a correction fires.
        self.history.retain(|s| s.tick > authoritative.tick);

        ReconciliationResult {
            needs_correction,
            position_error,
            corrected_ticks,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tick: u64, ball_x: f64, ball_y: f64, left_paddle_y: f64) -> WorldState {
        WorldState {
            ball_x,
            ball_y,
            left_paddle_y,
            right_paddle_y: 240.0,
            tick,
            ..Default::default()
        }
    }

    #[test]
    fn small_divergence_stays_below_epsilon() {
        let mut reconciler = Reconciler::new();
        reconciler.record_prediction(state(5, 400.2, 240.1, 240.0));

        let result = reconciler.reconcile(state(5, 400.0, 240.0, 240.0));
        assert!(!result.needs_correction);
        assert_eq!(result.corrected_ticks, 0);
        assert!(result.position_error < 0.5);
    }

    #[test]
    fn large_divergence_triggers_correction_and_counts_replay_ticks() {
        let mut reconciler = Reconciler::new();
        reconciler.record_prediction(state(5, 390.0, 240.0, 240.0));
        reconciler.record_prediction(state(6, 392.0, 240.0, 240.0));
        reconciler.record_prediction(state(7, 394.0, 240.0, 240.0));

        let result = reconciler.reconcile(state(5, 400.0, 240.0, 240.0));
        assert!(result.needs_correction);
        assert!((result.position_error - 10.0).abs() < 1e-9);
        assert_eq!(result.corrected_ticks, 3);
    }

    #[test]
    fn missing_prediction_is_a_no_op() {
        let mut reconciler = Reconciler::new();
        let result = reconciler.reconcile(state(99, 0.0, 0.0, 0.0));
        assert!(!result.needs_correction);
        assert_eq!(result.corrected_ticks, 0);
    }
}
