use crate::error::{ClientError, Result};
use pong_sim::{physics, WorldConfig, WorldState};

/// Runs the same deterministic step function the server uses, locally and
/// ahead of the server's authoritative tick, so input feels immediate. Must
/// be seeded with [`Predictor::reset`] before the first [`Predictor::predict`];
/// calling it unseeded is a caller bug, not a recoverable condition.
pub struct Predictor {
    config: WorldConfig,
    state: Option<WorldState>,
}

impl Predictor {
    pub fn new(config: WorldConfig) -> Self {
        Self { config, state: None }
    }

    /// Seeds (or re-seeds, after a reconciliation correction) the predicted
    /// state from an authoritative snapshot.
    pub fn reset(&mut self, state: WorldState) {
        self.state = Some(state);
    }

    /// Advances the predicted state by one local frame, recording the
    /// player's own input before stepping. Errors if [`Predictor::reset`]
    /// was never called.
    pub fn predict(&mut self, dt_seconds: f64, left_direction: i32, right_direction: i32) -> Result<WorldState> {
        let state = self.state.as_mut().ok_or(ClientError::NotSeeded)?;
        state.left_direction = left_direction;
        state.right_direction = right_direction;
        physics::advance(state, &self.config, dt_seconds);
        state.tick += 1;
        Ok(*state)
    }

    pub fn last_prediction(&self) -> Option<WorldState> {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_before_reset_errors() {
        let mut predictor = Predictor::new(WorldConfig::default());
        let err = predictor.predict(1.0 / 60.0, 0, 0).unwrap_err();
        assert!(matches!(err, ClientError::NotSeeded));
    }

    #[test]
    fn predict_advances_tick_after_reset() {
        let config = WorldConfig::default();
        let mut predictor = Predictor::new(config);
        predictor.reset(WorldState {
            left_paddle_y: config.height / 2.0,
            right_paddle_y: config.height / 2.0,
            ball_x: config.width / 2.0,
            ball_y: config.height / 2.0,
            ball_vx: config.ball_speed,
            tick: 10,
            ..Default::default()
        });

        let predicted = predictor.predict(1.0 / 60.0, 1, -1).unwrap();
        assert_eq!(predicted.tick, 11);
        assert_eq!(predictor.last_prediction().unwrap().tick, 11);
    }
}
