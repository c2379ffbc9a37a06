use crate::physics;
use crate::player::PlayerSide;
use std::sync::Mutex;

/// Arena dimensions and speeds; immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub paddle_width: f64,
    pub paddle_height: f64,
    pub ball_radius: f64,
    pub paddle_speed: f64,
    pub ball_speed: f64,
    pub paddle_x_offset: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 480.0,
            paddle_width: 12.0,
            paddle_height: 96.0,
            ball_radius: 8.0,
            paddle_speed: 420.0,
            ball_speed: 380.0,
            paddle_x_offset: 32.0,
        }
    }
}

/// A value snapshot of the arena at one tick. `step`/`snapshot` return this
/// by value; nothing here is shared or reference-counted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldState {
    pub ball_x: f64,
    pub ball_y: f64,
    pub ball_vx: f64,
    pub ball_vy: f64,
    pub left_paddle_y: f64,
    pub right_paddle_y: f64,
    pub left_score: u32,
    pub right_score: u32,
    pub tick: u64,
    pub left_direction: i32,
    pub right_direction: i32,
}

/// Deterministic, single-arena physics simulation. No I/O, no clock of its
/// own: callers drive it with an externally measured `dt_seconds`.
pub struct World {
    config: WorldConfig,
    state: Mutex<WorldState>,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        let state = WorldState {
            ball_x: config.width / 2.0,
            ball_y: config.height / 2.0,
            ball_vx: config.ball_speed,
            ball_vy: 0.0,
            left_paddle_y: config.height / 2.0,
            right_paddle_y: config.height / 2.0,
            ..Default::default()
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Clamps `direction` to `{-1, 0, 1}` and stores it; takes effect on the
    /// next `step`.
    pub fn set_player_input(&self, side: PlayerSide, direction: i32) {
        let clamped = direction.clamp(-1, 1);
        let mut state = self.state.lock().expect("world mutex poisoned");
        match side {
            PlayerSide::Left => state.left_direction = clamped,
            PlayerSide::Right => state.right_direction = clamped,
            PlayerSide::Spectator => {}
        }
    }

    /// Advances physics by exactly `dt_seconds`, increments the tick, and
    /// returns the post-step state.
    pub fn step(&self, dt_seconds: f64) -> WorldState {
        let mut state = self.state.lock().expect("world mutex poisoned");
        physics::advance(&mut state, &self.config, dt_seconds);
        state.tick += 1;
        *state
    }

    pub fn snapshot(&self) -> WorldState {
        *self.state.lock().expect("world mutex poisoned")
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
