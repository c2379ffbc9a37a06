use crate::world::{WorldConfig, WorldState};

fn is_paddle_collision(ball_y: f64, paddle_y: f64, half_paddle: f64, ball_radius: f64) -> bool {
    (ball_y - paddle_y).abs() <= half_paddle + ball_radius
}

fn clamp_direction(direction: i32) -> f64 {
    match direction.signum() {
        1 => 1.0,
        -1 => -1.0,
        _ => 0.0,
    }
}

/// Advances `state` in place by `dt_seconds`. Order matches the reference
/// physics step exactly: paddles, ball translation, wall reflection, paddle
/// reflection, scoring. Does not touch `state.tick`; the caller owns that.
pub fn advance(state: &mut WorldState, config: &WorldConfig, dt_seconds: f64) {
    let half_paddle = config.paddle_height / 2.0;

    state.left_paddle_y += clamp_direction(state.left_direction) * config.paddle_speed * dt_seconds;
    state.right_paddle_y +=
        clamp_direction(state.right_direction) * config.paddle_speed * dt_seconds;

    state.left_paddle_y = state
        .left_paddle_y
        .clamp(half_paddle, config.height - half_paddle);
    state.right_paddle_y = state
        .right_paddle_y
        .clamp(half_paddle, config.height - half_paddle);

    state.ball_x += state.ball_vx * dt_seconds;
    state.ball_y += state.ball_vy * dt_seconds;

    if state.ball_y <= config.ball_radius {
        state.ball_y = config.ball_radius;
        state.ball_vy = state.ball_vy.abs();
    } else if state.ball_y >= config.height - config.ball_radius {
        state.ball_y = config.height - config.ball_radius;
        state.ball_vy = -state.ball_vy.abs();
    }

    let left_paddle_x = config.paddle_x_offset + config.paddle_width / 2.0;
    let right_paddle_x = config.width - config.paddle_x_offset - config.paddle_width / 2.0;

    if state.ball_vx < 0.0
        && state.ball_x - config.ball_radius <= left_paddle_x
        && is_paddle_collision(state.ball_y, state.left_paddle_y, half_paddle, config.ball_radius)
    {
        state.ball_x = left_paddle_x + config.ball_radius;
        let relative = ((state.ball_y - state.left_paddle_y) / half_paddle).clamp(-1.0, 1.0);
        state.ball_vy = relative * config.ball_speed * 0.75;
        let vy_sq = state.ball_vy * state.ball_vy;
        state.ball_vx = (config.ball_speed * config.ball_speed - vy_sq).max(0.0).sqrt();
    }

    if state.ball_vx > 0.0
        && state.ball_x + config.ball_radius >= right_paddle_x
        && is_paddle_collision(state.ball_y, state.right_paddle_y, half_paddle, config.ball_radius)
    {
        state.ball_x = right_paddle_x - config.ball_radius;
        let relative = ((state.ball_y - state.right_paddle_y) / half_paddle).clamp(-1.0, 1.0);
        state.ball_vy = relative * config.ball_speed * 0.75;
        let vy_sq = state.ball_vy * state.ball_vy;
        state.ball_vx = -(config.ball_speed * config.ball_speed - vy_sq).max(0.0).sqrt();
    }

    if state.ball_x < -config.ball_radius {
        state.right_score += 1;
        state.ball_x = config.width / 2.0;
        state.ball_y = config.height / 2.0;
        state.ball_vx = config.ball_speed;
        state.ball_vy = 0.0;
    } else if state.ball_x > config.width + config.ball_radius {
        state.left_score += 1;
        state.ball_x = config.width / 2.0;
        state.ball_y = config.height / 2.0;
        state.ball_vx = -config.ball_speed;
        state.ball_vy = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldConfig;

    #[test]
    fn paddle_hit_reflects_and_preserves_speed() {
        let config = WorldConfig::default();
        let left_paddle_x = config.paddle_x_offset + config.paddle_width / 2.0;
        let mut state = WorldState {
            ball_x: left_paddle_x + 0.1,
            ball_y: config.height / 2.0 + config.paddle_height / 4.0,
            ball_vx: -100.0,
            ball_vy: 0.0,
            left_paddle_y: config.height / 2.0,
            right_paddle_y: config.height / 2.0,
            ..Default::default()
        };

        advance(&mut state, &config, 1.0 / 60.0);

        assert!(state.ball_vx > 0.0);
        assert!(state.ball_vy > 0.0);
        let speed_sq = state.ball_vx * state.ball_vx + state.ball_vy * state.ball_vy;
        assert!((speed_sq - config.ball_speed * config.ball_speed).abs() < 1e-9);
    }

    #[test]
    fn scoring_resets_ball_and_serves_toward_loser() {
        let config = WorldConfig::default();
        let mut state = WorldState {
            ball_x: config.width + config.ball_radius + 1.0,
            ball_y: config.height / 2.0,
            ball_vx: config.ball_speed,
            ball_vy: 0.0,
            left_score: 0,
            right_score: 0,
            ..Default::default()
        };

        advance(&mut state, &config, 1.0 / 60.0);

        assert_eq!(state.left_score, 1);
        assert_eq!(state.ball_x, config.width / 2.0);
        assert_eq!(state.ball_vx, -config.ball_speed);
        assert_eq!(state.ball_vy, 0.0);
    }

    #[test]
    fn same_inputs_yield_same_next_state() {
        let config = WorldConfig::default();
        let base = WorldState {
            ball_x: 400.0,
            ball_y: 200.0,
            ball_vx: 120.0,
            ball_vy: -30.0,
            left_paddle_y: 240.0,
            right_paddle_y: 240.0,
            left_direction: 1,
            right_direction: -1,
            ..Default::default()
        };

        let mut a = base;
        let mut b = base;
        advance(&mut a, &config, 1.0 / 60.0);
        advance(&mut b, &config, 1.0 / 60.0);
        assert_eq!(a, b);
    }
}
