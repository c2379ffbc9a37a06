use crate::delta::DeltaCodec;
use crate::error::{CodecError, Result};
use bytes::Bytes;
use pong_sim::WorldState;
use std::collections::VecDeque;

/// A single encoded update, ready to hand to the transport layer. `is_keyframe`
/// tells the receiver whether `payload` is self-contained or must be applied
/// against its own copy of `base_tick`.
#[derive(Debug, Clone)]
pub struct EncodedSnapshot {
    pub tick: u64,
    pub base_tick: u64,
    pub is_keyframe: bool,
    pub payload: Bytes,
}

const DEFAULT_KEYFRAME_INTERVAL: u64 = 20;
const DEFAULT_GENERATOR_HISTORY: usize = 256;
const DEFAULT_DECODER_HISTORY: usize = 120;

/// Server-side: turns successive `WorldState`s into a stream of keyframes and
/// deltas. Every delta is encoded against the most recent keyframe, never
/// against whatever tick happened to precede it, so a client that missed one
/// or more deltas can always resync once it has that keyframe.
pub struct SnapshotGenerator {
    codec: DeltaCodec,
    keyframe_interval: u64,
    history_size: usize,
    history: VecDeque<WorldState>,
    last_keyframe: Option<WorldState>,
}

impl SnapshotGenerator {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_KEYFRAME_INTERVAL, DEFAULT_GENERATOR_HISTORY)
    }

    pub fn with_params(keyframe_interval: u64, history_size: usize) -> Self {
        Self {
            codec: DeltaCodec,
            keyframe_interval: keyframe_interval.max(1),
            history_size: history_size.max(1),
            history: VecDeque::new(),
            last_keyframe: None,
        }
    }

    /// Encodes `state`, choosing a keyframe whenever the tick lands on the
    /// keyframe cadence or no keyframe has been emitted yet. Every delta is
    /// based on `last_keyframe`, never on the previous call's output.
    pub fn encode(&mut self, state: WorldState) -> EncodedSnapshot {
        if state.tick % self.keyframe_interval == 0 || self.last_keyframe.is_none() {
            return self.encode_keyframe(state);
        }

        let base = self.last_keyframe.expect("checked above");
        let encoded = EncodedSnapshot {
            tick: state.tick,
            base_tick: base.tick,
            is_keyframe: false,
            payload: self.codec.encode_delta(&base, &state),
        };
        self.store_state(state);
        encoded
    }

    pub fn encode_keyframe(&mut self, state: WorldState) -> EncodedSnapshot {
        let encoded = EncodedSnapshot {
            tick: state.tick,
            base_tick: state.tick,
            is_keyframe: true,
            payload: self.codec.encode_keyframe(&state),
        };
        self.store_state(state);
        self.last_keyframe = Some(state);
        encoded
    }

    pub fn find_state(&self, tick: u64) -> Option<WorldState> {
        self.history.iter().rev().find(|s| s.tick == tick).copied()
    }

    fn store_state(&mut self, state: WorldState) {
        self.history.push_back(state);
        self.prune_history();
    }

    fn prune_history(&mut self) {
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
    }
}

impl Default for SnapshotGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side counterpart: reassembles `WorldState`s from a stream of
/// `EncodedSnapshot`s, keeping its own trailing history to apply deltas
/// against.
pub struct SnapshotDecoder {
    codec: DeltaCodec,
    history_size: usize,
    history: VecDeque<WorldState>,
}

impl SnapshotDecoder {
    pub fn new() -> Self {
        Self::with_history_size(DEFAULT_DECODER_HISTORY)
    }

    pub fn with_history_size(history_size: usize) -> Self {
        Self {
            codec: DeltaCodec,
            history_size: history_size.max(1),
            history: VecDeque::new(),
        }
    }

    pub fn apply(&mut self, snapshot: &EncodedSnapshot) -> Result<WorldState> {
        let state = if snapshot.is_keyframe {
            self.codec.decode_keyframe(&snapshot.payload, snapshot.tick)?
        } else {
            let base = self.find_state(snapshot.base_tick).ok_or(CodecError::MissingBaseState {
                tick: snapshot.tick,
                base_tick: snapshot.base_tick,
            })?;
            self.codec.apply_delta(&base, &snapshot.payload, snapshot.tick)?
        };

        self.store_state(state);
        Ok(state)
    }

    pub fn find_state(&self, tick: u64) -> Option<WorldState> {
        self.history.iter().rev().find(|s| s.tick == tick).copied()
    }

    fn store_state(&mut self, state: WorldState) {
        self.history.push_back(state);
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
    }
}

impl Default for SnapshotDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tick: u64, ball_x: f64) -> WorldState {
        WorldState {
            ball_x,
            ball_y: 240.0,
            ball_vx: 100.0,
            ball_vy: 0.0,
            left_paddle_y: 240.0,
            right_paddle_y: 240.0,
            left_score: 0,
            right_score: 0,
            tick,
            left_direction: 0,
            right_direction: 0,
        }
    }

    #[test]
    fn emits_a_keyframe_every_interval_ticks() {
        let mut generator = SnapshotGenerator::with_params(20, 256);
        for tick in 0..45 {
            let snapshot = generator.encode(state(tick, 400.0 + tick as f64));
            let expected_keyframe = tick % 20 == 0;
            assert_eq!(snapshot.is_keyframe, expected_keyframe, "tick {tick}");
        }
    }

    #[test]
    fn every_delta_bases_on_the_last_keyframe_not_the_prior_tick() {
        let mut generator = SnapshotGenerator::with_params(20, 256);
        for tick in 0..20 {
            let snapshot = generator.encode(state(tick, 400.0 + tick as f64));
            let expected_base = (tick / 20) * 20;
            assert_eq!(snapshot.base_tick, expected_base, "tick {tick}");
        }
    }

    #[test]
    fn decoder_reconstructs_the_generator_stream() {
        let mut generator = SnapshotGenerator::with_params(20, 256);
        let mut decoder = SnapshotDecoder::with_history_size(120);

        for tick in 0..50 {
            let original = state(tick, 400.0 + tick as f64 * 1.5);
            let snapshot = generator.encode(original);
            let decoded = decoder.apply(&snapshot).unwrap();
            assert!((decoded.ball_x - original.ball_x).abs() < 1e-3, "tick {tick}");
            assert_eq!(decoded.tick, original.tick);
        }
    }

    #[test]
    fn delta_against_unknown_base_is_rejected() {
        let mut decoder = SnapshotDecoder::with_history_size(120);
        let bogus = EncodedSnapshot {
            tick: 5,
            base_tick: 4,
            is_keyframe: false,
            payload: Bytes::new(),
        };
        let err = decoder.apply(&bogus).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MissingBaseState { tick: 5, base_tick: 4 }
        ));
    }
}
