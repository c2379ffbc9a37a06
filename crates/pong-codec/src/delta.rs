use crate::error::Result;
use bytes::Bytes;
use pong_binary::{BinaryReader, BinaryWriter};
use pong_sim::WorldState;

/// Fixed-layout keyframe/delta wire encoder, field order per spec §4.4:
/// ball x/y/vx/vy, left/right paddle y, left/right score, left/right
/// direction.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeltaCodec;

impl DeltaCodec {
    pub fn encode_keyframe(&self, state: &WorldState) -> Bytes {
        let mut writer = BinaryWriter::with_capacity(34);
        write_absolute(&mut writer, state);
        writer.freeze()
    }

    pub fn decode_keyframe(&self, data: &Bytes, tick: u64) -> Result<WorldState> {
        let mut reader = BinaryReader::new(data.clone());
        let mut state = read_absolute(&mut reader)?;
        state.tick = tick;
        Ok(state)
    }

    pub fn encode_delta(&self, base: &WorldState, state: &WorldState) -> Bytes {
        let mut writer = BinaryWriter::with_capacity(28);
        write_delta(&mut writer, base, state);
        writer.freeze()
    }

    pub fn apply_delta(&self, base: &WorldState, delta: &Bytes, tick: u64) -> Result<WorldState> {
        let mut reader = BinaryReader::new(delta.clone());
        let mut state = apply_delta_fields(base, &mut reader)?;
        state.tick = tick;
        Ok(state)
    }
}

fn write_absolute(writer: &mut BinaryWriter, state: &WorldState) {
    writer.write_f32_le(state.ball_x as f32).unwrap();
    writer.write_f32_le(state.ball_y as f32).unwrap();
    writer.write_f32_le(state.ball_vx as f32).unwrap();
    writer.write_f32_le(state.ball_vy as f32).unwrap();
    writer.write_f32_le(state.left_paddle_y as f32).unwrap();
    writer.write_f32_le(state.right_paddle_y as f32).unwrap();
    writer.write_u32_le(state.left_score).unwrap();
    writer.write_u32_le(state.right_score).unwrap();
    writer.write_i8(state.left_direction as i8).unwrap();
    writer.write_i8(state.right_direction as i8).unwrap();
}

fn read_absolute(reader: &mut BinaryReader) -> Result<WorldState> {
    Ok(WorldState {
        ball_x: reader.read_f32_le()? as f64,
        ball_y: reader.read_f32_le()? as f64,
        ball_vx: reader.read_f32_le()? as f64,
        ball_vy: reader.read_f32_le()? as f64,
        left_paddle_y: reader.read_f32_le()? as f64,
        right_paddle_y: reader.read_f32_le()? as f64,
        left_score: reader.read_u32_le()?,
        right_score: reader.read_u32_le()?,
        left_direction: reader.read_i8()? as i32,
        right_direction: reader.read_i8()? as i32,
        tick: 0,
    })
}

fn write_delta(writer: &mut BinaryWriter, base: &WorldState, state: &WorldState) {
    writer.write_f32_le((state.ball_x - base.ball_x) as f32).unwrap();
    writer.write_f32_le((state.ball_y - base.ball_y) as f32).unwrap();
    writer.write_f32_le((state.ball_vx - base.ball_vx) as f32).unwrap();
    writer.write_f32_le((state.ball_vy - base.ball_vy) as f32).unwrap();
    writer
        .write_f32_le((state.left_paddle_y - base.left_paddle_y) as f32)
        .unwrap();
    writer
        .write_f32_le((state.right_paddle_y - base.right_paddle_y) as f32)
        .unwrap();
    writer
        .write_i16_le((state.left_score as i64 - base.left_score as i64) as i16)
        .unwrap();
    writer
        .write_i16_le((state.right_score as i64 - base.right_score as i64) as i16)
        .unwrap();
    writer.write_i8(state.left_direction as i8).unwrap();
    writer.write_i8(state.right_direction as i8).unwrap();
}

fn apply_delta_fields(base: &WorldState, reader: &mut BinaryReader) -> Result<WorldState> {
    let mut state = *base;
    state.ball_x += reader.read_f32_le()? as f64;
    state.ball_y += reader.read_f32_le()? as f64;
    state.ball_vx += reader.read_f32_le()? as f64;
    state.ball_vy += reader.read_f32_le()? as f64;
    state.left_paddle_y += reader.read_f32_le()? as f64;
    state.right_paddle_y += reader.read_f32_le()? as f64;
    state.left_score = (base.left_score as i64 + reader.read_i16_le()? as i64) as u32;
    state.right_score = (base.right_score as i64 + reader.read_i16_le()? as i64) as u32;
    state.left_direction = reader.read_i8()? as i32;
    state.right_direction = reader.read_i8()? as i32;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64) -> WorldState {
        WorldState {
            ball_x: 412.25,
            ball_y: 88.5,
            ball_vx: -120.0,
            ball_vy: 40.0,
            left_paddle_y: 240.0,
            right_paddle_y: 100.0,
            left_score: 3,
            right_score: 7,
            tick,
            left_direction: 1,
            right_direction: -1,
        }
    }

    #[test]
    fn keyframe_round_trips_exactly() {
        let codec = DeltaCodec;
        let state = sample(42);
        let encoded = codec.encode_keyframe(&state);
        let decoded = codec.decode_keyframe(&encoded, 42).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn delta_round_trips_exactly() {
        let codec = DeltaCodec;
        let base = sample(10);
        let mut next = sample(11);
        next.ball_x += 5.0;
        next.left_score += 1;

        let delta = codec.encode_delta(&base, &next);
        let decoded = codec.apply_delta(&base, &delta, 11).unwrap();
        assert_eq!(decoded, next);
    }
}
