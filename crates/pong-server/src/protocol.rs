use bytes::Bytes;
use pong_binary::{BinaryError, BinaryReader, BinaryWriter};
use pong_sim::PlayerSide;
use thiserror::Error;

pub const TAG_INPUT: u8 = 1;
pub const TAG_SNAPSHOT: u8 = 2;
pub const TAG_SERVER_ACK: u8 = 3;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unknown message tag {0:#04x}")]
    UnknownTag(u8),
    #[error("truncated message body: {0}")]
    Truncated(#[from] BinaryError),
}

#[derive(Debug, Clone)]
pub struct Input {
    pub client_seq: u32,
    pub timestamp_ns: u64,
    pub dx: i32,
    pub dy: i32,
    pub fire: bool,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tick: u32,
    pub is_keyframe: bool,
    pub base_tick: u32,
    pub state: Bytes,
    pub role: PlayerSide,
}

#[derive(Debug, Clone, Copy)]
pub struct ServerAck {
    pub last_client_seq: u32,
    pub server_tick: u32,
}

#[derive(Debug, Clone)]
pub enum Message {
    Input(Input),
    Snapshot(Snapshot),
    ServerAck(ServerAck),
}

fn role_to_u8(role: PlayerSide) -> u8 {
    match role {
        PlayerSide::Left => 0,
        PlayerSide::Right => 1,
        PlayerSide::Spectator => 2,
    }
}

fn role_from_u8(value: u8) -> PlayerSide {
    match value {
        0 => PlayerSide::Left,
        1 => PlayerSide::Right,
        _ => PlayerSide::Spectator,
    }
}

impl Message {
    pub fn encode(&self) -> Bytes {
        let mut writer = BinaryWriter::new();
        match self {
            Message::Input(input) => {
                writer.write_u8(TAG_INPUT).unwrap();
                writer.write_u32(input.client_seq).unwrap();
                writer.write_u64(input.timestamp_ns).unwrap();
                writer.write_i32(input.dx).unwrap();
                writer.write_i32(input.dy).unwrap();
                writer.write_bool(input.fire).unwrap();
            }
            Message::Snapshot(snapshot) => {
                writer.write_u8(TAG_SNAPSHOT).unwrap();
                writer.write_u32(snapshot.tick).unwrap();
                writer.write_bool(snapshot.is_keyframe).unwrap();
                writer.write_u32(snapshot.base_tick).unwrap();
                writer.write_u8(role_to_u8(snapshot.role)).unwrap();
                writer.write_u16(snapshot.state.len() as u16).unwrap();
                writer.write_bytes(&snapshot.state).unwrap();
            }
            Message::ServerAck(ack) => {
                writer.write_u8(TAG_SERVER_ACK).unwrap();
                writer.write_u32(ack.last_client_seq).unwrap();
                writer.write_u32(ack.server_tick).unwrap();
            }
        }
        writer.freeze()
    }

    pub fn decode(data: Bytes) -> Result<Self, ParseError> {
        let mut reader = BinaryReader::new(data);
        let tag = reader.read_u8()?;
        match tag {
            TAG_INPUT => Ok(Message::Input(Input {
                client_seq: reader.read_u32()?,
                timestamp_ns: reader.read_u64()?,
                dx: reader.read_i32()?,
                dy: reader.read_i32()?,
                fire: reader.read_bool()?,
            })),
            TAG_SNAPSHOT => {
                let tick = reader.read_u32()?;
                let is_keyframe = reader.read_bool()?;
                let base_tick = reader.read_u32()?;
                let role = role_from_u8(reader.read_u8()?);
                let len = reader.read_u16()? as usize;
                let state = reader.read_bytes(len)?;
                Ok(Message::Snapshot(Snapshot {
                    tick,
                    is_keyframe,
                    base_tick,
                    state,
                    role,
                }))
            }
            TAG_SERVER_ACK => Ok(Message::ServerAck(ServerAck {
                last_client_seq: reader.read_u32()?,
                server_tick: reader.read_u32()?,
            })),
            other => Err(ParseError::UnknownTag(other)),
        }
    }
}
