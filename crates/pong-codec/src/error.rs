use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("delta snapshot at tick {tick} refers to missing base tick {base_tick}")]
    MissingBaseState { tick: u64, base_tick: u64 },
    #[error("snapshot payload truncated: {0}")]
    Truncated(#[from] pong_binary::BinaryError),
}

pub type Result<T> = std::result::Result<T, CodecError>;
