use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed packet: {0}")]
    Malformed(#[from] pong_binary::BinaryError),
    #[error("reliable send window is full")]
    SendWindowFull,
}

pub type Result<T> = std::result::Result<T, TransportError>;
