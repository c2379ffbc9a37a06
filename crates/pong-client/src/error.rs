use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("predict() called before reset()")]
    NotSeeded,
}

pub type Result<T> = std::result::Result<T, ClientError>;
