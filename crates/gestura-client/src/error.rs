//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connect must be called from within a tokio runtime")]
    NoRuntime,

    #[error("transport error: {0}")]
    Transport(#[from] gestura_transport::TransportError),
}
