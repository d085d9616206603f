//! Error types for Gestura

use thiserror::Error;

/// Result type alias for Gestura protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Gestura protocol error types
#[derive(Error, Debug)]
pub enum Error {
    /// JSON encoding error
    #[error("encode error: {0}")]
    EncodeError(String),

    /// JSON decoding error
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Envelope parsed but did not have the expected shape
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Gesture category not known to the protocol
    #[error("unknown gesture category: {0}")]
    UnknownCategory(String),

    /// Event kind not known to the dispatcher
    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),
}

impl Error {
    pub(crate) fn encode(e: serde_json::Error) -> Self {
        Error::EncodeError(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::DecodeError(e.to_string())
    }
}
