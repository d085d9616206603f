//! Gestura Transport Layer
//!
//! This crate provides the transports a gesture session runs on:
//! - WebSocket with automatic reconnect (primary)
//! - In-memory mock (tests)

pub mod error;
pub mod mock;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::{Result, TransportError};
pub use mock::{MockHandle, MockTransport};
pub use traits::{
    Transport, TransportEvent, TransportOptions, TransportReceiver, TransportSender,
    CLIENT_CLOSE_REASON,
};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketTransport};
