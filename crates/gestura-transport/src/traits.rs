//! Transport trait definitions

use async_trait::async_trait;
use std::time::Duration;

use gestura_core::{DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS};

use crate::error::Result;

/// Close reason reported when the local side shuts the transport down
pub const CLIENT_CLOSE_REASON: &str = "closed by client";

/// Events that can occur on a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Connection established (again, after a reconnect)
    Connected,
    /// Connection closed (clean or error)
    Disconnected { reason: Option<String> },
    /// Text frame received
    Data(String),
    /// Error occurred
    Error(String),
}

/// Options applied when opening a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Upper bound for a single connection attempt
    pub connection_timeout: Duration,
    /// Pause between a drop (or failed attempt) and the next attempt
    pub reconnect_interval: Duration,
    /// Requested WebSocket subprotocols
    pub subprotocols: Vec<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            reconnect_interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            subprotocols: Vec::new(),
        }
    }
}

/// Trait for sending data
pub trait TransportSender: Send + Sync {
    /// Queue a text frame without waiting.
    ///
    /// Fails with `NotConnected` while no connection is open; frames are
    /// never held back for a later connection.
    fn try_send(&self, text: String) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Close the transport and stop reconnecting
    fn close(&self);
}

/// Trait for receiving data
#[async_trait]
pub trait TransportReceiver: Send {
    /// Receive the next event, `None` once the transport is gone
    async fn recv(&mut self) -> Option<TransportEvent>;
}

/// Main transport trait
pub trait Transport: Send + Sync {
    /// The sender type for this transport
    type Sender: TransportSender + 'static;
    /// The receiver type for this transport
    type Receiver: TransportReceiver + 'static;

    /// Open a transport to `addr`.
    ///
    /// Returns immediately; connection progress is reported through the
    /// receiver. Must be called from within a tokio runtime.
    fn open(&self, addr: &str, options: &TransportOptions)
        -> Result<(Self::Sender, Self::Receiver)>;
}
