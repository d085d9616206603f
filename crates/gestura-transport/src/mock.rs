//! In-memory transport for tests
//!
//! [`MockTransport`] never touches the network. A [`MockHandle`] plays the
//! server side: it decides when the connection opens, drops or fails, feeds
//! inbound frames, and records what the client sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::traits::{
    Transport, TransportEvent, TransportOptions, TransportReceiver, TransportSender,
    CLIENT_CLOSE_REASON,
};

#[derive(Default)]
struct MockState {
    opens: Vec<(String, TransportOptions)>,
    sent: Vec<String>,
    connected: bool,
    closed: bool,
    generation: u64,
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
}

impl MockState {
    fn emit(&self, event: TransportEvent) -> bool {
        self.events
            .as_ref()
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }
}

/// Transport backed by in-process channels
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for driving the most recently opened connection
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: self.state.clone(),
        }
    }
}

/// Server-side controls for a [`MockTransport`]
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Report the connection as established
    pub fn open_connection(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.events.is_none() {
            return false;
        }
        state.connected = true;
        state.emit(TransportEvent::Connected)
    }

    /// Deliver an inbound text frame
    pub fn deliver(&self, text: impl Into<String>) -> bool {
        self.state.lock().emit(TransportEvent::Data(text.into()))
    }

    /// Report a transport error
    pub fn fail(&self, detail: impl Into<String>) -> bool {
        self.state.lock().emit(TransportEvent::Error(detail.into()))
    }

    /// Drop the connection as if the server went away
    pub fn drop_connection(&self, reason: Option<&str>) -> bool {
        let mut state = self.state.lock();
        state.connected = false;
        state.emit(TransportEvent::Disconnected {
            reason: reason.map(str::to_string),
        })
    }

    /// Frames sent by the client so far
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Frames sent by the client so far, clearing the record
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.state.lock().sent)
    }

    /// Number of times the transport was opened
    pub fn open_count(&self) -> usize {
        self.state.lock().opens.len()
    }

    /// Address and options of the last open
    pub fn last_open(&self) -> Option<(String, TransportOptions)> {
        self.state.lock().opens.last().cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Whether the client closed the current connection
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Sending half of a [`MockTransport`] connection
pub struct MockSender {
    state: Arc<Mutex<MockState>>,
    generation: u64,
}

impl MockSender {
    fn is_current(&self, state: &MockState) -> bool {
        state.generation == self.generation && !state.closed
    }
}

impl TransportSender for MockSender {
    fn try_send(&self, text: String) -> Result<()> {
        let mut state = self.state.lock();
        if !self.is_current(&state) || !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.sent.push(text);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let state = self.state.lock();
        self.is_current(&state) && state.connected
    }

    fn close(&self) {
        let mut state = self.state.lock();
        if !self.is_current(&state) {
            return;
        }
        if state.connected {
            state.connected = false;
            state.emit(TransportEvent::Disconnected {
                reason: Some(CLIENT_CLOSE_REASON.to_string()),
            });
        }
        state.closed = true;
        state.events = None;
    }
}

/// Receiving half of a [`MockTransport`] connection
pub struct MockReceiver {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for MockReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

impl Transport for MockTransport {
    type Sender = MockSender;
    type Receiver = MockReceiver;

    fn open(
        &self,
        addr: &str,
        options: &TransportOptions,
    ) -> Result<(Self::Sender, Self::Receiver)> {
        if addr.is_empty() {
            return Err(TransportError::InvalidUrl("empty address".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.opens.push((addr.to_string(), options.clone()));
        state.generation += 1;
        state.connected = false;
        state.closed = false;
        state.events = Some(tx);

        let sender = MockSender {
            state: self.state.clone(),
            generation: state.generation,
        };

        Ok((sender, MockReceiver { rx }))
    }
}
