//! Common test helpers and utilities for Gestura tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A WebSocket test server with RAII cleanup
//! - Event collectors for subscription testing

use futures_util::{SinkExt, StreamExt};
use gestura_core::{Event, EventKind, Handler};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{
    handshake::server::{Request as HsRequest, Response as HsResponse},
    protocol::{frame::coding::CloseCode, CloseFrame, Message as WsMessage},
};
use tracing::debug;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Install a tracing subscriber honouring `RUST_LOG`, once per process
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for a synchronous condition
pub async fn wait_until<F>(check: F, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    wait_for(|| std::future::ready(check()), DEFAULT_CHECK_INTERVAL, max_wait).await
}

/// Give spawned tasks a chance to run, for asserting that nothing happens
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ============================================================================
// Test Server - RAII wrapper with proper cleanup
// ============================================================================

#[derive(Debug, Clone)]
enum ServerCommand {
    Send(String),
    Close(String),
}

#[derive(Default)]
struct ServerState {
    received: Mutex<Vec<String>>,
    protocols: Mutex<Vec<Option<String>>>,
    connections: AtomicU32,
}

/// A WebSocket server standing in for the gesture-recognition server.
///
/// Records every text frame clients send and can push frames to, or drop,
/// all connected clients. Stops on drop.
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    commands: broadcast::Sender<ServerCommand>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Start a server on an ephemeral local port
    pub async fn start() -> Self {
        Self::try_start().await.expect("test server failed to start")
    }

    pub async fn try_start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(ServerState::default());
        let (commands, _) = broadcast::channel(64);

        let handle = tokio::spawn(accept_loop(listener, state.clone(), commands.clone()));

        Ok(Self {
            addr,
            state,
            commands,
            handle: Some(handle),
        })
    }

    /// Get the WebSocket URL for this server
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Push a text frame to every connected client, returning how many got it
    pub fn send(&self, text: impl Into<String>) -> usize {
        self.commands
            .send(ServerCommand::Send(text.into()))
            .unwrap_or(0)
    }

    /// Close every client connection with the given reason
    pub fn drop_clients(&self, reason: &str) -> usize {
        self.commands
            .send(ServerCommand::Close(reason.to_string()))
            .unwrap_or(0)
    }

    /// Frames received from clients, in arrival order
    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }

    /// Frames received so far, clearing the record
    pub fn take_received(&self) -> Vec<String> {
        std::mem::take(&mut *self.state.received.lock())
    }

    /// Total WebSocket handshakes completed
    pub fn connection_count(&self) -> u32 {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// `Sec-WebSocket-Protocol` header of every handshake, in order
    pub fn requested_protocols(&self) -> Vec<Option<String>> {
        self.state.protocols.lock().clone()
    }

    pub async fn wait_for_connections(&self, n: u32, max_wait: Duration) -> bool {
        wait_until(|| self.connection_count() >= n, max_wait).await
    }

    pub async fn wait_for_received(&self, n: usize, max_wait: Duration) -> bool {
        wait_until(|| self.state.received.lock().len() >= n, max_wait).await
    }

    /// Stop the server explicitly (also happens on drop)
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        let _ = self.commands.send(ServerCommand::Close("server stopped".to_string()));
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<ServerState>,
    commands: broadcast::Sender<ServerCommand>,
) {
    while let Ok((stream, peer)) = listener.accept().await {
        debug!("Test server accepted {}", peer);
        let rx = commands.subscribe();
        tokio::spawn(serve_client(stream, state.clone(), rx));
    }
}

async fn serve_client(
    stream: TcpStream,
    state: Arc<ServerState>,
    mut commands: broadcast::Receiver<ServerCommand>,
) {
    let handshake_state = state.clone();
    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        move |req: &HsRequest, mut response: HsResponse| {
            let requested = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            // Accept the first protocol the client offers
            if let Some(first) = requested
                .as_deref()
                .and_then(|p| p.split(',').next())
                .map(str::trim)
            {
                if let Ok(value) = first.parse() {
                    response.headers_mut().insert("Sec-WebSocket-Protocol", value);
                }
            }

            handshake_state.protocols.lock().push(requested);
            Ok(response)
        },
    )
    .await;

    let ws = match ws {
        Ok(ws) => ws,
        Err(e) => {
            debug!("Test server handshake failed: {}", e);
            return;
        }
    };
    state.connections.fetch_add(1, Ordering::SeqCst);

    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => state.received.lock().push(text),
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            command = commands.recv() => match command {
                Ok(ServerCommand::Send(text)) => {
                    if write.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(ServerCommand::Close(reason)) => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: Cow::Owned(reason),
                    };
                    let _ = write.send(WsMessage::Close(Some(frame))).await;
                    // Let the client acknowledge the close
                    let _ = tokio::time::timeout(Duration::from_secs(1), async {
                        while let Some(Ok(_)) = read.next().await {}
                    })
                    .await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

// ============================================================================
// Event Collector - for verifying dispatched events
// ============================================================================

/// Collector for session events with thread-safe access
#[derive(Clone, Default)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<Event>>>,
    count: Arc<AtomicU32>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handler that records every event it sees
    pub fn handler(&self) -> Handler {
        let events = self.events.clone();
        let count = self.count.clone();

        Arc::new(move |event: &Event| {
            events.lock().push(event.clone());
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Get the count of received events
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Count of received events of one kind
    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Kinds of all collected events, in order
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(Event::kind).collect()
    }

    /// Names of collected gesture events, in order
    pub fn gesture_names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Gesture { gesture, .. } => Some(gesture.name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait for at least n events
    pub async fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_until(|| self.count() >= n, max_wait).await
    }

    /// Wait for at least n events of one kind
    pub async fn wait_for_kind(&self, kind: EventKind, n: usize, max_wait: Duration) -> bool {
        wait_until(|| self.count_of(kind) >= n, max_wait).await
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
        self.count.store(0, Ordering::SeqCst);
    }
}
