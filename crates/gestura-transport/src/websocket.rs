//! Reconnecting WebSocket transport implementation
//!
//! A background task owns the socket. It connects, forwards frames in both
//! directions, and after a drop or a failed attempt waits for the reconnect
//! interval before trying again, until the sender is closed or dropped.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::Request,
        http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderValue},
        protocol::Message as WsMessage,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{Result, TransportError};
use crate::traits::{
    Transport, TransportEvent, TransportOptions, TransportReceiver, TransportSender,
    CLIENT_CLOSE_REASON,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Outbound frames buffered before `try_send` starts failing
    pub send_buffer: usize,
    /// Inbound events buffered before the socket task waits for the reader
    pub event_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            send_buffer: 100,
            event_buffer: 100,
        }
    }
}

/// WebSocket transport that reconnects on its own
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    config: WebSocketConfig,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

/// WebSocket sender
pub struct WebSocketSender {
    tx: mpsc::Sender<WsMessage>,
    connected: Arc<Mutex<bool>>,
    shutdown: watch::Sender<bool>,
}

impl TransportSender for WebSocketSender {
    fn try_send(&self, text: String) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        self.tx
            .try_send(WsMessage::Text(text))
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    fn close(&self) {
        self.shutdown.send_replace(true);
        *self.connected.lock() = false;
    }
}

/// WebSocket receiver
pub struct WebSocketReceiver {
    rx: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for WebSocketReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

impl Transport for WebSocketTransport {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    fn open(
        &self,
        addr: &str,
        options: &TransportOptions,
    ) -> Result<(Self::Sender, Self::Receiver)> {
        let url = Url::parse(addr)?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme '{}' in {}",
                    other, addr
                )))
            }
        }

        let protocols = if options.subprotocols.is_empty() {
            None
        } else {
            Some(
                HeaderValue::from_str(&options.subprotocols.join(", "))
                    .map_err(|e| TransportError::Protocol(e.to_string()))?,
            )
        };

        // Fail on a bad address now rather than on every retry
        build_request(url.as_str(), protocols.as_ref())?;

        let (send_tx, send_rx) = mpsc::channel::<WsMessage>(self.config.send_buffer);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(self.config.event_buffer);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connected = Arc::new(Mutex::new(false));

        let task = ConnectionTask {
            url: url.to_string(),
            protocols,
            options: options.clone(),
            send_rx,
            event_tx,
            connected: connected.clone(),
            shutdown: shutdown_rx,
        };
        tokio::spawn(task.run());

        let sender = WebSocketSender {
            tx: send_tx,
            connected,
            shutdown: shutdown_tx,
        };

        let receiver = WebSocketReceiver { rx: event_rx };

        Ok((sender, receiver))
    }
}

fn build_request(url: &str, protocols: Option<&HeaderValue>) -> Result<Request> {
    let mut request = url
        .into_client_request()
        .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

    if let Some(protocols) = protocols {
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, protocols.clone());
    }

    Ok(request)
}

/// Resolves once shutdown was requested or the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

struct ConnectionTask {
    url: String,
    protocols: Option<HeaderValue>,
    options: TransportOptions,
    send_rx: mpsc::Receiver<WsMessage>,
    event_tx: mpsc::Sender<TransportEvent>,
    connected: Arc<Mutex<bool>>,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionTask {
    async fn run(mut self) {
        while !is_shutdown(&self.shutdown) {
            let request = match build_request(&self.url, self.protocols.as_ref()) {
                Ok(request) => request,
                Err(e) => {
                    let _ = self.event_tx.send(TransportEvent::Error(e.to_string())).await;
                    break;
                }
            };

            info!("Connecting to WebSocket: {}", self.url);

            let attempt = tokio::select! {
                _ = shutdown_requested(&mut self.shutdown) => break,
                res = tokio::time::timeout(self.options.connection_timeout, connect_async(request)) => res,
            };

            let delivered = match attempt {
                Ok(Ok((stream, response))) => {
                    debug!("WebSocket connected, response: {:?}", response.status());
                    self.serve(stream).await
                }
                Ok(Err(e)) => {
                    let err = TransportError::from(e);
                    warn!("WebSocket connect to {} failed: {}", self.url, err);
                    self.emit(TransportEvent::Error(err.to_string())).await
                }
                Err(_) => {
                    warn!(
                        "WebSocket connect to {} timed out after {:?}",
                        self.url, self.options.connection_timeout
                    );
                    let err = TransportError::Timeout(self.options.connection_timeout);
                    self.emit(TransportEvent::Error(err.to_string())).await
                }
            };

            if !delivered || is_shutdown(&self.shutdown) {
                break;
            }

            debug!(
                "Reconnecting to {} in {:?}",
                self.url, self.options.reconnect_interval
            );
            tokio::select! {
                _ = shutdown_requested(&mut self.shutdown) => break,
                _ = tokio::time::sleep(self.options.reconnect_interval) => {}
            }
        }

        *self.connected.lock() = false;
        debug!("WebSocket transport for {} stopped", self.url);
    }

    /// Returns false once nobody listens for events anymore
    async fn emit(&self, event: TransportEvent) -> bool {
        self.event_tx.send(event).await.is_ok()
    }

    /// Drive one established connection until it ends
    async fn serve(&mut self, stream: WsStream) -> bool {
        // Frames queued while disconnected are not replayed
        while self.send_rx.try_recv().is_ok() {}

        *self.connected.lock() = true;
        if !self.emit(TransportEvent::Connected).await {
            *self.connected.lock() = false;
            return false;
        }

        let reason = self.pump(stream).await;
        *self.connected.lock() = false;

        info!("WebSocket closed: {:?}", reason);
        self.emit(TransportEvent::Disconnected { reason }).await
    }

    async fn pump(&mut self, stream: WsStream) -> Option<String> {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                _ = shutdown_requested(&mut self.shutdown) => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    let _ = write.close().await;
                    return Some(CLIENT_CLOSE_REASON.to_string());
                }
                outbound = self.send_rx.recv() => match outbound {
                    Some(msg) => {
                        if let Err(e) = write.send(msg).await {
                            error!("WebSocket write error: {}", e);
                            let _ = self.event_tx.send(TransportEvent::Error(e.to_string())).await;
                            return Some(e.to_string());
                        }
                    }
                    None => return Some(CLIENT_CLOSE_REASON.to_string()),
                },
                inbound = read.next() => match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        if !self.emit(TransportEvent::Data(text)).await {
                            return None;
                        }
                    }
                    Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => {
                            if !self.emit(TransportEvent::Data(text)).await {
                                return None;
                            }
                        }
                        Err(_) => warn!("Dropping binary frame that is not UTF-8"),
                    },
                    Some(Ok(WsMessage::Close(frame))) => {
                        return frame.map(|f| f.reason.to_string());
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are answered by tungstenite
                    }
                    Some(Err(e)) => {
                        error!("WebSocket read error: {}", e);
                        let _ = self.event_tx.send(TransportEvent::Error(e.to_string())).await;
                        return Some(e.to_string());
                    }
                    None => return None,
                },
            }
        }
    }
}
