//! Gesture session implementation

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use gestura_core::{
    codec, Category, Event, EventKind, GestureNames, Handler, Operation, RegisteredGestureSet,
    DEFAULT_ADDRESS,
};
use gestura_transport::{
    Transport, TransportEvent, TransportReceiver, TransportSender, WebSocketTransport,
};

use crate::builder::{GestureSessionBuilder, SessionConfig};
use crate::dispatcher::EventDispatcher;
use crate::error::{ClientError, Result};
use crate::router::MessageRouter;

/// Connection state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
}

/// Transport bookkeeping, swapped as a unit
#[derive(Default)]
struct Link {
    /// Bumped on every connect/disconnect so late notifications can be told apart
    generation: u64,
    /// Generation of the most recent transport that reported open
    opened: u64,
    state: SessionState,
    /// Set once the full registration set went out on the current connection
    synced: bool,
    sender: Option<Arc<dyn TransportSender>>,
    address: Option<String>,
}

impl Link {
    fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::Disconnected;
        self.synced = false;
    }
}

/// State shared between the caller and the transport pump task.
///
/// Lock order is `registry` then `link`.
struct Shared {
    link: Mutex<Link>,
    registry: Mutex<RegisteredGestureSet>,
    dispatcher: EventDispatcher,
    router: MessageRouter,
}

fn send_operations(sender: &dyn TransportSender, operations: &[Operation]) {
    let text = match codec::encode_operations(operations) {
        Ok(Some(text)) => text,
        Ok(None) => return,
        Err(e) => {
            error!("Failed to encode gesture operations: {}", e);
            return;
        }
    };

    match sender.try_send(text) {
        Ok(()) => debug!("Sent {} gesture operations", operations.len()),
        Err(e) => warn!("Failed to send {} gesture operations: {}", operations.len(), e),
    }
}

impl Shared {
    fn is_connected(&self) -> bool {
        self.link.lock().state == SessionState::Connected
    }

    /// Send incremental registration changes.
    ///
    /// Callers hold the registry lock, so changes reach the server in the
    /// order they were applied and never ahead of the full sync. Until that
    /// full sync went out the store alone is updated; it carries the change.
    fn sync(&self, operations: &[Operation]) {
        let sender = {
            let link = self.link.lock();
            if link.state != SessionState::Connected || !link.synced {
                trace!("Not synced, deferring {} operations", operations.len());
                return;
            }
            link.sender.clone()
        };

        if let Some(sender) = sender {
            send_operations(sender.as_ref(), operations);
        }
    }

    fn handle_transport_event(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_open(generation),
            TransportEvent::Data(text) => self.on_message(generation, &text),
            TransportEvent::Error(detail) => self.on_error(generation, detail),
            TransportEvent::Disconnected { reason } => self.on_close(generation, reason),
        }
    }

    fn on_open(&self, generation: u64) {
        {
            let mut link = self.link.lock();
            if link.generation != generation {
                trace!("Ignoring open from a released transport");
                return;
            }
            link.state = SessionState::Connected;
            link.synced = false;
            link.opened = generation;
        }

        info!("Gesture session connected");
        self.dispatcher.dispatch(&Event::Connect);

        // Server state is rebuilt from scratch on every (re)connect
        let registry = self.registry.lock();
        let sender = {
            let mut link = self.link.lock();
            if link.generation != generation || link.state != SessionState::Connected {
                return;
            }
            link.synced = true;
            link.sender.clone()
        };

        if let Some(sender) = sender {
            send_operations(sender.as_ref(), &registry.to_operations());
        }
    }

    fn on_message(&self, generation: u64, text: &str) {
        if self.link.lock().generation != generation {
            return;
        }

        let routed = {
            let registry = self.registry.lock();
            self.router.route(text, &registry)
        };

        match routed {
            Ok(events) => {
                for event in &events {
                    self.dispatcher.dispatch(event);
                }
            }
            Err(e) => {
                warn!("Dropping malformed message: {}", e);
                self.dispatcher.dispatch(&Event::Error(e.to_string()));
            }
        }
    }

    fn on_error(&self, generation: u64, detail: String) {
        if self.link.lock().generation != generation {
            return;
        }

        warn!("Transport error: {}", detail);
        self.dispatcher.dispatch(&Event::Error(detail));
    }

    fn on_close(&self, generation: u64, reason: Option<String>) {
        let publish = {
            let mut link = self.link.lock();
            if link.generation == generation {
                link.state = SessionState::Disconnected;
                link.synced = false;
                info!("Gesture session disconnected: {:?}", reason);
                true
            } else {
                // A released transport still reports its close, unless a
                // newer one already opened
                link.opened <= generation
            }
        };

        if publish {
            self.dispatcher.dispatch(&Event::Disconnect { reason });
        } else {
            trace!("Dropping close from a released transport: {:?}", reason);
        }
    }
}

async fn pump_events<R: TransportReceiver>(shared: Arc<Shared>, mut receiver: R, generation: u64) {
    while let Some(event) = receiver.recv().await {
        shared.handle_transport_event(generation, event);
    }
    debug!("Transport {} finished", generation);
}

/// A gesture session.
///
/// Keeps the set of gestures the application cares about, mirrors it to
/// the server on every (re)connect, and publishes inbound frames and
/// gestures to subscribers.
pub struct GestureSession<T: Transport = WebSocketTransport> {
    transport: T,
    config: SessionConfig,
    shared: Arc<Shared>,
}

impl GestureSession<WebSocketTransport> {
    /// Create a session on the WebSocket transport
    pub fn new(config: SessionConfig) -> Self {
        Self::with_transport(WebSocketTransport::new(), config)
    }

    /// Create a builder
    pub fn builder() -> GestureSessionBuilder {
        GestureSessionBuilder::new()
    }
}

impl<T: Transport> GestureSession<T> {
    /// Create a session on a custom transport
    pub fn with_transport(transport: T, config: SessionConfig) -> Self {
        let shared = Arc::new(Shared {
            link: Mutex::new(Link::default()),
            registry: Mutex::new(RegisteredGestureSet::new()),
            dispatcher: EventDispatcher::new(),
            router: MessageRouter::new(config.require_registration),
        });

        Self {
            transport,
            config,
            shared,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    /// Open the transport to `address`.
    ///
    /// Does nothing (besides a warning) while a transport is already open,
    /// even one that is still trying to reach the server. Must be called
    /// from within a tokio runtime.
    pub fn connect(&self, address: &str) -> Result<()> {
        let mut link = self.shared.link.lock();
        if let Some(current) = &link.address {
            warn!("Already connected to {}, ignoring connect to {}", current, address);
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        info!("Connecting to {}", address);
        let (sender, receiver) = self
            .transport
            .open(address, &self.config.transport_options())?;

        link.reset();
        link.sender = Some(Arc::new(sender));
        link.address = Some(address.to_string());
        let generation = link.generation;
        drop(link);

        runtime.spawn(pump_events(self.shared.clone(), receiver, generation));
        Ok(())
    }

    /// Connect to the default local server
    pub fn connect_default(&self) -> Result<()> {
        self.connect(DEFAULT_ADDRESS)
    }

    /// Close the transport, if any. Safe to call when not connected.
    ///
    /// The closed transport still reports a `Disconnect` event, unless a
    /// transport opened by a later `connect` has already reported `Connect`.
    pub fn disconnect(&self) {
        let (sender, address) = {
            let mut link = self.shared.link.lock();
            link.reset();
            (link.sender.take(), link.address.take())
        };

        if let Some(sender) = sender {
            sender.close();
        }
        if let Some(address) = address {
            info!("Disconnected from {}", address);
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    pub fn state(&self) -> SessionState {
        self.shared.link.lock().state
    }

    /// Address of the open transport
    pub fn address(&self) -> Option<String> {
        self.shared.link.lock().address.clone()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Ask for gestures to be recognized.
    ///
    /// Only names not registered yet are added, and only those are sent to
    /// the server (immediately when connected, otherwise on next open).
    pub fn register_gestures(&self, category: Category, names: impl GestureNames) {
        let mut registry = self.shared.registry.lock();
        let added = registry.register(category, names);
        if added.is_empty() {
            return;
        }

        debug!("Registered {} gestures: {:?}", category, added);
        self.shared.sync(&Operation::adds(category, &added));
    }

    /// Stop recognizing gestures. Names that were not registered are ignored.
    pub fn unregister_gestures(&self, category: Category, names: impl GestureNames) {
        let mut registry = self.shared.registry.lock();
        let removed = registry.unregister(category, names);
        if removed.is_empty() {
            return;
        }

        debug!("Unregistered {} gestures: {:?}", category, removed);
        self.shared.sync(&Operation::removes(category, &removed));
    }

    /// [`register_gestures`](Self::register_gestures) with a category name;
    /// unknown categories are ignored
    pub fn register_gestures_named(&self, category: &str, names: impl GestureNames) {
        match category.parse() {
            Ok(category) => self.register_gestures(category, names),
            Err(e) => debug!("Ignoring registration: {}", e),
        }
    }

    /// [`unregister_gestures`](Self::unregister_gestures) with a category
    /// name; unknown categories are ignored
    pub fn unregister_gestures_named(&self, category: &str, names: impl GestureNames) {
        match category.parse() {
            Ok(category) => self.unregister_gestures(category, names),
            Err(e) => debug!("Ignoring unregistration: {}", e),
        }
    }

    /// Gestures currently registered for a category
    pub fn registered(&self, category: Category) -> Vec<String> {
        self.shared.registry.lock().names(category).to_vec()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(&self, kind: EventKind, handler: Handler) {
        self.shared.dispatcher.add_listener(kind, handler);
    }

    pub fn remove_event_listener(&self, kind: EventKind, handler: &Handler) {
        self.shared.dispatcher.remove_listener(kind, handler);
    }

    /// Remove all listeners of one kind, or of every kind with `None`
    pub fn remove_event_listeners(&self, kind: Option<EventKind>) {
        self.shared.dispatcher.remove_listeners(kind);
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.shared.dispatcher.listener_count(kind)
    }
}

impl<T: Transport> Drop for GestureSession<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gestura_transport::MockTransport;

    #[test]
    fn test_disconnect_without_connect() {
        let session = GestureSession::with_transport(MockTransport::new(), SessionConfig::default());

        session.disconnect();
        session.disconnect();

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.address().is_none());
    }

    #[test]
    fn test_connect_outside_runtime() {
        let session = GestureSession::with_transport(MockTransport::new(), SessionConfig::default());

        assert!(matches!(
            session.connect("ws://mock"),
            Err(ClientError::NoRuntime)
        ));
        assert!(session.address().is_none());
    }

    #[test]
    fn test_register_while_disconnected_only_updates_store() {
        let transport = MockTransport::new();
        let handle = transport.handle();
        let session = GestureSession::with_transport(transport, SessionConfig::default());

        session.register_gestures(Category::Static, ["fist", "palm"]);
        session.unregister_gestures(Category::Static, "fist");
        session.register_gestures_named("dynamic", "wave");
        session.register_gestures_named("unknown", "ghost");

        assert_eq!(session.registered(Category::Static), vec!["palm"]);
        assert_eq!(session.registered(Category::Dynamic), vec!["wave"]);
        assert!(handle.sent().is_empty());
        assert_eq!(handle.open_count(), 0);
    }

    #[tokio::test]
    async fn test_second_connect_is_noop() {
        let transport = MockTransport::new();
        let handle = transport.handle();
        let session = GestureSession::with_transport(transport, SessionConfig::default());

        session.connect("ws://first").unwrap();
        session.connect("ws://second").unwrap();

        assert_eq!(handle.open_count(), 1);
        assert_eq!(session.address().as_deref(), Some("ws://first"));
    }

    #[tokio::test]
    async fn test_connect_passes_transport_options() {
        let transport = MockTransport::new();
        let handle = transport.handle();
        let config = SessionConfig {
            timeout_ms: 1234,
            interval_ms: 56,
            ..SessionConfig::default()
        };
        let session = GestureSession::with_transport(transport, config.clone());

        session.connect_default().unwrap();

        let (address, options) = handle.last_open().unwrap();
        assert_eq!(address, DEFAULT_ADDRESS);
        assert_eq!(options, config.transport_options());
    }

    fn generation(session: &GestureSession<MockTransport>) -> u64 {
        session.shared.link.lock().generation
    }

    #[tokio::test]
    async fn test_late_close_after_newer_open_is_dropped() {
        let session = GestureSession::with_transport(MockTransport::new(), SessionConfig::default());
        let events = gestura_test_utils::EventCollector::new();
        for kind in [EventKind::Connect, EventKind::Disconnect] {
            session.add_event_listener(kind, events.handler());
        }

        session.connect("ws://first").unwrap();
        let first = generation(&session);
        session.shared.handle_transport_event(first, TransportEvent::Connected);

        session.disconnect();
        session.connect("ws://second").unwrap();
        let second = generation(&session);
        session.shared.handle_transport_event(second, TransportEvent::Connected);

        session.shared.handle_transport_event(
            first,
            TransportEvent::Disconnected {
                reason: Some("closed by client".to_string()),
            },
        );

        assert_eq!(events.kinds(), vec![EventKind::Connect, EventKind::Connect]);
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_late_close_before_newer_open_is_published() {
        let session = GestureSession::with_transport(MockTransport::new(), SessionConfig::default());
        let events = gestura_test_utils::EventCollector::new();
        for kind in [EventKind::Connect, EventKind::Disconnect] {
            session.add_event_listener(kind, events.handler());
        }

        session.connect("ws://first").unwrap();
        let first = generation(&session);
        session.shared.handle_transport_event(first, TransportEvent::Connected);

        session.disconnect();
        session.connect("ws://second").unwrap();
        session.shared.handle_transport_event(
            first,
            TransportEvent::Disconnected { reason: None },
        );

        assert_eq!(events.kinds(), vec![EventKind::Connect, EventKind::Disconnect]);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_rejected_address_leaves_session_unconnected() {
        let session = GestureSession::with_transport(MockTransport::new(), SessionConfig::default());

        assert!(matches!(session.connect(""), Err(ClientError::Transport(_))));
        assert!(session.address().is_none());
    }
}
