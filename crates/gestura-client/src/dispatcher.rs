//! Event subscription and dispatch

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

use gestura_core::{Event, EventKind, Handler};

/// Per-kind lists of subscriber handlers.
///
/// Handlers of a kind run in registration order on the calling task. A
/// panicking handler is logged and skipped; the others still run.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. Adding the same handler twice runs it twice.
    pub fn add_listener(&self, kind: EventKind, handler: Handler) {
        self.listeners.write().entry(kind).or_default().push(handler);
    }

    /// Remove every registration of `handler` for `kind`, returning how many
    pub fn remove_listener(&self, kind: EventKind, handler: &Handler) -> usize {
        let mut listeners = self.listeners.write();
        let Some(handlers) = listeners.get_mut(&kind) else {
            return 0;
        };

        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        before - handlers.len()
    }

    /// Clear one kind, or every kind with `None`
    pub fn remove_listeners(&self, kind: Option<EventKind>) {
        let mut listeners = self.listeners.write();
        match kind {
            Some(kind) => {
                listeners.remove(&kind);
            }
            None => listeners.clear(),
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Run every handler subscribed to the event's kind
    pub fn dispatch(&self, event: &Event) {
        let kind = event.kind();
        // Snapshot so handlers can (un)subscribe while we iterate
        let handlers = match self.listeners.read().get(&kind) {
            Some(handlers) => handlers.clone(),
            None => return,
        };

        for handler in handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                error!("{} handler panicked: {}", kind, panic_message(&*panic));
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
