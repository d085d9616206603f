//! Inbound message routing

use tracing::trace;

use gestura_core::{codec, empty_frame, Event, RegisteredGestureSet, Result};

/// Turns inbound text frames into session events
#[derive(Debug, Clone, Copy)]
pub struct MessageRouter {
    require_registration: bool,
}

impl MessageRouter {
    pub fn new(require_registration: bool) -> Self {
        Self {
            require_registration,
        }
    }

    /// Events for one inbound message, in publish order.
    ///
    /// A frame element yields a Frame event ahead of the gestures that
    /// arrived with it. Gestures not in `registry` are dropped when
    /// registration is required.
    pub fn route(&self, text: &str, registry: &RegisteredGestureSet) -> Result<Vec<Event>> {
        let inbound = codec::decode_inbound(text)?;
        let mut events = Vec::with_capacity(inbound.gestures.len() + 1);

        let frame = match inbound.frame {
            Some(frame) => {
                events.push(Event::Frame(frame.clone()));
                frame
            }
            None => empty_frame(),
        };

        for gesture in inbound.gestures {
            if self.require_registration && !registry.contains(gesture.category, &gesture.name) {
                trace!("Dropping unregistered {} gesture {}", gesture.category, gesture.name);
                continue;
            }

            events.push(Event::Gesture {
                gesture,
                frame: frame.clone(),
            });
        }

        Ok(events)
    }
}
