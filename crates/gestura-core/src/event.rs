//! Session events delivered to subscribers

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;
use crate::types::{FrameData, GestureOccurrence};

/// Subscriber callback.
///
/// Handlers are compared by pointer identity, so keep the `Arc` around to
/// remove a handler later.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Kinds of events a session publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Frame,
    Gesture,
    Connect,
    Disconnect,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Frame,
        EventKind::Gesture,
        EventKind::Connect,
        EventKind::Disconnect,
        EventKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Frame => "frame",
            EventKind::Gesture => "gesture",
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownEventKind(s.to_string()))
    }
}

/// A session event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Sensor frame received from the server
    Frame(FrameData),
    /// Recognized gesture, with the frame that arrived in the same message
    Gesture {
        gesture: GestureOccurrence,
        frame: FrameData,
    },
    /// Transport opened
    Connect,
    /// Transport closed
    Disconnect { reason: Option<String> },
    /// Transport or protocol error
    Error(String),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Frame(_) => EventKind::Frame,
            Event::Gesture { .. } => EventKind::Gesture,
            Event::Connect => EventKind::Connect,
            Event::Disconnect { .. } => EventKind::Disconnect,
            Event::Error(_) => EventKind::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_roundtrip_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("gestures".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_kind_of_event() {
        assert_eq!(Event::Connect.kind(), EventKind::Connect);
        assert_eq!(
            Event::Disconnect { reason: None }.kind(),
            EventKind::Disconnect
        );
        assert_eq!(Event::Error("boom".into()).kind(), EventKind::Error);
        assert_eq!(Event::Frame(FrameData::Null).kind(), EventKind::Frame);
    }
}
