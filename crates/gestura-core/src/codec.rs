//! JSON codec for Gestura protocol frames
//!
//! Outbound frames are always `{"type":"operation","data":[...]}`. Inbound
//! frames are `{"type":"data","data":[...]}` envelopes whose elements are
//! decoded positionally: an optional leading `frame` element followed by
//! `static`/`dynamic` gesture elements. Anything else is skipped.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Category, FrameData, GestureOccurrence, Operation, OutboundMessage};

/// Envelope type carrying sensor frames and recognized gestures
pub const DATA_TYPE: &str = "data";

/// Element type carrying a sensor frame
pub const FRAME_TYPE: &str = "frame";

/// Encode a batch of registration operations.
///
/// Returns `None` for an empty batch, which must not be sent.
pub fn encode_operations(operations: &[Operation]) -> Result<Option<String>> {
    if operations.is_empty() {
        return Ok(None);
    }

    encode(&OutboundMessage::Operation(operations.to_vec())).map(Some)
}

/// Encode an outbound message as a JSON text frame
pub fn encode(message: &OutboundMessage) -> Result<String> {
    serde_json::to_string(message).map_err(Error::encode)
}

/// Decode an outbound message (used by servers and tests)
pub fn decode_outbound(text: &str) -> Result<OutboundMessage> {
    Ok(serde_json::from_str(text)?)
}

/// Decoded content of one inbound frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inbound {
    /// Frame carried as the first element, if any
    pub frame: Option<FrameData>,
    /// Gesture elements, in server order
    pub gestures: Vec<GestureOccurrence>,
}

impl Inbound {
    pub fn is_empty(&self) -> bool {
        self.frame.is_none() && self.gestures.is_empty()
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decode one inbound text frame.
///
/// Envelopes of any type other than `data` decode to an empty [`Inbound`].
pub fn decode_inbound(text: &str) -> Result<Inbound> {
    let envelope: RawEnvelope = serde_json::from_str(text)?;

    if envelope.kind != DATA_TYPE {
        return Ok(Inbound::default());
    }

    let elements = match envelope.data {
        Value::Array(elements) => elements,
        Value::Null => return Ok(Inbound::default()),
        other => {
            return Err(Error::Malformed(format!(
                "data envelope payload is not a list: {}",
                other
            )))
        }
    };

    let mut inbound = Inbound::default();
    let mut rest = elements.into_iter().peekable();

    let leading_frame = rest
        .peek()
        .map_or(false, |first| element_type(first) == Some(FRAME_TYPE));
    if leading_frame {
        let frame = rest
            .next()
            .and_then(|mut el| el.get_mut("data").map(Value::take))
            .unwrap_or(Value::Null);
        inbound.frame = Some(frame);
    }

    for element in rest {
        if let Some(gesture) = decode_gesture(element) {
            inbound.gestures.push(gesture);
        }
    }

    Ok(inbound)
}

fn element_type(element: &Value) -> Option<&str> {
    element.get("type").and_then(Value::as_str)
}

fn decode_gesture(mut element: Value) -> Option<GestureOccurrence> {
    let category = element_type(&element)?.parse::<Category>().ok()?;
    let name = element.get("name").and_then(Value::as_str)?.to_string();
    let data = element.get_mut("data").map(Value::take).unwrap_or(Value::Null);

    Some(GestureOccurrence {
        category,
        name,
        data,
    })
}
