//! Gestura Core
//!
//! Core types and encoding for the Gestura gesture-recognition protocol.
//!
//! This crate provides:
//! - Wire types for the operation and data envelopes ([`Operation`], [`OpKind`])
//! - JSON encoding/decoding of protocol frames ([`codec`])
//! - Typed session events ([`Event`], [`EventKind`], [`Handler`])
//! - Client-side registration bookkeeping ([`RegisteredGestureSet`])

pub mod codec;
pub mod error;
pub mod event;
pub mod registry;
pub mod types;

pub use codec::{decode_inbound, encode_operations, Inbound};
pub use error::{Error, Result};
pub use event::{Event, EventKind, Handler};
pub use registry::{GestureNames, RegisteredGestureSet};
pub use types::*;

/// Default host of the gesture-recognition server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default WebSocket port
pub const DEFAULT_PORT: u16 = 8765;

/// Default server address used by `connect_default`, `ws://{DEFAULT_HOST}:{DEFAULT_PORT}`
pub const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:8765";

/// Default connection timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default reconnect interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 3_000;
