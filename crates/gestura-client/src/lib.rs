//! Gestura Client Library
//!
//! Session client for a gesture-recognition server.
//!
//! # Example
//!
//! ```ignore
//! use gestura_client::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> gestura_client::Result<()> {
//!     let session = GestureSession::builder().require_registration(true).build();
//!
//!     session.register_gestures(Category::Static, ["fist", "palm"]);
//!     session.register_gestures(Category::Dynamic, "wave");
//!
//!     session.add_event_listener(EventKind::Gesture, Arc::new(|event: &Event| {
//!         if let Event::Gesture { gesture, .. } = event {
//!             println!("{} gesture {}", gesture.category, gesture.name);
//!         }
//!     }));
//!
//!     session.connect("ws://127.0.0.1:8765")?;
//!     tokio::signal::ctrl_c().await.ok();
//!     session.disconnect();
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod router;
pub mod session;

pub use builder::{GestureSessionBuilder, SessionConfig};
pub use dispatcher::EventDispatcher;
pub use error::{ClientError, Result};
pub use router::MessageRouter;
pub use session::{GestureSession, SessionState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::{GestureSessionBuilder, SessionConfig};
    pub use crate::error::{ClientError, Result};
    pub use crate::session::{GestureSession, SessionState};
    pub use gestura_core::{Category, Event, EventKind, GestureOccurrence, Handler};
}
