//! Session configuration and builder

use serde::{Deserialize, Serialize};
use std::time::Duration;

use gestura_core::{DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use gestura_transport::{Transport, TransportOptions};

use crate::{GestureSession, Result};

/// Construction-time settings of a [`GestureSession`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Connection attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Reconnect interval in milliseconds
    pub interval_ms: u64,
    /// Only publish gestures registered for their category
    pub require_registration: bool,
    /// WebSocket subprotocols to request
    pub subprotocols: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
            require_registration: true,
            subprotocols: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            connection_timeout: Duration::from_millis(self.timeout_ms),
            reconnect_interval: Duration::from_millis(self.interval_ms),
            subprotocols: self.subprotocols.clone(),
        }
    }
}

/// Builder for GestureSession
#[derive(Debug, Clone, Default)]
pub struct GestureSessionBuilder {
    config: SessionConfig,
}

impl GestureSessionBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connection timeout in milliseconds
    pub fn timeout(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set reconnect interval in milliseconds
    pub fn interval(mut self, ms: u64) -> Self {
        self.config.interval_ms = ms;
        self
    }

    /// Require gestures to be registered before they are published
    pub fn require_registration(mut self, required: bool) -> Self {
        self.config.require_registration = required;
        self
    }

    /// Request a WebSocket subprotocol
    pub fn subprotocol(mut self, protocol: &str) -> Self {
        self.config.subprotocols.push(protocol.to_string());
        self
    }

    /// Current configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Build a session on the WebSocket transport
    pub fn build(self) -> GestureSession {
        GestureSession::new(self.config)
    }

    /// Build a session on a custom transport
    pub fn build_with<T: Transport>(self, transport: T) -> GestureSession<T> {
        GestureSession::with_transport(transport, self.config)
    }

    /// Build and connect
    pub fn connect(self, address: &str) -> Result<GestureSession> {
        let session = GestureSession::new(self.config);
        session.connect(address)?;
        Ok(session)
    }
}

impl From<SessionConfig> for GestureSessionBuilder {
    fn from(config: SessionConfig) -> Self {
        Self { config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.interval_ms, 3_000);
        assert!(config.require_registration);
        assert!(config.subprotocols.is_empty());
    }

    #[test]
    fn test_builder_chained() {
        let builder = GestureSessionBuilder::new()
            .timeout(500)
            .interval(250)
            .require_registration(false)
            .subprotocol("gestura.v1");

        let config = builder.config();
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.interval_ms, 250);
        assert!(!config.require_registration);
        assert_eq!(config.subprotocols, vec!["gestura.v1".to_string()]);
    }

    #[test]
    fn test_transport_options() {
        let options = SessionConfig {
            timeout_ms: 1500,
            interval_ms: 20,
            ..SessionConfig::default()
        }
        .transport_options();

        assert_eq!(options.connection_timeout, Duration::from_millis(1500));
        assert_eq!(options.reconnect_interval, Duration::from_millis(20));
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"timeoutMs": 2000, "requireRegistration": false}"#).unwrap();

        assert_eq!(config.timeout_ms, 2000);
        assert_eq!(config.interval_ms, 3000);
        assert!(!config.require_registration);
    }
}
