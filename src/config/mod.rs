//! Client configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionConfig`] | Broker URI and transport tunables |
//! | [`SessionConfig`] | Commit and acknowledgement mode of a session |
//! | [`PoolConfig`] | Session pool sizing and saturation policy |
//! | [`ClientConfig`] | Connection and session options in one document |
//! | [`ConnectionUri`] | Parsed broker URI |
//!
//! # Example
//!
//! ```
//! use broker_client::ClientConfig;
//!
//! let config = ClientConfig::from_json(r#"{
//!     "connector": { "uri": "hornetq://invm", "reconnect_attempts": -1 },
//!     "session": { "auto_commit_sends": false }
//! }"#)?;
//!
//! assert!(config.session.is_transacted());
//! # Ok::<(), broker_client::Error>(())
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Connection factory options.
pub mod connection;

/// Default values for every option.
pub mod defaults;

/// Session pool options.
pub mod pool;

/// Per-session options.
pub mod session;

/// Broker URI parsing.
pub mod uri;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::ConnectionConfig;
pub use pool::PoolConfig;
pub use session::SessionConfig;
pub use uri::{ConnectionUri, Endpoint, Protocol};

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// ClientConfig
// ============================================================================

/// Connection and session options consumed by
/// [`ConnectionFactory::run_with_session`](crate::ConnectionFactory::run_with_session).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Options for the connection factory.
    pub connector: ConnectionConfig,
    /// Options for the session.
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Creates a configuration for `uri` with default session options.
    #[inline]
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            connector: ConnectionConfig::new(uri),
            session: SessionConfig::default(),
        }
    }

    /// Sets the session options.
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Parses a JSON document with `connector` and `session` sections.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] for malformed text, [`Error::Config`] for unknown
    /// sections or options.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        serde_json::from_value(value)
            .map_err(|e| Error::config(format!("invalid client configuration: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_sections() {
        let config = ClientConfig::from_json(
            r#"{
                "connector": { "uri": "hornetq://localhost", "auto_group": true },
                "session": { "username": "app", "password": "secret" }
            }"#,
        )
        .expect("valid document");

        assert_eq!(config.connector.uri.as_deref(), Some("hornetq://localhost"));
        assert!(config.connector.auto_group);
        assert!(config.session.is_authenticated());
    }

    #[test]
    fn test_from_json_rejects_unknown_section() {
        let err = ClientConfig::from_json(r#"{ "connection": {} }"#).unwrap_err();
        assert!(err.to_string().contains("connection"));
    }

    #[test]
    fn test_missing_sections_default() {
        let config = ClientConfig::from_json("{}").expect("empty document");
        assert!(config.connector.uri.is_none());
        assert_eq!(config.session, SessionConfig::default());
    }
}
