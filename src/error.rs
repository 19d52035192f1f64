//! Error types for the broker client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use broker_client::{ConnectionFactory, Result, SessionConfig};
//!
//! async fn example(factory: &ConnectionFactory) -> Result<()> {
//!     let session = factory.create_session(SessionConfig::default()).await?;
//!     session.commit().await?;
//!     session.close().await
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Lifecycle | [`Error::State`] |
//! | Pooling | [`Error::PoolExhausted`], [`Error::Protocol`] |
//! | Transport | [`Error::Transport`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a mandatory input is missing or an option is invalid
    /// (no URI, malformed URI, unknown option key). Never retried.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation attempted on a closed factory, pool or session.
    #[error("State error: {message}")]
    State {
        /// Description of the state violation.
        message: String,
    },

    // ========================================================================
    // Pool Errors
    // ========================================================================
    /// No session available under the pool's saturation policy.
    ///
    /// Callers may retry with backoff; the pool never retries internally.
    #[error("Session pool '{pool}' exhausted ({max_size} sessions leased)")]
    PoolExhausted {
        /// Name of the exhausted pool.
        pool: String,
        /// Configured pool capacity.
        max_size: usize,
    },

    /// Pool protocol violation.
    ///
    /// Returned when a session is released to a pool that did not lease it.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Failure reported by the broker transport.
    ///
    /// Connect failures, session-open failures and broker disconnects are
    /// passed through unchanged.
    #[error("Transport error: {message}")]
    Transport {
        /// Description reported by the transport.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a state error.
    #[inline]
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Creates a pool exhausted error.
    #[inline]
    pub fn pool_exhausted(pool: impl Into<String>, max_size: usize) -> Self {
        Self::PoolExhausted {
            pool: pool.into(),
            max_size,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Json(_))
    }

    /// Returns `true` if this is a lifecycle (closed resource) error.
    #[inline]
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Returns `true` if this error originated in the transport.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Io(_))
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::transport("connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing uri");
        assert_eq!(err.to_string(), "Configuration error: missing uri");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_pool_exhausted_display() {
        let err = Error::pool_exhausted("orders", 4);
        assert_eq!(
            err.to_string(),
            "Session pool 'orders' exhausted (4 sessions leased)"
        );
    }

    #[test]
    fn test_is_state_error() {
        assert!(Error::state("already closed").is_state_error());
        assert!(!Error::protocol("foreign session").is_state_error());
    }

    #[test]
    fn test_is_transport_error() {
        let io_err: Error = IoError::new(ErrorKind::ConnectionRefused, "refused").into();

        assert!(Error::transport("down").is_transport_error());
        assert!(io_err.is_transport_error());
        assert!(!Error::config("test").is_transport_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::pool_exhausted("p", 1).is_recoverable());
        assert!(!Error::state("closed").is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_config_error());
    }
}
