//! Broker transport seam.
//!
//! The wire protocol lives outside this crate. A [`Connector`] turns a
//! resolved [`TransportTarget`] into a live [`Transport`]; the transport
//! mints [`TransportSession`]s. The factory drives these traits and owns the
//! lifecycle around them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  connect(target)  ┌─────────────┐
//! │ ConnectionFactory│──────────────────►│  Connector  │
//! │                  │                   └──────┬──────┘
//! │                  │   open_session / close   │
//! │                  │◄──────────────── Transport (netty / discovery / invm)
//! └──────────────────┘
//! ```
//!
//! Reconnect/backoff (`reconnect_attempts`, `retry_interval`,
//! `retry_interval_multiplier`, `max_retry_interval`) and timeouts
//! (`call_timeout`, `connection_ttl`) are carried on the target's
//! [`ConnectionConfig`](crate::ConnectionConfig) and executed by the transport.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `invm` | In-process transport and the default connector |
//! | `target` | URI resolution into a transport descriptor |

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport.
pub mod invm;

/// Resolved transport descriptor.
pub mod target;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use invm::{DefaultConnector, InVmTransport};
pub use target::{TransportKind, TransportTarget};

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::config::SessionConfig;
use crate::error::Result;

// ============================================================================
// Traits
// ============================================================================

/// Opens transports for resolved targets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `target`.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`](crate::Error::Transport) if the broker cannot be
    /// reached.
    async fn connect(&self, target: &TransportTarget) -> Result<Box<dyn Transport>>;
}

/// A live connection to the broker cluster.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a session with the given options.
    async fn open_session(&self, config: &SessionConfig) -> Result<Box<dyn TransportSession>>;

    /// Closes the connection. Called at most once by the factory.
    async fn close(&self) -> Result<()>;
}

/// Transport-level half of a [`Session`](crate::Session).
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Commits pending sends and acknowledgements.
    async fn commit(&self) -> Result<()>;

    /// Discards pending sends and acknowledgements.
    async fn rollback(&self) -> Result<()>;

    /// Closes the session. Called at most once by [`Session`](crate::Session).
    async fn close(&self) -> Result<()>;
}
