//! Broker client - connection factory, sessions and session pooling.
//!
//! This library connects to a HornetQ-style message broker cluster and hands
//! out messaging sessions, either directly, scoped to a unit of work, or from
//! a bounded pool.
//!
//! # Architecture
//!
//! The client is layered over a pluggable transport:
//!
//! - **Factory**: resolves a broker URI into a transport target and owns the
//!   open transport
//! - **Sessions**: transactional contexts minted by the factory, closed
//!   exactly once
//! - **Pool**: bounded set of reusable sessions, one holder per session
//! - **Transport**: [`Connector`] implementations; `invm` is built in
//!
//! Key design principles:
//!
//! - Every resource has a scoped form that releases it on all exit paths
//! - Close is idempotent everywhere
//! - Units of work keep their own error type (`E: From<Error>`)
//!
//! # Quick Start
//!
//! ```no_run
//! use broker_client::{ConnectionFactory, Result, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let factory = ConnectionFactory::builder()
//!         .uri("hornetq://invm")
//!         .build()
//!         .await?;
//!
//!     factory
//!         .with_session(SessionConfig::transacted(), |session| async move {
//!             // ... produce and consume ...
//!             session.commit().await
//!         })
//!         .await?;
//!
//!     factory.close().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Connection, session and pool options; URI parsing |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`factory`] | [`ConnectionFactory`] and its builder |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`pool`] | [`SessionPool`] and [`PooledSession`] leases |
//! | [`scope`] | Scoped resource helper |
//! | [`session`] | [`Session`] handle |
//! | [`transport`] | Transport traits and the in-VM transport |

// ============================================================================
// Modules
// ============================================================================

/// Connection, session and pool options.
///
/// Options deserialize from JSON or maps; unknown keys are rejected.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Connection factory and configuration builder.
///
/// Use [`ConnectionFactory::builder()`] to create a configured factory.
pub mod factory;

/// Type-safe identifiers.
pub mod identifiers;

/// Bounded session pool.
pub mod pool;

/// Block-scoped resource lifecycle.
pub mod scope;

/// Broker sessions.
pub mod session;

/// Transport abstraction.
///
/// Internal seam between the factory and the wire; supply a [`Connector`]
/// for network transports.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{ClientConfig, ConnectionConfig, ConnectionUri, Endpoint, PoolConfig, Protocol, SessionConfig};

// Error types
pub use error::{Error, Result};

// Factory types
pub use factory::{ConnectionFactory, FactoryBuilder};

// Identifier types
pub use identifiers::SessionId;

// Pool types
pub use pool::{PoolStatus, PooledSession, SessionPool};

// Session types
pub use session::Session;

// Transport types
pub use transport::{
    Connector, DefaultConnector, InVmTransport, Transport, TransportKind, TransportSession,
    TransportTarget,
};
