//! Connection factory module.
//!
//! This module provides the main entry point for talking to a broker.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionFactory`] | Broker connection and source of sessions |
//! | [`FactoryBuilder`] | Fluent configuration builder |
//!
//! # Example
//!
//! ```no_run
//! use broker_client::{ConnectionFactory, Result};
//!
//! # async fn example() -> Result<()> {
//! let factory = ConnectionFactory::builder()
//!     .uri("hornetq://invm")
//!     .build()
//!     .await?;
//!
//! let pool = factory.create_session_pool(broker_client::PoolConfig::default())?;
//! pool.with_session(|session| async move { session.commit().await }).await?;
//!
//! pool.close().await;
//! factory.close().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for factory configuration.
pub mod builder;

/// Core factory implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::FactoryBuilder;
pub use core::ConnectionFactory;
