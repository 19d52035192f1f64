//! Builder pattern for connection factory configuration.
//!
//! Provides a fluent API for configuring and opening [`ConnectionFactory`]
//! instances, and the scoped forms that open, use and close one in a single
//! call.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use broker_client::{ConnectionFactory, SessionConfig};
//!
//! # async fn example() -> broker_client::Result<()> {
//! let value = ConnectionFactory::builder()
//!     .uri("hornetq://invm")
//!     .call_timeout(Duration::from_secs(5))
//!     .with_session(SessionConfig::default(), |session| async move {
//!         session.commit().await?;
//!         Ok::<_, broker_client::Error>(42)
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConnectionConfig, SessionConfig};
use crate::error::{Error, Result};
use crate::scope::run_scoped;
use crate::session::Session;
use crate::transport::{Connector, DefaultConnector};

use super::core::ConnectionFactory;

// ============================================================================
// FactoryBuilder
// ============================================================================

/// Builder for configuring a [`ConnectionFactory`].
///
/// Use [`ConnectionFactory::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct FactoryBuilder {
    /// Connection options.
    config: ConnectionConfig,
    /// Transport connector; [`DefaultConnector`] when unset.
    connector: Option<Arc<dyn Connector>>,
}

impl fmt::Debug for FactoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryBuilder")
            .field("config", &self.config)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// FactoryBuilder Implementation
// ============================================================================

impl FactoryBuilder {
    /// Creates a new builder with default options and no URI.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all connection options.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the broker URI.
    ///
    /// # Arguments
    ///
    /// * `uri` - e.g. "hornetq://broker1:5445,broker2" or "hornetq://invm"
    #[inline]
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.config.uri = Some(uri.into());
        self
    }

    /// Sets the timeout for blocking broker calls.
    #[inline]
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Sets the reconnect attempt count; `-1` retries forever.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(mut self, attempts: i32) -> Self {
        self.config.reconnect_attempts = attempts;
        self
    }

    /// Sets the connector that opens the transport.
    ///
    /// Required for netty and discovery URIs.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Opens the factory.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URI is missing or an option is invalid
    /// - [`Error::Transport`] if the connector fails
    pub async fn build(self) -> Result<ConnectionFactory> {
        match self.connector {
            Some(connector) => ConnectionFactory::connect(&self.config, connector.as_ref()).await,
            None => ConnectionFactory::connect(&self.config, &DefaultConnector).await,
        }
    }
}

// ============================================================================
// Scoped Forms
// ============================================================================

impl FactoryBuilder {
    /// Opens the factory, runs `work` with it, and closes it afterwards.
    ///
    /// # Errors
    ///
    /// Any [`build`](Self::build) error, then the unit of work's error
    /// unchanged, then a close error if the work succeeded.
    pub async fn with_factory<T, E, W, Fut>(self, work: W) -> StdResult<T, E>
    where
        W: FnOnce(ConnectionFactory) -> Fut,
        Fut: Future<Output = StdResult<T, E>>,
        E: From<Error>,
    {
        let factory = self.build().await.map_err(E::from)?;
        run_scoped(factory, work, |factory| async move { factory.close().await }).await
    }

    /// Opens the factory and one session, runs `work` with the session, and
    /// closes both.
    ///
    /// The session is closed before the factory.
    ///
    /// # Errors
    ///
    /// Connection and session errors, the unit of work's error unchanged, or
    /// a close error if the work succeeded.
    pub async fn with_session<T, E, W, Fut>(self, session: SessionConfig, work: W) -> StdResult<T, E>
    where
        W: FnOnce(Session) -> Fut,
        Fut: Future<Output = StdResult<T, E>>,
        E: From<Error>,
    {
        self.with_factory(move |factory| async move { factory.with_session(session, work).await })
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
