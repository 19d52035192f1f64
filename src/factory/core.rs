//! Connection factory.
//!
//! The [`ConnectionFactory`] owns one broker transport. It mints sessions,
//! creates session pools, and tears everything down on
//! [`close`](ConnectionFactory::close).
//!
//! # Example
//!
//! ```no_run
//! use broker_client::{ConnectionConfig, ConnectionFactory, SessionConfig};
//!
//! # async fn example() -> broker_client::Result<()> {
//! let factory = ConnectionFactory::new(ConnectionConfig::new("hornetq://invm")).await?;
//!
//! let count = factory
//!     .with_session(SessionConfig::default(), |session| async move {
//!         session.commit().await?;
//!         Ok::<_, broker_client::Error>(1)
//!     })
//!     .await?;
//!
//! factory.close().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::result::Result as StdResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClientConfig, ConnectionConfig, PoolConfig, SessionConfig};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::pool::SessionPool;
use crate::scope::run_scoped;
use crate::session::{Session, SessionInner};
use crate::transport::{Connector, Transport, TransportTarget};

use super::builder::FactoryBuilder;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the factory.
pub(crate) struct FactoryInner {
    /// Instance ID used in logs.
    uuid: Uuid,

    /// Resolved transport descriptor, including the connection options.
    target: TransportTarget,

    /// Live transport; `None` once closed.
    ///
    /// Session creation holds the read lock for the whole open so that close
    /// never runs against a transport mid-call.
    transport: RwLock<Option<Box<dyn Transport>>>,

    /// Set when close begins.
    closed: AtomicBool,

    /// Sessions minted by this factory and not yet closed.
    ///
    /// Held strongly: a session dropped without close is still closed here.
    sessions: Mutex<FxHashMap<SessionId, Arc<SessionInner>>>,
}

// ============================================================================
// ConnectionFactory
// ============================================================================

/// Connection to a broker cluster and source of sessions.
///
/// Clones share the same connection.
///
/// # Lifecycle
///
/// open (after [`new`](Self::new) or [`FactoryBuilder::build`]) → closed
/// (after the first [`close`](Self::close)). Once closed, session and pool
/// creation fail with [`Error::State`].
#[derive(Clone)]
pub struct ConnectionFactory {
    /// Shared inner state.
    pub(crate) inner: Arc<FactoryInner>,
}

// ============================================================================
// ConnectionFactory - Display
// ============================================================================

impl fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("uuid", &self.inner.uuid)
            .field("transport", &self.inner.target.kind)
            .field("closed", &self.is_closed())
            .field("session_count", &self.session_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionFactory - Constructors
// ============================================================================

impl ConnectionFactory {
    /// Creates a configuration builder for the factory.
    #[inline]
    #[must_use]
    pub fn builder() -> FactoryBuilder {
        FactoryBuilder::new()
    }

    /// Connects with the default connector.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URI is missing or invalid
    /// - [`Error::Transport`] if the transport cannot be opened
    pub async fn new(config: ConnectionConfig) -> Result<Self> {
        FactoryBuilder::new().config(config).build().await
    }

    /// Resolves `config` and opens a transport through `connector`.
    pub(crate) async fn connect(
        config: &ConnectionConfig,
        connector: &dyn Connector,
    ) -> Result<Self> {
        let target = TransportTarget::resolve(config)?;
        let uuid = Uuid::new_v4();
        debug!(uuid = %uuid, transport = %target.kind, "Opening transport");

        let transport = connector.connect(&target).await?;

        info!(
            uuid = %uuid,
            transport = %target.kind,
            reconnect_attempts = target.config.reconnect_attempts,
            "Connection factory opened"
        );

        Ok(Self {
            inner: Arc::new(FactoryInner {
                uuid,
                target,
                transport: RwLock::new(Some(transport)),
                closed: AtomicBool::new(false),
                sessions: Mutex::new(FxHashMap::default()),
            }),
        })
    }
}

// ============================================================================
// ConnectionFactory - Accessors
// ============================================================================

impl ConnectionFactory {
    /// Returns the instance ID.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> &Uuid {
        &self.inner.uuid
    }

    /// Returns the resolved transport descriptor.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &TransportTarget {
        &self.inner.target
    }

    /// Returns the connection options.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.target.config
    }

    /// Returns `true` once close has begun.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Returns the number of sessions minted by this factory still open.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner
            .sessions
            .lock()
            .values()
            .filter(|session| !session.is_closed())
            .count()
    }
}

// ============================================================================
// ConnectionFactory - Sessions
// ============================================================================

impl ConnectionFactory {
    /// Opens a session. The caller should [`close`](Session::close) it;
    /// otherwise it stays open until the factory closes.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `config` is invalid
    /// - [`Error::State`] if the factory is closed
    /// - [`Error::Transport`] if the transport refuses the session
    pub async fn create_session(&self, config: SessionConfig) -> Result<Session> {
        config.validate()?;

        let guard = self.inner.transport.read().await;
        let transport = guard
            .as_ref()
            .ok_or_else(|| Error::state("connection factory already closed"))?;

        let handle = transport.open_session(&config).await?;
        let session = Session::new(config, handle);

        {
            let mut sessions = self.inner.sessions.lock();
            sessions.retain(|_, session| !session.is_closed());
            sessions.insert(session.id(), Arc::clone(&session.inner));
        }

        drop(guard);

        debug!(
            uuid = %self.inner.uuid,
            session_id = %session.id(),
            "Session opened"
        );

        Ok(session)
    }

    /// Opens a session, runs `work` with it, and closes it afterwards.
    ///
    /// The session is closed on every exit path, including a failed or
    /// panicking unit of work.
    ///
    /// # Errors
    ///
    /// Any [`create_session`](Self::create_session) error, then the unit of
    /// work's error unchanged, then a close error if the work succeeded.
    pub async fn with_session<T, E, W, Fut>(&self, config: SessionConfig, work: W) -> StdResult<T, E>
    where
        W: FnOnce(Session) -> Fut,
        Fut: Future<Output = StdResult<T, E>>,
        E: From<Error>,
    {
        let session = self.create_session(config).await.map_err(E::from)?;
        run_scoped(session, work, |session| async move { session.close().await }).await
    }

    /// Creates a session pool drawing from this factory.
    ///
    /// The pool does not close the factory.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `config` is invalid
    /// - [`Error::State`] if the factory is closed
    pub fn create_session_pool(&self, config: impl Into<PoolConfig>) -> Result<SessionPool> {
        if self.is_closed() {
            return Err(Error::state("connection factory already closed"));
        }
        SessionPool::new(self.clone(), config.into())
    }
}

// ============================================================================
// ConnectionFactory - Lifecycle
// ============================================================================

impl ConnectionFactory {
    /// Closes open sessions and the transport.
    ///
    /// Every session minted here and not yet closed is closed, and awaited,
    /// before the transport. Idempotent: only the first call does any work.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error. Session close errors are logged.
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.inner.transport.write().await;
        self.inner.closed.store(true, Ordering::SeqCst);

        let Some(transport) = guard.take() else {
            return Ok(());
        };

        let sessions: Vec<Arc<SessionInner>> = {
            let mut map = self.inner.sessions.lock();
            map.drain()
                .map(|(_, session)| session)
                .filter(|session| !session.is_closed())
                .collect()
        };

        info!(
            uuid = %self.inner.uuid,
            open_sessions = sessions.len(),
            "Closing connection factory"
        );

        for session in sessions {
            if let Err(e) = session.close().await {
                warn!(session_id = %session.id(), error = %e, "Error closing session during shutdown");
            }
        }

        transport.close().await?;

        info!(uuid = %self.inner.uuid, "Connection factory closed");
        Ok(())
    }
}

// ============================================================================
// ConnectionFactory - Scoped Compositions
// ============================================================================

impl ConnectionFactory {
    /// Connects from `config.connector`, runs `work` in a session built from
    /// `config.session`, and closes both.
    ///
    /// Uses the default connector; see [`FactoryBuilder::with_session`] to
    /// supply another.
    ///
    /// # Errors
    ///
    /// Connection and session errors, the unit of work's error unchanged, or
    /// a close error if the work succeeded.
    pub async fn run_with_session<T, E, W, Fut>(config: ClientConfig, work: W) -> StdResult<T, E>
    where
        W: FnOnce(Session) -> Fut,
        Fut: Future<Output = StdResult<T, E>>,
        E: From<Error>,
    {
        FactoryBuilder::new()
            .config(config.connector)
            .with_session(config.session, work)
            .await
    }

    /// Connects from `config`, runs `work` with the factory, and closes it.
    ///
    /// # Errors
    ///
    /// Connection errors, the unit of work's error unchanged, or a close
    /// error if the work succeeded.
    pub async fn run_with_factory<T, E, W, Fut>(config: ConnectionConfig, work: W) -> StdResult<T, E>
    where
        W: FnOnce(ConnectionFactory) -> Fut,
        Fut: Future<Output = StdResult<T, E>>,
        E: From<Error>,
    {
        FactoryBuilder::new().config(config).with_factory(work).await
    }
}

// ============================================================================
// Tests
// ============================================================================
