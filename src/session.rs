//! Messaging sessions.
//!
//! A [`Session`] is one transactional context on the broker connection. Its
//! commit and acknowledgement behavior is fixed at creation by its
//! [`SessionConfig`]; see that type for the reliability trade-offs of each
//! option.
//!
//! # Example
//!
//! ```no_run
//! use broker_client::{ConnectionConfig, ConnectionFactory, SessionConfig};
//!
//! # async fn example() -> broker_client::Result<()> {
//! let factory = ConnectionFactory::new(ConnectionConfig::new("hornetq://invm")).await?;
//!
//! let session = factory.create_session(SessionConfig::transacted()).await?;
//! // ... send and acknowledge ...
//! session.commit().await?;
//! session.close().await?;
//!
//! factory.close().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::transport::TransportSession;

// ============================================================================
// Types
// ============================================================================

/// Transport session plus its close-once flag.
///
/// Shared by every handle and by the factory that minted it, so a session
/// whose handles are all dropped is still closed when the factory closes.
pub(crate) struct SessionInner {
    /// Unique session ID.
    id: SessionId,
    /// Options the session was opened with.
    config: SessionConfig,
    /// Transport-level session.
    handle: Box<dyn TransportSession>,
    /// Set by the first close.
    closed: AtomicBool,
}

impl SessionInner {
    #[inline]
    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the transport session on the first call only.
    pub(crate) async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!(session_id = %self.id, "Closing session");
        self.handle.close().await
    }
}

// ============================================================================
// Session
// ============================================================================

/// A handle to a broker session.
///
/// Clones share the same session. A session belongs to one holder at a time:
/// the caller of [`ConnectionFactory::create_session`](crate::ConnectionFactory::create_session),
/// a scoped unit of work, or a pool lease. Clones exist so a scope can keep a
/// handle for release; they must not be used to share the session between
/// concurrent units of work.
///
/// Handles taken from a [`SessionPool`](crate::SessionPool) stop working when
/// the lease ends: commit and rollback fail with [`Error::State`] and close
/// does nothing, since the session now belongs to the pool again.
///
/// [`close`](Self::close) may be called any number of times; the transport
/// session is closed exactly once. A session dropped without close stays
/// open until its factory closes.
#[derive(Clone)]
pub struct Session {
    /// Shared inner state.
    pub(crate) inner: Arc<SessionInner>,
    /// Set when the pool lease this handle came from ends.
    revoked: Option<Arc<AtomicBool>>,
}

// ============================================================================
// Session - Display
// ============================================================================

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Constructor
// ============================================================================

impl Session {
    /// Wraps a freshly opened transport session.
    pub(crate) fn new(config: SessionConfig, handle: Box<dyn TransportSession>) -> Self {
        let id = SessionId::next();
        debug!(session_id = %id, xa = config.xa, transacted = config.is_transacted(), "Session created");

        Self {
            inner: Arc::new(SessionInner {
                id,
                config,
                handle,
                closed: AtomicBool::new(false),
            }),
            revoked: None,
        }
    }

    /// Returns a handle that stops working once `revoked` is set.
    pub(crate) fn leased(&self, revoked: Arc<AtomicBool>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            revoked: Some(revoked),
        }
    }

    /// Returns an unrestricted handle to the same session.
    pub(crate) fn detached(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            revoked: None,
        }
    }

    fn is_revoked(&self) -> bool {
        self.revoked
            .as_ref()
            .is_some_and(|revoked| revoked.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Returns the options the session was opened with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Returns `true` if work waits for an explicit commit.
    #[inline]
    #[must_use]
    pub fn is_transacted(&self) -> bool {
        self.inner.config.is_transacted()
    }

    /// Returns `true` once the session is closed or this handle's pool
    /// lease has ended.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed() || self.is_revoked()
    }
}

// ============================================================================
// Session - Transactions
// ============================================================================

impl Session {
    /// Commits buffered sends and acknowledgements.
    ///
    /// # Errors
    ///
    /// - [`Error::State`] if the session is closed or the lease has ended
    /// - [`Error::Transport`] if the broker rejects the commit
    pub async fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        self.inner.handle.commit().await?;
        debug!(session_id = %self.inner.id, "Session committed");
        Ok(())
    }

    /// Discards buffered sends and acknowledgements.
    ///
    /// # Errors
    ///
    /// - [`Error::State`] if the session is closed or the lease has ended
    /// - [`Error::Transport`] if the broker rejects the rollback
    pub async fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        self.inner.handle.rollback().await?;
        debug!(session_id = %self.inner.id, "Session rolled back");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.is_closed() {
            return Err(Error::state(format!("{} is closed", self.inner.id)));
        }
        if self.is_revoked() {
            return Err(Error::state(format!(
                "{} was returned to its pool",
                self.inner.id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Session - Lifecycle
// ============================================================================

impl Session {
    /// Closes the session.
    ///
    /// Only the first call reaches the transport; later calls return `Ok`.
    /// On a handle whose pool lease has ended this does nothing.
    ///
    /// # Errors
    ///
    /// Returns the transport's error from the first close.
    pub async fn close(&self) -> Result<()> {
        if self.is_revoked() {
            return Ok(());
        }
        self.inner.close().await
    }
}

// ============================================================================
// Tests
// ============================================================================
