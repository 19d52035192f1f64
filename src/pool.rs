//! Bounded pool of reusable sessions.
//!
//! A [`SessionPool`] hands sessions built from one [`ConnectionFactory`] and
//! one [`SessionConfig`](crate::SessionConfig) template to concurrent units
//! of work, at most one holder per session.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               SessionPool                │
//! │  permits: Semaphore(max_size)            │
//! │  ┌────────────────────────────────────┐  │
//! │  │ idle:   [session-3, session-7]     │  │
//! │  │ leased: {session-1, session-4}     │  │
//! │  │ total:  4                          │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────┬───────────────────────┘
//!                    │ create_session (below max_size)
//!                    ▼
//!            ConnectionFactory
//! ```
//!
//! A lease holds one semaphore permit until release. Saturated leases fail
//! fast or wait, according to [`PoolConfig::lease_timeout`].
//!
//! Sessions are opened lazily: a lease reuses an idle session when one
//! exists and opens a new one only while every existing session is leased.
//!
//! A lease is a [`PooledSession`]. Releasing it consumes it, and any
//! [`Session`] handle cloned from it stops working. Dropping it without
//! release frees its slot; the session is closed on the pool's next lease
//! or close.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::factory::ConnectionFactory;
use crate::identifiers::SessionId;
use crate::scope::run_scoped;
use crate::session::Session;

// ============================================================================
// PoolStatus
// ============================================================================

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Configured capacity.
    pub max_size: usize,
    /// Sessions owned by the pool, idle and leased.
    pub total: usize,
    /// Sessions ready to lease.
    pub idle: usize,
    /// Sessions currently held by callers.
    pub leased: usize,
}

// ============================================================================
// Internal State
// ============================================================================

/// Bookkeeping guarded by the pool mutex.
#[derive(Default)]
struct PoolState {
    /// Open sessions waiting for a lease.
    idle: Vec<Session>,
    /// Sessions held by callers.
    leased: FxHashSet<SessionId>,
    /// Idle, leased and in-creation sessions.
    total: usize,
    /// Sessions of dropped leases, waiting to be closed.
    orphans: Vec<Session>,
    /// Set by close.
    closed: bool,
}

/// Shared pool internals.
struct PoolInner {
    /// Source of new sessions. Never closed by the pool.
    factory: ConnectionFactory,
    /// Capacity and session template.
    config: PoolConfig,
    /// One permit per session that may be leased.
    permits: Semaphore,
    /// Idle/leased bookkeeping.
    state: Mutex<PoolState>,
}

/// Counts a session being created until it is handed out.
struct Reservation<'a> {
    state: &'a Mutex<PoolState>,
    armed: bool,
}

impl Reservation<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            state.total = state.total.saturating_sub(1);
        }
    }
}

// ============================================================================
// SessionPool
// ============================================================================

/// Bounded pool of sessions over a [`ConnectionFactory`].
///
/// Cloning yields another handle to the same pool. Closing the pool closes
/// its idle sessions but leaves the factory open.
///
/// # Example
///
/// ```no_run
/// use broker_client::{ConnectionConfig, ConnectionFactory, PoolConfig};
///
/// # async fn example() -> broker_client::Result<()> {
/// let factory = ConnectionFactory::new(ConnectionConfig::new("hornetq://invm")).await?;
/// let pool = factory.create_session_pool(PoolConfig::new().with_max_size(4))?;
///
/// pool.with_session(|session| async move { session.commit().await }).await?;
///
/// let lease = pool.lease().await?;
/// lease.commit().await?;
/// lease.release().await?;
///
/// pool.close().await;
/// factory.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("name", &self.inner.config.name)
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionPool - Constructor
// ============================================================================

impl SessionPool {
    /// Creates an empty pool. Sessions are opened on demand.
    pub(crate) fn new(factory: ConnectionFactory, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        info!(
            pool = %config.name,
            max_size = config.max_size,
            lease_timeout_ms = config.lease_timeout.map(|t| t.as_millis() as u64),
            "Session pool created"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                factory,
                permits: Semaphore::new(config.max_size),
                config,
                state: Mutex::new(PoolState::default()),
            }),
        })
    }
}

// ============================================================================
// SessionPool - Accessors
// ============================================================================

impl SessionPool {
    /// Returns the pool name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Returns the pool configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Returns the factory sessions are drawn from.
    #[inline]
    #[must_use]
    pub fn factory(&self) -> &ConnectionFactory {
        &self.inner.factory
    }

    /// Returns `true` once the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Returns current occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock();
        PoolStatus {
            max_size: self.inner.config.max_size,
            total: state.total,
            idle: state.idle.len(),
            leased: state.leased.len(),
        }
    }
}

// ============================================================================
// SessionPool - Leasing
// ============================================================================

impl SessionPool {
    /// Takes a session out of the pool.
    ///
    /// Reuses an idle session, or opens one while below capacity. Hand the
    /// lease back with [`PooledSession::release`]; dropping it instead frees
    /// the slot and discards the session.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolExhausted`] if no session frees up in time
    /// - [`Error::State`] if the pool closes first
    /// - any [`ConnectionFactory::create_session`] error
    pub async fn lease(&self) -> Result<PooledSession> {
        self.close_orphans().await;

        let started = Instant::now();
        let permit = self.acquire_permit().await?;

        let waited = started.elapsed();
        if waited >= self.inner.config.warn_timeout {
            warn!(
                pool = %self.inner.config.name,
                waited_ms = waited.as_millis() as u64,
                "Slow session lease"
            );
        }

        let session = self.checkout().await?;
        permit.forget();

        debug!(pool = %self.inner.config.name, session_id = %session.id(), "Session leased");

        let revoked = Arc::new(AtomicBool::new(false));
        Ok(PooledSession {
            pool: self.clone(),
            session: session.leased(Arc::clone(&revoked)),
            revoked,
            settled: false,
        })
    }

    /// Returns a lease to this pool.
    ///
    /// Same as [`PooledSession::release`], after checking that the lease
    /// came from this pool.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if `lease` belongs to another pool; that pool
    ///   then discards it as if it were dropped
    /// - the session's close error when it is closed on release
    pub async fn release(&self, lease: PooledSession) -> Result<()> {
        if !Arc::ptr_eq(&self.inner, &lease.pool.inner) {
            return Err(Error::protocol(format!(
                "{} is not leased from session pool '{}'",
                lease.id(),
                self.inner.config.name
            )));
        }
        lease.release().await
    }

    /// Leases a session, runs `work` with it, and releases it afterwards.
    ///
    /// The session is released on every exit path. If the returned future is
    /// dropped before completion, the slot is reclaimed and the session is
    /// discarded. The handle given to `work` stops working after release.
    ///
    /// # Errors
    ///
    /// Any [`lease`](Self::lease) error, then the unit of work's error
    /// unchanged, then a release error if the work succeeded.
    pub async fn with_session<T, E, W, Fut>(&self, work: W) -> StdResult<T, E>
    where
        W: FnOnce(Session) -> Fut,
        Fut: Future<Output = StdResult<T, E>>,
        E: From<Error>,
    {
        let lease = self.lease().await.map_err(E::from)?;
        let session = Session::clone(&lease);

        run_scoped(session, work, move |_session| lease.release()).await
    }

    async fn acquire_permit(&self) -> Result<SemaphorePermit<'_>> {
        let config = &self.inner.config;
        let exhausted = || Error::pool_exhausted(config.name.clone(), config.max_size);

        if self.is_closed() {
            return Err(self.closed_error());
        }

        match config.lease_timeout {
            None => match self.inner.permits.try_acquire() {
                Ok(permit) => Ok(permit),
                Err(TryAcquireError::NoPermits) => Err(exhausted()),
                Err(TryAcquireError::Closed) => Err(self.closed_error()),
            },
            Some(wait) => match timeout(wait, self.inner.permits.acquire()).await {
                Ok(Ok(permit)) => Ok(permit),
                Ok(Err(_)) => Err(self.closed_error()),
                Err(_) => Err(exhausted()),
            },
        }
    }

    async fn checkout(&self) -> Result<Session> {
        loop {
            let reused = {
                let mut state = self.inner.state.lock();
                if state.closed {
                    return Err(self.closed_error());
                }
                match state.idle.pop() {
                    Some(session) if session.is_closed() => {
                        state.total = state.total.saturating_sub(1);
                        debug!(session_id = %session.id(), "Discarding closed idle session");
                        continue;
                    }
                    Some(session) => {
                        state.leased.insert(session.id());
                        Some(session)
                    }
                    None => {
                        state.total += 1;
                        None
                    }
                }
            };

            if let Some(session) = reused {
                return Ok(session);
            }

            let reservation = Reservation {
                state: &self.inner.state,
                armed: true,
            };
            let session = self
                .inner
                .factory
                .create_session(self.inner.config.session.clone())
                .await?;

            let closed = {
                let mut state = self.inner.state.lock();
                if !state.closed {
                    state.leased.insert(session.id());
                }
                state.closed
            };

            if closed {
                drop(reservation);
                if let Err(e) = session.close().await {
                    warn!(session_id = %session.id(), error = %e, "Error closing session opened during pool close");
                }
                return Err(self.closed_error());
            }

            reservation.disarm();
            return Ok(session);
        }
    }

    /// Puts a released session back in the idle set, or closes it when the
    /// pool is closed or the caller closed it.
    async fn give_back(&self, session: &Session, revoked: &AtomicBool) -> Result<()> {
        revoked.store(true, Ordering::SeqCst);

        let discard = {
            let mut state = self.inner.state.lock();
            if !state.leased.remove(&session.id()) {
                return Err(Error::protocol(format!(
                    "{} is not leased from session pool '{}'",
                    session.id(),
                    self.inner.config.name
                )));
            }

            if state.closed || session.inner.is_closed() {
                state.total = state.total.saturating_sub(1);
                true
            } else {
                state.idle.push(session.detached());
                false
            }
        };
        self.inner.permits.add_permits(1);

        if discard {
            debug!(pool = %self.inner.config.name, session_id = %session.id(), "Released session discarded");
            return session.inner.close().await;
        }

        debug!(pool = %self.inner.config.name, session_id = %session.id(), "Session released");
        Ok(())
    }

    /// Frees the slot of a lease dropped without release.
    ///
    /// The session may hold unfinished work, so it is never reused; it is
    /// closed by the next [`lease`](Self::lease) or [`close`](Self::close).
    fn discard(&self, session: &Session, revoked: &AtomicBool) {
        revoked.store(true, Ordering::SeqCst);

        let removed = {
            let mut state = self.inner.state.lock();
            let removed = state.leased.remove(&session.id());
            if removed {
                state.total = state.total.saturating_sub(1);
                if !session.inner.is_closed() {
                    state.orphans.push(session.detached());
                }
            }
            removed
        };

        if removed {
            self.inner.permits.add_permits(1);
            warn!(
                pool = %self.inner.config.name,
                session_id = %session.id(),
                "Lease dropped without release; session discarded"
            );
        }
    }

    async fn close_orphans(&self) {
        let orphans = std::mem::take(&mut self.inner.state.lock().orphans);
        for session in orphans {
            if let Err(e) = session.close().await {
                warn!(session_id = %session.id(), error = %e, "Error closing discarded session");
            }
        }
    }

    fn closed_error(&self) -> Error {
        Error::state(format!("session pool '{}' is closed", self.inner.config.name))
    }
}

// ============================================================================
// SessionPool - Lifecycle
// ============================================================================

impl SessionPool {
    /// Closes the pool.
    ///
    /// New and waiting leases fail with [`Error::State`]. Idle and discarded
    /// sessions are closed now, leased ones when released. The factory stays
    /// open. Idempotent.
    pub async fn close(&self) {
        let idle = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.total = state.total.saturating_sub(state.idle.len());
            let mut idle = std::mem::take(&mut state.idle);
            idle.append(&mut state.orphans);
            idle
        };
        self.inner.permits.close();

        info!(
            pool = %self.inner.config.name,
            idle = idle.len(),
            "Closing session pool"
        );

        for session in idle {
            if let Err(e) = session.close().await {
                warn!(session_id = %session.id(), error = %e, "Error closing idle session");
            }
        }
    }
}

// ============================================================================
// PooledSession
// ============================================================================

/// A session leased from a [`SessionPool`].
///
/// Dereferences to the [`Session`]. [`release`](Self::release) hands it
/// back; dropping it frees the pool slot and discards the session.
#[must_use = "dropping a lease discards its session"]
pub struct PooledSession {
    /// Owning pool.
    pool: SessionPool,
    /// Lease-scoped handle.
    session: Session,
    /// Revokes `session` and every clone of it.
    revoked: Arc<AtomicBool>,
    /// Set once released.
    settled: bool,
}

impl PooledSession {
    /// Returns the session to its pool.
    ///
    /// Handles cloned from this lease stop working. A session the caller
    /// already closed is discarded and its slot freed; after the pool is
    /// closed, released sessions are closed.
    ///
    /// # Errors
    ///
    /// The session's close error when it is closed on release.
    pub async fn release(mut self) -> Result<()> {
        self.settled = true;
        self.pool.give_back(&self.session, &self.revoked).await
    }

    /// Returns the pool this lease belongs to.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }
}

impl Deref for PooledSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSession")
            .field("pool", &self.pool.inner.config.name)
            .field("session", &self.session)
            .finish()
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if !self.settled {
            self.pool.discard(&self.session, &self.revoked);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures_util::future::join_all;

    use crate::transport::mock::{MockConnector, MockState};

    async fn setup(config: PoolConfig) -> (MockConnector, ConnectionFactory, SessionPool) {
        let connector = MockConnector::new();
        let factory = ConnectionFactory::builder()
            .uri("x://localhost")
            .connector(connector.clone())
            .build()
            .await
            .expect("factory");
        let pool = factory.create_session_pool(config).expect("pool");
        (connector, factory, pool)
    }

    #[test]
    fn test_pool_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync>() {}
        assert_traits::<SessionPool>();
    }

    #[test]
    fn test_lease_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PooledSession>();
    }

    #[tokio::test]
    async fn test_zero_capacity_is_config_error() {
        let connector = MockConnector::new();
        let factory = ConnectionFactory::builder()
            .uri("x://localhost")
            .connector(connector)
            .build()
            .await
            .unwrap();

        let err = factory
            .create_session_pool(PoolConfig::new().with_max_size(0))
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_concurrent_leases_never_share_a_session() {
        let (connector, _factory, pool) = setup(PoolConfig::new().with_max_size(4)).await;
        let in_use = Arc::new(Mutex::new(FxHashSet::default()));

        let tasks = (0..4).map(|_| {
            let in_use = Arc::clone(&in_use);
            pool.with_session(move |session| async move {
                assert!(in_use.lock().insert(session.id()), "session leased twice");
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_use.lock().remove(&session.id());
                Ok::<_, Error>(())
            })
        });

        for result in join_all(tasks).await {
            assert!(result.is_ok());
        }

        assert_eq!(MockState::count(&connector.state.sessions_opened), 4);
        let status = pool.status();
        assert_eq!(status.idle, 4);
        assert_eq!(status.leased, 0);
    }

    #[tokio::test]
    async fn test_sequential_leases_reuse_idle_session() {
        let (connector, _factory, pool) = setup(PoolConfig::new().with_max_size(2)).await;

        for _ in 0..3 {
            pool.with_session(|session| async move { session.commit().await })
                .await
                .unwrap();
        }

        // Lazy creation: a second session is only opened under contention.
        assert_eq!(MockState::count(&connector.state.sessions_opened), 1);
        assert_eq!(MockState::count(&connector.state.commits), 3);
    }

    #[tokio::test]
    async fn test_full_capacity_then_sequential_work_opens_no_more() {
        let (connector, _factory, pool) = setup(PoolConfig::new().with_max_size(2)).await;

        let first = pool.lease().await.unwrap();
        let second = pool.lease().await.unwrap();
        assert_ne!(first.id(), second.id());
        first.release().await.unwrap();
        second.release().await.unwrap();

        for _ in 0..3 {
            pool.with_session(|session| async move { session.commit().await })
                .await
                .unwrap();
        }

        assert_eq!(MockState::count(&connector.state.sessions_opened), 2);
        assert_eq!(MockState::count(&connector.state.commits), 3);
        let status = pool.status();
        assert_eq!(status.total, 2);
        assert_eq!(status.idle, 2);
    }

    #[tokio::test]
    async fn test_fail_fast_when_exhausted() {
        let (_connector, _factory, pool) = setup(PoolConfig::new().with_max_size(1)).await;

        let held = pool.lease().await.unwrap();
        let held_id = held.id();
        let err = pool.lease().await.unwrap_err();
        assert!(matches!(err, Error::PoolExhausted { max_size: 1, .. }));
        assert!(err.is_recoverable());

        pool.release(held).await.unwrap();
        let again = pool.lease().await.unwrap();
        assert_eq!(again.id(), held_id);
    }

    #[tokio::test]
    async fn test_timed_wait_gets_released_session() {
        let config = PoolConfig::new()
            .with_max_size(1)
            .with_lease_timeout(Duration::from_secs(2));
        let (_connector, _factory, pool) = setup(config).await;

        let held = pool.lease().await.unwrap();
        let held_id = held.id();
        let (waiter, released) = tokio::join!(pool.lease(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            held.release().await
        });

        released.unwrap();
        assert_eq!(waiter.unwrap().id(), held_id);
    }

    #[tokio::test]
    async fn test_timed_wait_times_out() {
        let config = PoolConfig::new()
            .with_max_size(1)
            .with_lease_timeout(Duration::from_millis(20));
        let (_connector, _factory, pool) = setup(config).await;

        let _held = pool.lease().await.unwrap();
        let err = pool.lease().await.unwrap_err();
        assert!(matches!(err, Error::PoolExhausted { .. }));
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let config = PoolConfig::new()
            .with_max_size(1)
            .with_lease_timeout(Duration::from_secs(5));
        let (_connector, _factory, pool) = setup(config).await;

        let _held = pool.lease().await.unwrap();
        let (waiter, ()) = tokio::join!(pool.lease(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            pool.close().await;
        });

        assert!(waiter.unwrap_err().is_state_error());
        assert!(pool.lease().await.unwrap_err().is_state_error());
    }

    #[tokio::test]
    async fn test_release_into_other_pool_is_protocol_error() {
        let (connector, factory, pool) = setup(PoolConfig::new().with_max_size(1)).await;
        let other = factory.create_session_pool(PoolConfig::new().with_name("other")).unwrap();

        let lease = pool.lease().await.unwrap();
        let err = other.release(lease).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(err.to_string().contains("'other'"));

        let status = pool.status();
        assert_eq!(status.total, 0);
        assert_eq!(status.leased, 0);
        assert_eq!(other.status().total, 0);

        let _fresh = pool.lease().await.unwrap();
        assert_eq!(MockState::count(&connector.state.session_closes), 1);
    }

    #[tokio::test]
    async fn test_dropped_lease_frees_its_slot() {
        let (connector, _factory, pool) = setup(PoolConfig::new().with_max_size(1)).await;

        drop(pool.lease().await.unwrap());

        let status = pool.status();
        assert_eq!(status.total, 0);
        assert_eq!(status.leased, 0);
        assert_eq!(MockState::count(&connector.state.session_closes), 0);

        let second = pool.lease().await.unwrap();
        assert_eq!(MockState::count(&connector.state.session_closes), 1);
        assert_eq!(MockState::count(&connector.state.sessions_opened), 2);
        second.release().await.unwrap();
        assert_eq!(pool.status().idle, 1);
    }

    #[tokio::test]
    async fn test_pool_close_closes_dropped_lease_session() {
        let (connector, factory, pool) = setup(PoolConfig::new().with_max_size(1)).await;

        drop(pool.lease().await.unwrap());
        pool.close().await;

        assert_eq!(MockState::count(&connector.state.session_closes), 1);
        assert_eq!(factory.session_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_from_released_lease_is_rejected() {
        let (connector, _factory, pool) = setup(PoolConfig::new().with_max_size(1)).await;

        let lease = pool.lease().await.unwrap();
        let stale = Session::clone(&lease);
        lease.release().await.unwrap();

        let err = stale.commit().await.unwrap_err();
        assert!(err.is_state_error());

        let next = pool.lease().await.unwrap();
        assert_eq!(next.id(), stale.id());
        stale.close().await.unwrap();
        assert!(!next.is_closed());
        next.commit().await.unwrap();

        assert_eq!(MockState::count(&connector.state.commits), 1);
        assert_eq!(MockState::count(&connector.state.session_closes), 0);
    }

    #[tokio::test]
    async fn test_session_escaping_scope_is_rejected() {
        let (_connector, _factory, pool) = setup(PoolConfig::default()).await;

        let escaped = pool
            .with_session(|session| async move { Ok::<_, Error>(session) })
            .await
            .unwrap();

        assert!(escaped.commit().await.unwrap_err().is_state_error());
        assert_eq!(pool.status().idle, 1);
    }

    #[tokio::test]
    async fn test_caller_closed_session_is_discarded() {
        let (connector, _factory, pool) = setup(PoolConfig::new().with_max_size(1)).await;

        let lease = pool.lease().await.unwrap();
        let closed_id = lease.id();
        lease.close().await.unwrap();
        lease.release().await.unwrap();
        assert_eq!(pool.status().total, 0);

        let fresh = pool.lease().await.unwrap();
        assert_ne!(fresh.id(), closed_id);
        assert_eq!(MockState::count(&connector.state.sessions_opened), 2);
    }

    #[tokio::test]
    async fn test_work_failure_returns_session_to_pool() {
        let (_connector, _factory, pool) = setup(PoolConfig::default()).await;

        let result: Result<()> = pool
            .with_session(|_session| async { Err(Error::protocol("unit of work failed")) })
            .await;

        assert!(matches!(result, Err(Error::Protocol { .. })));
        let status = pool.status();
        assert_eq!(status.idle, 1);
        assert_eq!(status.leased, 0);
    }

    #[tokio::test]
    async fn test_abandoned_scope_reclaims_slot() {
        let (connector, _factory, pool) = setup(PoolConfig::new().with_max_size(1)).await;

        let scoped = pool.with_session(|_session| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, Error>(())
        });
        assert!(timeout(Duration::from_millis(10), scoped).await.is_err());

        let status = pool.status();
        assert_eq!(status.total, 0);
        assert_eq!(status.leased, 0);

        assert!(pool.lease().await.is_ok());
        assert_eq!(MockState::count(&connector.state.session_closes), 1);
    }

    #[tokio::test]
    async fn test_close_keeps_factory_open() {
        let (connector, factory, pool) = setup(PoolConfig::default()).await;

        pool.with_session(|_session| async { Ok::<_, Error>(()) })
            .await
            .unwrap();
        pool.close().await;
        pool.close().await;

        assert!(pool.is_closed());
        assert!(!factory.is_closed());
        assert_eq!(MockState::count(&connector.state.session_closes), 1);
        assert_eq!(MockState::count(&connector.state.transport_closes), 0);
        assert_eq!(pool.status().total, 0);
    }

    #[tokio::test]
    async fn test_release_after_close_closes_session() {
        let (_connector, _factory, pool) = setup(PoolConfig::default()).await;

        let lease = pool.lease().await.unwrap();
        let inner = Arc::clone(&lease.inner);
        pool.close().await;
        lease.release().await.unwrap();

        assert!(inner.is_closed());
        assert_eq!(pool.status().total, 0);
    }

    #[tokio::test]
    async fn test_slow_lease_still_succeeds() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("broker_client=warn")
            .with_test_writer()
            .try_init();

        let config = PoolConfig::new()
            .with_max_size(1)
            .with_lease_timeout(Duration::from_secs(1))
            .with_warn_timeout(Duration::ZERO);
        let (_connector, _factory, pool) = setup(config).await;

        let lease = pool.lease().await.unwrap();
        lease.release().await.unwrap();
        assert_eq!(pool.status().idle, 1);
    }

    #[tokio::test]
    async fn test_lease_on_closed_factory() {
        let (_connector, factory, pool) = setup(PoolConfig::default()).await;
        factory.close().await.unwrap();

        assert!(pool.lease().await.unwrap_err().is_state_error());
        assert_eq!(pool.status().total, 0);
    }
}
