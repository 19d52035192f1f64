//! In-process transport.
//!
//! [`InVmTransport`] stands in for a broker embedded in the same process. It
//! performs no I/O: sessions are bookkept in memory and commits/rollbacks are
//! counted. [`DefaultConnector`] serves `invm` targets with it and refuses
//! network targets, which need an application-supplied [`Connector`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{Error, Result};

use super::{Connector, Transport, TransportKind, TransportSession, TransportTarget};

// ============================================================================
// DefaultConnector
// ============================================================================

/// Connector used when none is supplied to the factory builder.
///
/// Serves [`TransportKind::InVm`]; returns [`Error::Transport`] for netty and
/// discovery targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConnector;

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self, target: &TransportTarget) -> Result<Box<dyn Transport>> {
        match &target.kind {
            TransportKind::InVm => Ok(Box::new(InVmTransport::new())),
            other => Err(Error::transport(format!(
                "no connector installed for {} transport ({other}); \
                 supply one with FactoryBuilder::connector",
                other.protocol()
            ))),
        }
    }
}

// ============================================================================
// InVmTransport
// ============================================================================

/// Shared state of an in-process transport.
#[derive(Debug, Default)]
struct InVmState {
    /// Set once the transport is closed.
    closed: AtomicBool,
    /// Sessions opened over the transport's lifetime.
    opened: AtomicU64,
    /// Commits across all sessions.
    commits: AtomicU64,
    /// Rollbacks across all sessions.
    rollbacks: AtomicU64,
    /// Sequence numbers of sessions not yet closed.
    live: Mutex<FxHashSet<u64>>,
}

/// In-process transport with observable counters.
///
/// Cloning yields another handle to the same transport.
#[derive(Debug, Clone, Default)]
pub struct InVmTransport {
    /// Shared state.
    state: Arc<InVmState>,
}

impl InVmTransport {
    /// Creates an open in-process transport.
    #[must_use]
    pub fn new() -> Self {
        info!("In-VM transport opened");
        Self::default()
    }

    /// Returns the number of sessions opened so far.
    #[inline]
    #[must_use]
    pub fn sessions_opened(&self) -> u64 {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Returns the number of sessions currently open.
    #[inline]
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.state.live.lock().len()
    }

    /// Returns the number of commits across all sessions.
    #[inline]
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.state.commits.load(Ordering::SeqCst)
    }

    /// Returns the number of rollbacks across all sessions.
    #[inline]
    #[must_use]
    pub fn rollbacks(&self) -> u64 {
        self.state.rollbacks.load(Ordering::SeqCst)
    }

    /// Returns `true` once the transport is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for InVmTransport {
    async fn open_session(&self, config: &SessionConfig) -> Result<Box<dyn TransportSession>> {
        if self.is_closed() {
            return Err(Error::transport("in-vm transport is closed"));
        }

        let seq = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.live.lock().insert(seq);
        debug!(seq, xa = config.xa, "In-VM session opened");

        Ok(Box::new(InVmSession {
            seq,
            state: Arc::clone(&self.state),
        }))
    }

    async fn close(&self) -> Result<()> {
        if !self.state.closed.swap(true, Ordering::SeqCst) {
            let live = self.state.live.lock().len();
            info!(live_sessions = live, "In-VM transport closed");
        }
        Ok(())
    }
}

// ============================================================================
// InVmSession
// ============================================================================

/// Session over an [`InVmTransport`].
struct InVmSession {
    /// Sequence number within the transport.
    seq: u64,
    /// Shared transport state.
    state: Arc<InVmState>,
}

impl InVmSession {
    fn ensure_connected(&self) -> Result<()> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(Error::transport("in-vm transport is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl TransportSession for InVmSession {
    async fn commit(&self) -> Result<()> {
        self.ensure_connected()?;
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.ensure_connected()?;
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.live.lock().remove(&self.seq);
        debug!(seq = self.seq, "In-VM session closed");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
