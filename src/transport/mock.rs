//! Recording transport with failure injection, for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::SessionConfig;
use crate::error::{Error, Result};

use super::{Connector, Transport, TransportSession, TransportTarget};

/// Counters and switches shared by the mock connector, transport and sessions.
#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub connects: AtomicUsize,
    pub sessions_opened: AtomicUsize,
    pub session_closes: AtomicUsize,
    pub transport_closes: AtomicUsize,
    pub commits: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_open: AtomicBool,
    pub fail_session_close: AtomicBool,
    pub fail_transport_close: AtomicBool,
    /// Delay applied inside `open_session`, in milliseconds.
    pub open_delay_ms: AtomicUsize,
    /// Close calls in the order they reached the mock.
    pub events: Mutex<Vec<&'static str>>,
}

impl MockState {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn set(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockConnector {
    pub state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _target: &TransportTarget) -> Result<Box<dyn Transport>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::transport("connection refused"));
        }
        Ok(Box::new(MockTransport {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockTransport {
    state: Arc<MockState>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn open_session(&self, _config: &SessionConfig) -> Result<Box<dyn TransportSession>> {
        let delay = self.state.open_delay_ms.load(Ordering::SeqCst) as u64;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(Error::transport("session refused"));
        }
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.state.transport_closes.fetch_add(1, Ordering::SeqCst);
        self.state.events.lock().push("transport_close");
        if self.state.fail_transport_close.load(Ordering::SeqCst) {
            return Err(Error::transport("close failed"));
        }
        Ok(())
    }
}

struct MockSession {
    state: Arc<MockState>,
}

#[async_trait]
impl TransportSession for MockSession {
    async fn commit(&self) -> Result<()> {
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.session_closes.fetch_add(1, Ordering::SeqCst);
        self.state.events.lock().push("session_close");
        if self.state.fail_session_close.load(Ordering::SeqCst) {
            return Err(Error::transport("session close failed"));
        }
        Ok(())
    }
}
