//! Session pool configuration.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

use super::SessionConfig;
use super::defaults;

// ============================================================================
// PoolConfig
// ============================================================================

/// Sizing and saturation policy for a [`SessionPool`](crate::SessionPool).
///
/// When every session is leased, a lease fails immediately with
/// [`Error::PoolExhausted`] unless `lease_timeout` is set, in which case it
/// waits that long for a release before failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Name used in logs and errors.
    pub name: String,
    /// Maximum number of sessions, leased and idle combined.
    pub max_size: usize,
    /// How long a lease may wait for a free session. `None` fails fast.
    pub lease_timeout: Option<Duration>,
    /// Leases that wait longer than this are logged at warn level.
    pub warn_timeout: Duration,
    /// Template every pooled session is created from.
    pub session: SessionConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: defaults::POOL_NAME.to_string(),
            max_size: defaults::POOL_MAX_SIZE,
            lease_timeout: None,
            warn_timeout: defaults::POOL_WARN_TIMEOUT,
            session: SessionConfig::default(),
        }
    }
}

impl From<SessionConfig> for PoolConfig {
    fn from(session: SessionConfig) -> Self {
        Self {
            session,
            ..Default::default()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PoolConfig {
    /// Creates a pool configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pool name.
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the pool capacity.
    #[inline]
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Makes saturated leases wait up to `timeout`.
    #[inline]
    #[must_use]
    pub fn with_lease_timeout(mut self, timeout: Duration) -> Self {
        self.lease_timeout = Some(timeout);
        self
    }

    /// Sets the slow-lease warning threshold.
    #[inline]
    #[must_use]
    pub fn with_warn_timeout(mut self, timeout: Duration) -> Self {
        self.warn_timeout = timeout;
        self
    }

    /// Sets the session template.
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Checks the pool can hold at least one session.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a zero capacity or an invalid session template.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::config(format!(
                "session pool '{}' must allow at least one session",
                self.name
            )));
        }
        self.session.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::new();
        assert_eq!(config.name, "session-pool");
        assert_eq!(config.max_size, 10);
        assert!(config.lease_timeout.is_none());
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_from_session_config() {
        let config = PoolConfig::from(SessionConfig::transacted());
        assert!(config.session.is_transacted());
        assert_eq!(config.max_size, defaults::POOL_MAX_SIZE);
    }

    #[test]
    fn test_validate_zero_capacity() {
        let err = PoolConfig::new().with_max_size(0).validate().unwrap_err();
        assert!(err.is_config_error());
    }
}
