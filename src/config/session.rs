//! Per-session options.
//!
//! A [`SessionConfig`] fixes the transactional and acknowledgement behavior
//! of a [`Session`](crate::Session) for its whole life.
//!
//! # Reliability trade-offs
//!
//! | Option | Default | Effect |
//! |--------|---------|--------|
//! | `auto_commit_sends` | `true` | `false` buffers sends until [`commit`](crate::Session::commit) |
//! | `auto_commit_acks` | `true` | `false` batches acknowledgements until commit |
//! | `pre_acknowledge` | `false` | `true` saves a round trip per message but a message acknowledged by the broker can be lost before the client processes it |
//! | `ack_batch_size` | `1` | larger values issue fewer acknowledgement round trips at the cost of more redelivery after a failure |
//! | `xa` | `false` | `true` hands commit control to a distributed transaction coordinator |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::defaults;

// ============================================================================
// SessionConfig
// ============================================================================

/// Options for creating a session.
///
/// Absent credentials mean an unauthenticated session. Unknown keys in map
/// input are rejected.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// User name for an authenticated session.
    pub username: Option<String>,
    /// Password for an authenticated session.
    pub password: Option<String>,
    /// Take part in a distributed (two-phase) transaction.
    pub xa: bool,
    /// Commit every send implicitly.
    pub auto_commit_sends: bool,
    /// Commit every acknowledgement implicitly.
    pub auto_commit_acks: bool,
    /// Let the broker acknowledge messages before delivery.
    pub pre_acknowledge: bool,
    /// Acknowledgements accumulated before a round trip is issued.
    pub ack_batch_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            xa: defaults::SESSION_XA,
            auto_commit_sends: defaults::SESSION_AUTO_COMMIT_SENDS,
            auto_commit_acks: defaults::SESSION_AUTO_COMMIT_ACKS,
            pre_acknowledge: defaults::SESSION_PRE_ACKNOWLEDGE,
            ack_batch_size: defaults::SESSION_ACK_BATCH_SIZE,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("xa", &self.xa)
            .field("auto_commit_sends", &self.auto_commit_sends)
            .field("auto_commit_acks", &self.auto_commit_acks)
            .field("pre_acknowledge", &self.pre_acknowledge)
            .field("ack_batch_size", &self.ack_batch_size)
            .finish()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionConfig {
    /// Creates a session configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transacted configuration: sends and acks wait for commit.
    #[inline]
    #[must_use]
    pub fn transacted() -> Self {
        Self {
            auto_commit_sends: false,
            auto_commit_acks: false,
            ..Default::default()
        }
    }

    /// Builds a configuration from an option map.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if a key is unrecognized or a value has the wrong type.
    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::config(format!("invalid session option: {e}")))
    }

    /// Builds a configuration from a JSON object.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] for malformed text, [`Error::Config`] for bad options.
    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Self::from_map(map),
            other => Err(Error::config(format!(
                "session options must be a JSON object, got {other}"
            ))),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionConfig {
    /// Sets credentials for an authenticated session.
    #[inline]
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Enables XA semantics.
    #[inline]
    #[must_use]
    pub fn with_xa(mut self) -> Self {
        self.xa = true;
        self
    }

    /// Sets whether sends are committed implicitly.
    #[inline]
    #[must_use]
    pub fn with_auto_commit_sends(mut self, enabled: bool) -> Self {
        self.auto_commit_sends = enabled;
        self
    }

    /// Sets whether acknowledgements are committed implicitly.
    #[inline]
    #[must_use]
    pub fn with_auto_commit_acks(mut self, enabled: bool) -> Self {
        self.auto_commit_acks = enabled;
        self
    }

    /// Enables broker-side pre-acknowledgement. See the module docs.
    #[inline]
    #[must_use]
    pub fn with_pre_acknowledge(mut self) -> Self {
        self.pre_acknowledge = true;
        self
    }

    /// Sets the acknowledgement batch size.
    #[inline]
    #[must_use]
    pub fn with_ack_batch_size(mut self, size: u32) -> Self {
        self.ack_batch_size = size;
        self
    }
}

// ============================================================================
// Queries & Validation
// ============================================================================

impl SessionConfig {
    /// Returns `true` if credentials are supplied.
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    /// Returns `true` if work in the session waits for an explicit commit.
    #[inline]
    #[must_use]
    pub const fn is_transacted(&self) -> bool {
        self.xa || !self.auto_commit_sends || !self.auto_commit_acks
    }

    /// Checks the options are usable.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if only half of the credentials are set or the
    /// batch size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.username.is_some() != self.password.is_some() {
            return Err(Error::config(
                "username and password must be supplied together",
            ));
        }

        if self.ack_batch_size == 0 {
            return Err(Error::config("ack_batch_size must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
