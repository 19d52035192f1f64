//! Connection factory configuration.
//!
//! [`ConnectionConfig`] carries the broker URI plus every tunable the
//! transport understands. Each option has a default from
//! [`defaults`](super::defaults); only the URI is mandatory, and it is checked
//! when the factory is built so that a config can be assembled incrementally.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use broker_client::ConnectionConfig;
//!
//! let config = ConnectionConfig::new("hornetq://primary:5445,backup:5445")
//!     .with_reconnect_attempts(-1)
//!     .with_retry_policy(Duration::from_millis(500), 2.0, Duration::from_secs(30));
//!
//! assert_eq!(config.retry_delay(0), Duration::from_millis(500));
//! assert_eq!(config.retry_delay(10), Duration::from_secs(30));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::defaults;

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Configuration for a [`ConnectionFactory`](crate::ConnectionFactory).
///
/// Map and JSON input use the field names as keys. Durations are integer
/// milliseconds. Unrecognized keys are rejected rather than ignored, so a
/// misspelled option fails at load time instead of silently taking its
/// default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Broker URI. Mandatory; see [`ConnectionUri`](super::ConnectionUri).
    pub uri: Option<String>,

    // ------------------------------------------------------------------------
    // Flow control / batching
    // ------------------------------------------------------------------------
    /// Bytes of acknowledgements accumulated before they are sent.
    pub ack_batch_size: u32,
    /// Bytes of unconfirmed commands kept for resend on failover. `None` disables.
    pub confirmation_window_size: Option<u32>,
    /// Consumer-side buffer in bytes.
    pub consumer_window_size: u32,
    /// Producer credit window in bytes.
    pub producer_window_size: u32,
    /// Messages above this size are streamed as large messages.
    pub min_large_message_size: u32,
    /// Initial size of outgoing message packets.
    pub initial_message_packet_size: u32,
    /// Cache large message bodies on the client.
    pub cache_large_messages_client: bool,

    // ------------------------------------------------------------------------
    // Rate limits
    // ------------------------------------------------------------------------
    /// Messages per second a consumer may process. `None` is unlimited.
    pub consumer_max_rate: Option<u32>,
    /// Messages per second a producer may send. `None` is unlimited.
    pub producer_max_rate: Option<u32>,

    // ------------------------------------------------------------------------
    // Reliability / blocking
    // ------------------------------------------------------------------------
    /// Wait for the broker to confirm acknowledgements.
    pub block_on_acknowledge: bool,
    /// Wait for the broker to confirm durable sends.
    pub block_on_durable_send: bool,
    /// Wait for the broker to confirm non-durable sends.
    pub block_on_non_durable_send: bool,
    /// Let the broker acknowledge before delivery. Faster, can lose messages.
    pub pre_acknowledge: bool,

    // ------------------------------------------------------------------------
    // Timing
    // ------------------------------------------------------------------------
    /// Blocking call timeout.
    #[serde(with = "duration_ms")]
    pub call_timeout: Duration,
    /// Interval at which the client checks the connection is alive.
    #[serde(with = "duration_ms")]
    pub client_failure_check_period: Duration,
    /// Connection time-to-live without traffic.
    #[serde(with = "duration_ms")]
    pub connection_ttl: Duration,
    /// Initial wait for a discovery broadcast.
    #[serde(with = "duration_ms")]
    pub discovery_initial_wait_timeout: Duration,
    /// Discovery entry expiry.
    #[serde(with = "duration_ms")]
    pub discovery_refresh_timeout: Duration,

    // ------------------------------------------------------------------------
    // Failover / retry
    // ------------------------------------------------------------------------
    /// Try backup endpoints if the initial connection fails.
    pub failover_on_initial_connection: bool,
    /// Fail over when the live server shuts down cleanly.
    pub failover_on_server_shutdown: bool,
    /// Reconnect attempts after a connection failure. `-1` retries forever.
    pub reconnect_attempts: i32,
    /// Delay before the first reconnect attempt.
    #[serde(with = "duration_ms")]
    pub retry_interval: Duration,
    /// Growth factor applied to the delay after each attempt.
    pub retry_interval_multiplier: f64,
    /// Upper bound on the reconnect delay.
    #[serde(with = "duration_ms")]
    pub max_retry_interval: Duration,

    // ------------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------------
    /// Discovery group address. Defaults to the URI host.
    pub discovery_address: Option<String>,
    /// Discovery group port. Defaults to the URI port.
    pub discovery_port: Option<u16>,
    /// Named connectors used instead of discovery.
    pub static_connectors: Vec<String>,
    /// Local address to bind outgoing connections to.
    pub local_bind_address: Option<String>,
    /// Load balancing policy used across cluster members.
    pub connection_load_balancing_policy_class_name: String,
    /// Group messages from each producer automatically.
    pub auto_group: bool,
    /// Explicit message group id.
    pub group_id: Option<String>,

    // ------------------------------------------------------------------------
    // Resourcing
    // ------------------------------------------------------------------------
    /// Transport thread pool limit. `None` is unbounded.
    pub thread_pool_max_size: Option<u32>,
    /// Scheduled executor size.
    pub scheduled_thread_pool_max_size: u32,
    /// Share executors across factories.
    pub use_global_pools: bool,
}

// ============================================================================
// Default
// ============================================================================

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: None,
            ack_batch_size: defaults::ACK_BATCH_SIZE,
            confirmation_window_size: None,
            consumer_window_size: defaults::CONSUMER_WINDOW_SIZE,
            producer_window_size: defaults::PRODUCER_WINDOW_SIZE,
            min_large_message_size: defaults::MIN_LARGE_MESSAGE_SIZE,
            initial_message_packet_size: defaults::INITIAL_MESSAGE_PACKET_SIZE,
            cache_large_messages_client: defaults::CACHE_LARGE_MESSAGES_CLIENT,
            consumer_max_rate: None,
            producer_max_rate: None,
            block_on_acknowledge: defaults::BLOCK_ON_ACKNOWLEDGE,
            block_on_durable_send: defaults::BLOCK_ON_DURABLE_SEND,
            block_on_non_durable_send: defaults::BLOCK_ON_NON_DURABLE_SEND,
            pre_acknowledge: defaults::PRE_ACKNOWLEDGE,
            call_timeout: defaults::CALL_TIMEOUT,
            client_failure_check_period: defaults::CLIENT_FAILURE_CHECK_PERIOD,
            connection_ttl: defaults::CONNECTION_TTL,
            discovery_initial_wait_timeout: defaults::DISCOVERY_INITIAL_WAIT_TIMEOUT,
            discovery_refresh_timeout: defaults::DISCOVERY_REFRESH_TIMEOUT,
            failover_on_initial_connection: defaults::FAILOVER_ON_INITIAL_CONNECTION,
            failover_on_server_shutdown: defaults::FAILOVER_ON_SERVER_SHUTDOWN,
            reconnect_attempts: defaults::RECONNECT_ATTEMPTS,
            retry_interval: defaults::RETRY_INTERVAL,
            retry_interval_multiplier: defaults::RETRY_INTERVAL_MULTIPLIER,
            max_retry_interval: defaults::MAX_RETRY_INTERVAL,
            discovery_address: None,
            discovery_port: None,
            static_connectors: Vec::new(),
            local_bind_address: None,
            connection_load_balancing_policy_class_name:
                defaults::CONNECTION_LOAD_BALANCING_POLICY_CLASS_NAME.to_string(),
            auto_group: defaults::AUTO_GROUP,
            group_id: None,
            thread_pool_max_size: None,
            scheduled_thread_pool_max_size: defaults::SCHEDULED_THREAD_POOL_MAX_SIZE,
            use_global_pools: defaults::USE_GLOBAL_POOLS,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectionConfig {
    /// Creates a configuration for `uri` with every other option defaulted.
    #[inline]
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
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
            .map_err(|e| Error::config(format!("invalid connection option: {e}")))
    }

    /// Builds a configuration from a JSON object.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] if the text is not JSON, [`Error::Config`] if the
    /// object holds an unrecognized key or a mistyped value.
    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Self::from_map(map),
            other => Err(Error::config(format!(
                "connection options must be a JSON object, got {other}"
            ))),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionConfig {
    /// Sets the broker URI.
    #[inline]
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets the blocking call timeout.
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the number of reconnect attempts (`-1` for unlimited).
    #[inline]
    #[must_use]
    pub fn with_reconnect_attempts(mut self, attempts: i32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    /// Sets the exponential backoff applied between reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_retry_policy(mut self, interval: Duration, multiplier: f64, max: Duration) -> Self {
        self.retry_interval = interval;
        self.retry_interval_multiplier = multiplier;
        self.max_retry_interval = max;
        self
    }

    /// Overrides the discovery group address and port.
    #[inline]
    #[must_use]
    pub fn with_discovery_group(mut self, address: impl Into<String>, port: u16) -> Self {
        self.discovery_address = Some(address.into());
        self.discovery_port = Some(port);
        self
    }

    /// Adds a named static connector.
    #[inline]
    #[must_use]
    pub fn with_static_connector(mut self, connector: impl Into<String>) -> Self {
        self.static_connectors.push(connector.into());
        self
    }
}

// ============================================================================
// Validation & Derived Values
// ============================================================================

impl ConnectionConfig {
    /// Returns the URI, or a configuration error if none was given.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the URI is missing or blank.
    pub fn require_uri(&self) -> Result<&str> {
        match self.uri.as_deref().map(str::trim) {
            Some(uri) if !uri.is_empty() => Ok(uri),
            _ => Err(Error::config("missing mandatory option: uri")),
        }
    }

    /// Checks the option values are mutually consistent.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        self.require_uri()?;

        if self.reconnect_attempts < -1 {
            return Err(Error::config(format!(
                "reconnect_attempts must be -1 or greater, got {}",
                self.reconnect_attempts
            )));
        }

        let multiplier = self.retry_interval_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(Error::config(format!(
                "retry_interval_multiplier must be at least 1.0, got {multiplier}"
            )));
        }

        if self.max_retry_interval < self.retry_interval {
            return Err(Error::config(format!(
                "max_retry_interval ({:?}) is shorter than retry_interval ({:?})",
                self.max_retry_interval, self.retry_interval
            )));
        }

        Ok(())
    }

    /// Returns the delay before reconnect attempt `attempt` (zero-based).
    ///
    /// `retry_interval * retry_interval_multiplier^attempt`, capped at
    /// `max_retry_interval`. Transports execute this policy; the factory never
    /// sleeps on it.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.retry_interval_multiplier.powi(exponent);
        let millis = self.retry_interval.as_millis() as f64 * factor;
        let max = self.max_retry_interval.as_millis() as f64;

        if !millis.is_finite() || millis >= max {
            self.max_retry_interval
        } else {
            Duration::from_millis(millis as u64)
        }
    }

    /// Returns `true` if reconnect attempts never run out.
    #[inline]
    #[must_use]
    pub const fn reconnects_forever(&self) -> bool {
        self.reconnect_attempts == -1
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

/// Serializes a [`Duration`] as integer milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_new_sets_uri_and_defaults() {
        let config = ConnectionConfig::new("hornetq://localhost");
        assert_eq!(config.uri.as_deref(), Some("hornetq://localhost"));
        assert!(config.failover_on_initial_connection);
        assert!(config.failover_on_server_shutdown);
        assert_eq!(config.reconnect_attempts, 1);
        assert_eq!(config.call_timeout, Duration::from_secs(30));
        assert_eq!(config.producer_max_rate, None);
        assert!(config.use_global_pools);
    }

    #[test]
    fn test_from_map_applies_overrides() {
        let config = ConnectionConfig::from_map(map(json!({
            "uri": "hornetq://broker:5445",
            "reconnect_attempts": -1,
            "call_timeout": 1500,
            "producer_max_rate": 200,
            "static_connectors": ["a", "b"],
        })))
        .expect("valid map");

        assert_eq!(config.reconnect_attempts, -1);
        assert!(config.reconnects_forever());
        assert_eq!(config.call_timeout, Duration::from_millis(1500));
        assert_eq!(config.producer_max_rate, Some(200));
        assert_eq!(config.static_connectors, vec!["a", "b"]);
        assert_eq!(config.consumer_window_size, defaults::CONSUMER_WINDOW_SIZE);
    }

    #[test]
    fn test_from_map_rejects_unknown_key() {
        let err = ConnectionConfig::from_map(map(json!({
            "uri": "hornetq://localhost",
            "reconect_attempts": 3,
        })))
        .unwrap_err();

        assert!(err.is_config_error());
        assert!(err.to_string().contains("reconect_attempts"));
    }

    #[test]
    fn test_from_map_rejects_wrong_type() {
        let err = ConnectionConfig::from_map(map(json!({ "auto_group": "yes" }))).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_from_json_requires_object() {
        let err = ConnectionConfig::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = ConnectionConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_missing_uri_fails_validation() {
        let err = ConnectionConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("uri"));

        let blank = ConnectionConfig::new("   ");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_retry_policy() {
        let config = ConnectionConfig::new("hornetq://localhost").with_retry_policy(
            Duration::from_secs(5),
            2.0,
            Duration::from_secs(1),
        );
        assert!(config.validate().is_err());

        let config = ConnectionConfig::new("hornetq://localhost").with_retry_policy(
            Duration::from_secs(1),
            0.5,
            Duration::from_secs(10),
        );
        assert!(config.validate().is_err());

        let config = ConnectionConfig::new("hornetq://localhost").with_reconnect_attempts(-2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nan_multiplier() {
        let mut config = ConnectionConfig::new("hornetq://localhost");
        config.retry_interval_multiplier = f64::NAN;

        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("retry_interval_multiplier"));

        config.retry_interval_multiplier = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_delay_exponential_with_cap() {
        let config = ConnectionConfig::new("hornetq://localhost").with_retry_policy(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(1000),
        );

        assert_eq!(config.retry_delay(0), Duration::from_millis(100));
        assert_eq!(config.retry_delay(1), Duration::from_millis(200));
        assert_eq!(config.retry_delay(3), Duration::from_millis(800));
        assert_eq!(config.retry_delay(4), Duration::from_millis(1000));
        assert_eq!(config.retry_delay(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_serialize_uses_millis() {
        let config = ConnectionConfig::new("hornetq://localhost");
        let value = serde_json::to_value(&config).expect("serializable");
        assert_eq!(value["call_timeout"], json!(30_000));
    }

    proptest! {
        #[test]
        fn prop_retry_delay_monotone_and_capped(
            interval in 1u64..5_000,
            multiplier in 1.0f64..4.0,
            extra in 0u64..60_000,
            attempt in 0u32..64,
        ) {
            let max = interval + extra;
            let config = ConnectionConfig::new("hornetq://localhost").with_retry_policy(
                Duration::from_millis(interval),
                multiplier,
                Duration::from_millis(max),
            );

            let current = config.retry_delay(attempt);
            let next = config.retry_delay(attempt + 1);
            prop_assert!(current <= Duration::from_millis(max));
            prop_assert!(next >= current);
        }
    }
}
