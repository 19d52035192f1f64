//! Default values for every connection, session and pool option.
//!
//! Config types read their defaults from here and nowhere else.

use std::time::Duration;

// ----------------------------------------------------------------------------
// URI
// ----------------------------------------------------------------------------

/// Port used when a netty endpoint omits one.
pub const NETTY_PORT: u16 = 5445;

/// Port used when a discovery endpoint omits one.
pub const DISCOVERY_PORT: u16 = 9876;

/// Host token selecting the in-process transport.
pub const INVM_HOST: &str = "invm";

// ----------------------------------------------------------------------------
// Flow control / batching
// ----------------------------------------------------------------------------

pub const ACK_BATCH_SIZE: u32 = 1024 * 1024;
pub const CONSUMER_WINDOW_SIZE: u32 = 1024 * 1024;
pub const PRODUCER_WINDOW_SIZE: u32 = 64 * 1024;
pub const MIN_LARGE_MESSAGE_SIZE: u32 = 100 * 1024;
pub const INITIAL_MESSAGE_PACKET_SIZE: u32 = 1500;
pub const CACHE_LARGE_MESSAGES_CLIENT: bool = false;

// ----------------------------------------------------------------------------
// Reliability / blocking
// ----------------------------------------------------------------------------

pub const BLOCK_ON_ACKNOWLEDGE: bool = false;
pub const BLOCK_ON_DURABLE_SEND: bool = true;
pub const BLOCK_ON_NON_DURABLE_SEND: bool = false;
pub const PRE_ACKNOWLEDGE: bool = false;

// ----------------------------------------------------------------------------
// Timing
// ----------------------------------------------------------------------------

pub const CALL_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const CLIENT_FAILURE_CHECK_PERIOD: Duration = Duration::from_millis(30_000);
pub const CONNECTION_TTL: Duration = Duration::from_millis(60_000);
pub const DISCOVERY_INITIAL_WAIT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DISCOVERY_REFRESH_TIMEOUT: Duration = Duration::from_millis(10_000);

// ----------------------------------------------------------------------------
// Failover / retry
// ----------------------------------------------------------------------------

pub const FAILOVER_ON_INITIAL_CONNECTION: bool = true;
pub const FAILOVER_ON_SERVER_SHUTDOWN: bool = true;

/// `-1` means retry forever.
pub const RECONNECT_ATTEMPTS: i32 = 1;
pub const RETRY_INTERVAL: Duration = Duration::from_millis(2_000);
pub const RETRY_INTERVAL_MULTIPLIER: f64 = 1.0;
pub const MAX_RETRY_INTERVAL: Duration = Duration::from_millis(2_000);

// ----------------------------------------------------------------------------
// Topology
// ----------------------------------------------------------------------------

pub const CONNECTION_LOAD_BALANCING_POLICY_CLASS_NAME: &str =
    "org.hornetq.api.core.client.loadbalance.RoundRobinConnectionLoadBalancingPolicy";
pub const AUTO_GROUP: bool = false;

// ----------------------------------------------------------------------------
// Resourcing
// ----------------------------------------------------------------------------

pub const SCHEDULED_THREAD_POOL_MAX_SIZE: u32 = 5;
pub const USE_GLOBAL_POOLS: bool = true;

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

pub const SESSION_XA: bool = false;
pub const SESSION_AUTO_COMMIT_SENDS: bool = true;
pub const SESSION_AUTO_COMMIT_ACKS: bool = true;
pub const SESSION_PRE_ACKNOWLEDGE: bool = false;
pub const SESSION_ACK_BATCH_SIZE: u32 = 1;

// ----------------------------------------------------------------------------
// Session pool
// ----------------------------------------------------------------------------

pub const POOL_NAME: &str = "session-pool";
pub const POOL_MAX_SIZE: usize = 10;

/// Leases waiting longer than this are logged at warn level.
pub const POOL_WARN_TIMEOUT: Duration = Duration::from_secs(5);
