//! Transport descriptor resolved from a URI and connection options.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{ConnectionConfig, ConnectionUri, Endpoint, Protocol};
use crate::error::{Error, Result};

// ============================================================================
// TransportKind
// ============================================================================

/// Where and how a transport connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// TCP to a primary endpoint, failing over to backups in order.
    Netty {
        /// Live server.
        primary: Endpoint,
        /// Failover targets.
        backups: Vec<Endpoint>,
    },
    /// Endpoints learned from a discovery group.
    Discovery {
        /// Broadcast group address and port.
        group: Endpoint,
    },
    /// In-process transport.
    InVm,
}

impl TransportKind {
    /// Returns the protocol family of this kind.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        match self {
            Self::Netty { .. } => Protocol::Netty,
            Self::Discovery { .. } => Protocol::Discovery,
            Self::InVm => Protocol::InVm,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Netty { primary, backups } => {
                write!(f, "netty://{primary}")?;
                for backup in backups {
                    write!(f, ",{backup}")?;
                }
                Ok(())
            }
            Self::Discovery { group } => write!(f, "discovery://{group}"),
            Self::InVm => f.write_str("invm"),
        }
    }
}

// ============================================================================
// TransportTarget
// ============================================================================

/// Everything a [`Connector`](super::Connector) needs to open a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportTarget {
    /// Resolved transport kind and endpoints.
    pub kind: TransportKind,
    /// Query parameters from the URI other than `protocol`.
    pub params: BTreeMap<String, String>,
    /// Connection tunables handed through to the transport.
    pub config: ConnectionConfig,
}

impl TransportTarget {
    /// Validates `config` and resolves its URI.
    ///
    /// Discovery takes its group from `discovery_address` / `discovery_port`
    /// when set, falling back to the URI endpoint.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the URI is missing or malformed, the options are
    /// inconsistent, or a discovery URI lists more than one endpoint.
    pub fn resolve(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let uri = ConnectionUri::parse(config.require_uri()?)?;

        let kind = match uri.protocol {
            Protocol::InVm => TransportKind::InVm,
            Protocol::Netty => {
                let mut endpoints = uri.endpoints.into_iter();
                let primary = endpoints
                    .next()
                    .ok_or_else(|| Error::config("netty URI has no endpoint"))?;
                TransportKind::Netty {
                    primary,
                    backups: endpoints.collect(),
                }
            }
            Protocol::Discovery => {
                if uri.endpoints.len() > 1 {
                    return Err(Error::config(
                        "discovery URI takes a single group endpoint",
                    ));
                }
                let endpoint = uri
                    .endpoints
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::config("discovery URI has no endpoint"))?;
                TransportKind::Discovery {
                    group: Endpoint::new(
                        config.discovery_address.clone().unwrap_or(endpoint.host),
                        config.discovery_port.unwrap_or(endpoint.port),
                    ),
                }
            }
        };

        Ok(Self {
            kind,
            params: uri.params,
            config: config.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_netty_with_backups() {
        let config = ConnectionConfig::new("hornetq://live:5445,backup:5446");
        let target = TransportTarget::resolve(&config).unwrap();

        assert_eq!(
            target.kind,
            TransportKind::Netty {
                primary: Endpoint::new("live", 5445),
                backups: vec![Endpoint::new("backup", 5446)],
            }
        );
        assert_eq!(target.kind.to_string(), "netty://live:5445,backup:5446");
    }

    #[test]
    fn test_resolve_discovery_uses_uri_endpoint() {
        let config = ConnectionConfig::new("hornetq://231.7.7.7:9876/?protocol=discovery");
        let target = TransportTarget::resolve(&config).unwrap();

        assert_eq!(
            target.kind,
            TransportKind::Discovery {
                group: Endpoint::new("231.7.7.7", 9876)
            }
        );
    }

    #[test]
    fn test_resolve_discovery_config_overrides() {
        let config = ConnectionConfig::new("hornetq://localhost?protocol=discovery")
            .with_discovery_group("231.7.7.8", 9999);
        let target = TransportTarget::resolve(&config).unwrap();

        assert_eq!(
            target.kind,
            TransportKind::Discovery {
                group: Endpoint::new("231.7.7.8", 9999)
            }
        );
        assert_eq!(target.kind.protocol(), Protocol::Discovery);
    }

    #[test]
    fn test_resolve_discovery_rejects_multiple_endpoints() {
        let config = ConnectionConfig::new("hornetq://a,b/?protocol=discovery");
        assert!(TransportTarget::resolve(&config).is_err());
    }

    #[test]
    fn test_resolve_invm() {
        let target = TransportTarget::resolve(&ConnectionConfig::new("hornetq://invm")).unwrap();
        assert_eq!(target.kind, TransportKind::InVm);
        assert_eq!(target.kind.to_string(), "invm");
    }

    #[test]
    fn test_resolve_requires_uri() {
        let err = TransportTarget::resolve(&ConnectionConfig::default()).unwrap_err();
        assert!(err.is_config_error());
    }
}
