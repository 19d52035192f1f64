//! Broker URI parsing.
//!
//! ```text
//! scheme://host[:port][,backup_host[:port]]*[/][?protocol=netty|discovery|invm]
//! ```
//!
//! | Form | Transport |
//! |------|-----------|
//! | `hornetq://server:5445` | netty to one server |
//! | `hornetq://server:5445,backup:5445` | netty with a failover target |
//! | `hornetq://group:9876/?protocol=discovery` | discovery group |
//! | `hornetq://invm` | in-process |
//!
//! Query parameters other than `protocol` are kept as transport options.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use url::Host;
use url::form_urlencoded;

use crate::error::{Error, Result};

use super::defaults;

// ============================================================================
// Constants
// ============================================================================

/// RFC 3986 scheme grammar.
static SCHEME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("scheme pattern is valid")
});

// ============================================================================
// Protocol
// ============================================================================

/// Transport family selected by a URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP transport to static endpoints.
    Netty,
    /// Endpoints learned from a discovery group broadcast.
    Discovery,
    /// In-process transport, no network.
    InVm,
}

impl Protocol {
    /// Returns the query-string spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Netty => "netty",
            Self::Discovery => "discovery",
            Self::InVm => "invm",
        }
    }

    /// Port assumed when an endpoint omits one.
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Netty | Self::InVm => defaults::NETTY_PORT,
            Self::Discovery => defaults::DISCOVERY_PORT,
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "netty" => Ok(Self::Netty),
            "discovery" | "discover" => Ok(Self::Discovery),
            "invm" => Ok(Self::InVm),
            other => Err(Error::config(format!(
                "unknown protocol '{other}' (expected netty, discovery or invm)"
            ))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or address literal (IPv6 in brackets).
    pub host: String,
    /// TCP or UDP port.
    pub port: u16,
}

impl Endpoint {
    /// Creates an endpoint.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host[:port]`, filling in `default_port` when absent.
    fn parse(token: &str, default_port: u16) -> Result<Self> {
        let (host, port) = split_host_port(token)?;

        if host.is_empty() {
            return Err(Error::config(format!("empty host in '{token}'")));
        }

        Host::parse(host)
            .map_err(|e| Error::config(format!("invalid host '{host}': {e}")))?;

        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| Error::config(format!("invalid port in '{token}'")))?,
            None => default_port,
        };

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Splits `host[:port]`, keeping IPv6 brackets on the host.
fn split_host_port(token: &str) -> Result<(&str, Option<&str>)> {
    if token.starts_with('[') {
        let close = token
            .find(']')
            .ok_or_else(|| Error::config(format!("unterminated IPv6 literal in '{token}'")))?;
        let (host, rest) = token.split_at(close + 1);
        return match rest {
            "" => Ok((host, None)),
            _ => rest
                .strip_prefix(':')
                .map(|port| (host, Some(port)))
                .ok_or_else(|| Error::config(format!("unexpected text after host in '{token}'"))),
        };
    }

    Ok(match token.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (token, None),
    })
}

// ============================================================================
// ConnectionUri
// ============================================================================

/// A parsed broker URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUri {
    /// URI scheme, e.g. `hornetq`.
    pub scheme: String,
    /// Selected transport family.
    pub protocol: Protocol,
    /// Endpoints in order; the first is primary. Empty for in-VM.
    pub endpoints: Vec<Endpoint>,
    /// Query parameters other than `protocol`.
    pub params: BTreeMap<String, String>,
}

impl ConnectionUri {
    /// Parses a broker URI.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a missing scheme separator, an invalid scheme,
    /// host or port, an unknown protocol, or a path component.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| Error::config(format!("'{input}' is not a URI (missing '://')")))?;

        if !SCHEME_PATTERN.is_match(scheme) {
            return Err(Error::config(format!("invalid URI scheme '{scheme}'")));
        }

        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        let (path, query) = match tail.split_once('?') {
            Some((path, query)) => (path, query),
            None => (tail, ""),
        };
        if !path.is_empty() && path != "/" {
            return Err(Error::config(format!(
                "unexpected path '{path}' in broker URI"
            )));
        }

        let mut explicit = None;
        let mut params = BTreeMap::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key == "protocol" {
                explicit = Some(value.parse::<Protocol>()?);
            } else {
                params.insert(key.into_owned(), value.into_owned());
            }
        }

        let tokens: Vec<&str> = authority.split(',').map(str::trim).collect();
        if tokens.iter().all(|t| t.is_empty()) {
            return Err(Error::config(format!("no host in broker URI '{input}'")));
        }

        let invm_host = tokens.len() == 1 && tokens[0].eq_ignore_ascii_case(defaults::INVM_HOST);
        let protocol = match (explicit, invm_host) {
            (None, true) | (Some(Protocol::InVm), _) => Protocol::InVm,
            (Some(protocol), true) => {
                return Err(Error::config(format!(
                    "host token '{}' cannot be combined with protocol={protocol}",
                    defaults::INVM_HOST
                )));
            }
            (Some(protocol), false) => protocol,
            (None, false) => Protocol::Netty,
        };

        let endpoints = match protocol {
            Protocol::InVm => Vec::new(),
            _ => tokens
                .iter()
                .map(|token| Endpoint::parse(token, protocol.default_port()))
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(Self {
            scheme: scheme.to_string(),
            protocol,
            endpoints,
            params,
        })
    }

    /// Returns the primary endpoint, if any.
    #[inline]
    #[must_use]
    pub fn primary(&self) -> Option<&Endpoint> {
        self.endpoints.first()
    }

    /// Returns the failover endpoints after the primary.
    #[inline]
    #[must_use]
    pub fn backups(&self) -> &[Endpoint] {
        self.endpoints.get(1..).unwrap_or_default()
    }
}

impl FromStr for ConnectionUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Tests
// ============================================================================
