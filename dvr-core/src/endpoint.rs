//! Endpoint addressing — an IPv4 address and UDP port (spec §3), used both
//! as a bind address for the local node and as a send target for peers.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use thiserror::Error;

/// An IPv4 + UDP port pair. Deliberately IPv4-only (spec §1 Non-goals:
/// IPv6 is out of scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

/// Error parsing an [`Endpoint`] from a string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid endpoint {0:?}: expected <ipv4>:<port>")]
pub struct EndpointParseError(String);

impl Endpoint {
    #[must_use]
    pub const fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(e: Endpoint) -> Self {
        e.socket_addr()
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip, port) = s
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError(s.to_string()))?;
        let ip: Ipv4Addr = ip.parse().map_err(|_| EndpointParseError(s.to_string()))?;
        let port: u16 = port.parse().map_err(|_| EndpointParseError(s.to_string()))?;
        Ok(Self { ip, port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
