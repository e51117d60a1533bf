//! Local address discovery (spec §6), grounded in
//! `original_source/server/*`'s `GetOutboundIP` helper: open a UDP socket
//! "connected" to an external address and read back the address the kernel
//! picked for the route, without sending any packet.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use crate::error::{Error, Result};

/// Best-effort guess at this host's outbound IPv4 address, used to populate
/// the `sender_ip` field of outgoing datagrams when the bind address is
/// `0.0.0.0` (spec §4.1).
pub fn outbound_ipv4() -> Result<Ipv4Addr> {
    let probe: SocketAddr = "8.8.8.8:80".parse().expect("valid literal");
    let socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::Io)?;
    socket.connect(probe).map_err(Error::Io)?;
    match socket.local_addr().map_err(Error::Io)?.ip() {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(_) => Ok(Ipv4Addr::LOCALHOST),
    }
}
