//! UDP transport (spec §4.4).
//!
//! Grounded in the teacher's session/socket split: the transport owns the
//! bound socket and turns bytes on the wire into typed datagrams, but knows
//! nothing about routing semantics. `Transport` is a trait so engine tests
//! can swap in an in-memory fake instead of a real socket.

use std::net::SocketAddr;

use async_trait::async_trait;
use dvr_core::endpoint::Endpoint;
use dvr_core::error::{Error, Result};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::codec::UpdateMessage;

/// Maximum datagram size this node will read. The original implementation
/// uses a 1024-byte buffer; update datagrams here are bounded similarly
/// since `num_updates` is a `u16` but any real topology has far fewer peers.
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// Send/receive side of the wire, abstracted so the engine/scheduler can be
/// tested without a real socket (spec §4.4).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Block until a datagram arrives, returning its source and decoded
    /// contents. Malformed datagrams are logged and skipped, never
    /// propagated as an error (spec §7).
    async fn recv(&self) -> Result<(SocketAddr, UpdateMessage)>;

    /// Send `msg` to `dest`. Failures are logged by the caller and are not
    /// fatal (spec §7 `ErrSendFailed`).
    async fn send(&self, dest: Endpoint, msg: &UpdateMessage) -> Result<()>;
}

/// Real UDP transport backed by `tokio::net::UdpSocket`.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a socket at `addr` (spec §4.4, §7 `ErrBindFailed`).
    ///
    /// Sets `SO_REUSEADDR` via `socket2` before binding so a crashed-and-
    /// restarted node can rebind its configured port without waiting out
    /// `TIME_WAIT`.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let domain = socket2::Domain::for_address(addr);
        let sock = socket2::Socket::new(domain, socket2::Type::DGRAM, Some(socket2::Protocol::UDP))
            .map_err(|e| Error::BindFailed(addr, e))?;
        sock.set_reuse_address(true)
            .map_err(|e| Error::BindFailed(addr, e))?;
        sock.set_nonblocking(true)
            .map_err(|e| Error::BindFailed(addr, e))?;
        sock.bind(&addr.into())
            .map_err(|e| Error::BindFailed(addr, e))?;

        let socket = UdpSocket::from_std(sock.into())
            .map_err(|e| Error::BindFailed(addr, e))?;
        Ok(Self { socket })
    }

    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn recv(&self) -> Result<(SocketAddr, UpdateMessage)> {
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            let (len, src) = self.socket.recv_from(&mut buf).await.map_err(Error::Io)?;
            match UpdateMessage::decode(&buf[..len]) {
                Ok(msg) => return Ok((src, msg)),
                Err(err) => {
                    warn!(%src, %err, "dropping malformed datagram");
                    continue;
                }
            }
        }
    }

    async fn send(&self, dest: Endpoint, msg: &UpdateMessage) -> Result<()> {
        let encoded = msg.encode();
        match self.socket.send_to(&encoded, dest.socket_addr()).await {
            Ok(_) => {
                debug!(%dest, records = msg.records.len(), "update sent");
                Ok(())
            }
            Err(e) => Err(Error::SendFailed(
                self.neighbor_id_hint(dest),
                e.to_string(),
            )),
        }
    }
}

impl UdpTransport {
    /// Best-effort id for the error message; the transport doesn't track
    /// endpoint-to-id mapping itself (the engine does), so this falls back
    /// to 0 if unknown. The caller (scheduler) logs the endpoint alongside.
    fn neighbor_id_hint(&self, _dest: Endpoint) -> dvr_core::types::NodeId {
        0
    }
}
