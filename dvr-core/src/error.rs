//! Error Types
//!
//! Error handling for the routing kernel and everything built on it.

use std::io;
use thiserror::Error;

use crate::types::NodeId;

/// Main error type for DVR node operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during socket or file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A datagram failed to decode (`ErrDecode`, spec §4.1/§7).
    #[error("malformed update datagram: {0}")]
    Decode(String),

    /// A datagram's sender did not match any known peer (`ErrUnknownPeer`).
    #[error("datagram source {0} does not match any known peer")]
    UnknownPeer(std::net::SocketAddr),

    /// Topology file is malformed.
    #[error("topology file error: {0}")]
    Topology(String),

    /// `update` command arguments were invalid (`ErrUpdateArgs`).
    #[error("invalid update arguments: {0}")]
    UpdateArgs(String),

    /// `disable` command arguments were invalid (`ErrDisableArgs`).
    #[error("invalid disable arguments: {0}")]
    DisableArgs(String),

    /// Operator tried to disable the link to self (`ErrDisableSelf`).
    #[error("cannot disable the link to self (node {0})")]
    DisableSelf(NodeId),

    /// Operator tried to disable a link that is already not a direct neighbor
    /// (`ErrDisableNonNeighbor`).
    #[error("node {0} is not a direct neighbor (or is already disabled)")]
    DisableNonNeighbor(NodeId),

    /// A one-shot send failed; transient, logged and retried on the next
    /// tick (`ErrSendFailed`).
    #[error("send to {0} failed: {1}")]
    SendFailed(NodeId, String),

    /// Binding the local UDP socket failed; fatal at startup
    /// (`ErrBindFailed`).
    #[error("failed to bind {0}: {1}")]
    BindFailed(std::net::SocketAddr, io::Error),

    /// An internal queue was closed unexpectedly.
    #[error("internal channel closed: {0}")]
    ChannelClosed(&'static str),

    /// An id referenced in a command or datagram is not a known node.
    #[error("unknown node id: {0}")]
    UnknownNode(NodeId),
}

/// Result type alias for DVR node operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error should be surfaced to the operator (stderr) rather
    /// than merely logged and dropped (spec §7 policy).
    #[must_use]
    pub const fn is_operator_facing(&self) -> bool {
        matches!(
            self,
            Self::UpdateArgs(_)
                | Self::DisableArgs(_)
                | Self::DisableSelf(_)
                | Self::DisableNonNeighbor(_)
                | Self::UnknownNode(_)
        )
    }

    /// Whether this error is fatal and should terminate the process with a
    /// non-zero exit code (spec §6: bind/topology failures only).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::BindFailed(..) | Self::Topology(_))
    }
}
