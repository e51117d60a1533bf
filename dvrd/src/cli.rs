//! Command-line interface (spec §6).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dvr_core::types::NodeId;
use dvrp::config::Config;

/// A distance-vector routing node.
#[derive(Debug, Parser)]
#[command(name = "dvrd", version, about)]
pub struct Args {
    /// Path to the topology file (spec §6 format).
    #[arg(long, short = 't')]
    pub topology: PathBuf,

    /// This node's id, as it appears in the topology file.
    #[arg(long, short = 'i')]
    pub id: NodeId,

    /// Address to bind the UDP socket on. Defaults to the port configured
    /// for this node in the topology file, on all interfaces.
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Seconds between unsolicited update broadcasts.
    #[arg(long, default_value_t = 30)]
    pub update_interval_secs: u64,

    /// Number of missed updates before a neighbor is declared silent.
    #[arg(long, default_value_t = 3)]
    pub expiry_factor: u32,

    /// Cost ceiling beyond which a route is treated as unreachable.
    #[arg(long, default_value_t = 12)]
    pub count_to_infinity_ceiling: u32,

    /// Milliseconds within which an identical update from the same neighbor
    /// is treated as a duplicate.
    #[arg(long, default_value_t = 100)]
    pub dedup_window_millis: u64,
}

impl Args {
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            update_interval: Duration::from_secs(self.update_interval_secs),
            expiry_factor: self.expiry_factor,
            count_to_infinity_ceiling: self.count_to_infinity_ceiling,
            dedup_window: Duration::from_millis(self.dedup_window_millis),
        }
    }

    /// Resolve the bind address: the explicit `--bind` flag, or
    /// `0.0.0.0:<port>` using this node's port from the topology file
    /// (spec §6, grounded in the original's "listen on configured port"
    /// behavior).
    #[must_use]
    pub fn bind_addr(&self, topology_port: u16) -> SocketAddr {
        self.bind
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, topology_port)))
    }
}
