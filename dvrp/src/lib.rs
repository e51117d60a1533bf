//! # dvrp
//!
//! **Protocol implementation crate for the distance-vector routing daemon.**
//!
//! This crate wires `dvr-core`'s transport-agnostic kernel to a real UDP
//! socket and a Tokio task graph: the wire codec, the engine that mutates
//! the routing table, the UDP transport, the periodic scheduler, and the
//! operator command vocabulary.
//!
//! For the binary that ties this into a runnable daemon, see `dvrd`.

#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod command;
pub mod config;
pub mod engine;
pub mod scheduler;
pub mod transport;

/// Prelude module for convenient imports.
///
/// ```rust
/// use dvrp::prelude::*;
/// ```
pub mod prelude {
    pub use crate::codec::{UpdateMessage, UpdateRecord};
    pub use crate::command::{parse as parse_command, Command, CommandResponse};
    pub use crate::config::Config;
    pub use crate::engine::{Engine, SharedTable};
    pub use crate::scheduler::{spawn_listener, spawn_ticker, run_engine, EngineHandle, EngineMsg};
    pub use crate::transport::{Transport, UdpTransport};
}
