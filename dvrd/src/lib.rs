//! # dvrd
//!
//! A distance-vector routing node: loads a topology file, binds a UDP
//! socket, and runs the periodic update/liveness loop described in
//! `dvrp::engine`, taking operator commands from stdin.
//!
//! ## Architecture
//!
//! - **`dvr-core`**: transport-agnostic kernel — types, the routing table,
//!   topology parsing, error types, the clock abstraction.
//! - **`dvrp`**: the protocol implementation — wire codec, engine, UDP
//!   transport, scheduler, command vocabulary.
//! - **`dvrd`** (this crate): the binary — CLI parsing, task wiring,
//!   tracing setup.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

/// Command-line argument parsing.
pub mod cli;
/// Development helper for initializing structured logging.
pub mod dev_tracing;
/// Task wiring: binds the socket, loads the topology, spawns the task graph.
pub mod supervisor;
