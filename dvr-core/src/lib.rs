//! DVR Core
//!
//! Transport-agnostic kernel for a distance-vector routing node:
//! - Node/cost arithmetic (`types`)
//! - Endpoint addressing (`endpoint`)
//! - Topology description + parser (`topology`)
//! - The routing table and its invariants (`table`)
//! - Error types (`error`)
//! - A monotonic clock abstraction (`clock`)

#![deny(unsafe_code)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod endpoint;
pub mod error;
pub mod net;
pub mod table;
pub mod topology;
pub mod types;

/// A small prelude to make downstream crates ergonomic.
pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::endpoint::Endpoint;
    pub use crate::error::{Error, Result};
    pub use crate::table::{RouteEntry, RoutingTable};
    pub use crate::topology::{Topology, TopologyEntry};
    pub use crate::types::{Cost, NodeId, INF};
}
