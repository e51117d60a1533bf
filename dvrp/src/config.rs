//! Timing and convergence configuration (spec §4.5, §4.6, §9).
//!
//! Tunables that govern the periodic update loop, silent-peer expiry, and
//! count-to-infinity mitigation.

use std::time::Duration;

/// Default interval between unsolicited update broadcasts (spec §4.5).
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of missed update intervals before a neighbor is declared
/// silent and its route invalidated (spec §4.3 "silent peer", §8).
pub const DEFAULT_EXPIRY_FACTOR: u32 = 3;

/// Default ceiling applied to route costs before the learned value is
/// treated as "unreachable", short-circuiting count-to-infinity oscillation
/// (spec §3, §9 Open Question: resolved as a configurable soft ceiling,
/// default below; see DESIGN.md).
pub const DEFAULT_COUNT_TO_INFINITY_CEILING: u32 = 12;

/// Window within which a duplicate update from the same neighbor (identical
/// vector) is suppressed rather than reprocessed (spec §4.3.1 step 4, §8
/// "duplicate suppression").
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(1);

/// Node-wide timing and convergence configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// How often this node broadcasts its distance vector to all direct
    /// neighbors.
    pub update_interval: Duration,
    /// Multiple of `update_interval` a neighbor may stay silent before being
    /// marked unreachable.
    pub expiry_factor: u32,
    /// Cost ceiling beyond which a route is clamped to `INF`.
    pub count_to_infinity_ceiling: u32,
    /// Minimum spacing between two updates from the same neighbor that are
    /// treated as distinct (rather than a duplicate retransmission).
    pub dedup_window: Duration,
}

impl Config {
    /// The silence window after which a neighbor is considered dead:
    /// `update_interval * expiry_factor` (spec §4.3).
    #[must_use]
    pub fn expiry_window(&self) -> Duration {
        self.update_interval * self.expiry_factor
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            expiry_factor: DEFAULT_EXPIRY_FACTOR,
            count_to_infinity_ceiling: DEFAULT_COUNT_TO_INFINITY_CEILING,
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }
}
