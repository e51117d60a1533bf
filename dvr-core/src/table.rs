//! The routing table and its invariants (spec §3, §4.2).
//!
//! `RoutingTable` is the single mutable piece of state the engine owns. It
//! knows nothing about the network or the clock; callers pass in an
//! `Instant` for "now" so the table stays deterministic and testable.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::types::{Cost, NodeId, INF, NO_HOP};

/// One row of the distance-vector table: the best known cost to `dest` and
/// the neighbor to forward through to get there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub cost: Cost,
    pub next_hop: NodeId,
}

impl RouteEntry {
    #[must_use]
    pub const fn unreachable() -> Self {
        Self {
            cost: INF,
            next_hop: NO_HOP,
        }
    }

    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        self.cost < INF
    }
}

/// Timestamped metadata the engine tracks per destination, separate from the
/// `RouteEntry` itself so route comparisons stay cheap (spec §4.2).
#[derive(Debug, Clone, Copy)]
struct Row {
    entry: RouteEntry,
    /// True if `dest` is a configured direct neighbor (its link cost is
    /// reported by the transport layer, not learned from an update).
    direct: bool,
    /// Last time this row changed, used by the expiry/count-to-infinity
    /// logic in the engine (spec §4.3, §8).
    updated_at: Instant,
}

/// The distance-vector routing table: `dest -> (cost, next_hop)` for every
/// node this node knows about, including itself (spec §3 invariant: the
/// self row always has cost 0 and `next_hop == self`).
#[derive(Debug)]
pub struct RoutingTable {
    self_id: NodeId,
    rows: BTreeMap<NodeId, Row>,
}

impl RoutingTable {
    /// Build a table with only the self row populated (cost 0, next hop
    /// self). Neighbors and other destinations are added via [`Self::relax`]
    /// as the topology is loaded.
    #[must_use]
    pub fn new(self_id: NodeId, now: Instant) -> Self {
        let mut rows = BTreeMap::new();
        rows.insert(
            self_id,
            Row {
                entry: RouteEntry {
                    cost: 0,
                    next_hop: self_id,
                },
                direct: true,
                updated_at: now,
            },
        );
        Self { self_id, rows }
    }

    #[must_use]
    pub const fn self_id(&self) -> NodeId {
        self.self_id
    }

    #[must_use]
    pub fn get(&self, dest: NodeId) -> RouteEntry {
        self.rows
            .get(&dest)
            .map_or_else(RouteEntry::unreachable, |r| r.entry)
    }

    #[must_use]
    pub fn is_direct(&self, dest: NodeId) -> bool {
        self.rows.get(&dest).is_some_and(|r| r.direct)
    }

    #[must_use]
    pub fn last_updated(&self, dest: NodeId) -> Option<Instant> {
        self.rows.get(&dest).map(|r| r.updated_at)
    }

    /// Ensure `dest` has a row, defaulting it to unreachable, so it shows up
    /// in `snapshot()` even before any route to it is learned. Used when
    /// seeding the table from the topology file (spec §6).
    pub fn ensure(&mut self, dest: NodeId, now: Instant) {
        self.rows.entry(dest).or_insert(Row {
            entry: RouteEntry::unreachable(),
            direct: false,
            updated_at: now,
        });
    }

    /// Relax the route to `dest` through `via` at `candidate_cost`. Applies
    /// the Bellman-Ford update rule (spec §3, §4.2): replace the current
    /// route if the candidate is strictly cheaper, or if it comes via the
    /// same next hop currently in use (so increases reported by our own
    /// chosen next hop propagate instead of being shadowed by a stale
    /// cheaper-looking row). Returns `true` if the row changed.
    pub fn relax(&mut self, dest: NodeId, via: NodeId, candidate_cost: Cost, now: Instant) -> bool {
        if dest == self.self_id {
            return false;
        }

        let direct = self.rows.get(&dest).is_some_and(|r| r.direct);
        let row = self.rows.entry(dest).or_insert(Row {
            entry: RouteEntry::unreachable(),
            direct,
            updated_at: now,
        });

        let candidate = RouteEntry {
            cost: candidate_cost,
            // An entry that snaps to INF (e.g. the count-to-infinity ceiling)
            // must also snap its next hop to 0 (invariant: `next_hop == 0 iff
            // best_cost == INF`) rather than recording the sender as the
            // route to an unreachable destination.
            next_hop: if candidate_cost >= INF { NO_HOP } else { via },
        };
        let should_replace =
            candidate.cost < row.entry.cost || row.entry.next_hop == via;

        if should_replace && candidate != row.entry {
            row.entry = candidate;
            row.updated_at = now;
            true
        } else {
            false
        }
    }

    /// Record/replace the direct link cost to a configured neighbor,
    /// independent of anything learned via updates (spec §4.3 `update_link`,
    /// `disable_link`). `cost = INF` disables the link.
    pub fn set_direct(&mut self, dest: NodeId, cost: Cost, now: Instant) -> bool {
        if dest == self.self_id {
            return false;
        }
        let row = self.rows.entry(dest).or_insert(Row {
            entry: RouteEntry::unreachable(),
            direct: true,
            updated_at: now,
        });
        row.direct = true;
        let candidate = RouteEntry {
            cost,
            next_hop: if cost >= INF { NO_HOP } else { dest },
        };
        if candidate == row.entry {
            false
        } else {
            row.entry = candidate;
            row.updated_at = now;
            true
        }
    }

    /// Mark `dest` unreachable, e.g. after its silence window expires
    /// (spec §4.3, §8 "silent peer"). Any routes using `dest` as next hop
    /// are also invalidated, since they are no longer trustworthy.
    pub fn invalidate(&mut self, dest: NodeId, now: Instant) {
        let mut changed = Vec::new();
        if let Some(row) = self.rows.get_mut(&dest) {
            if row.entry.is_reachable() {
                row.entry = RouteEntry::unreachable();
                row.updated_at = now;
            }
        }
        for (&id, row) in &self.rows {
            if id != dest && row.entry.next_hop == dest && row.entry.is_reachable() {
                changed.push(id);
            }
        }
        for id in changed {
            if let Some(row) = self.rows.get_mut(&id) {
                row.entry = RouteEntry::unreachable();
                row.updated_at = now;
            }
        }
    }

    /// All known destinations in ascending id order, self included
    /// (spec §4.2 display ordering).
    #[must_use]
    pub fn snapshot(&self) -> Vec<(NodeId, RouteEntry)> {
        self.rows.iter().map(|(&id, r)| (id, r.entry)).collect()
    }

    /// Destinations this node forwards through `via` directly, used to build
    /// the outgoing update vector (spec §4.3: split-horizon is explicitly
    /// *not* applied, per Non-goals, so this is a plain iterator).
    #[must_use]
    pub fn destinations(&self) -> Vec<NodeId> {
        self.rows.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn self_row_is_zero_cost() {
        let now = Instant::now();
        let table = RoutingTable::new(1, now);
        assert_eq!(table.get(1), RouteEntry { cost: 0, next_hop: 1 });
    }

    #[test]
    fn relax_prefers_cheaper_route() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1, now);
        assert!(table.relax(2, 2, 5, now));
        assert_eq!(table.get(2).cost, 5);
        let later = now + Duration::from_secs(1);
        assert!(!table.relax(2, 3, 10, later));
        assert_eq!(table.get(2).next_hop, 2);
    }

    #[test]
    fn relax_follows_current_next_hop_even_if_worse() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1, now);
        table.relax(2, 2, 5, now);
        let later = now + Duration::from_secs(1);
        assert!(table.relax(2, 2, 9, later));
        assert_eq!(table.get(2).cost, 9);
    }

    #[test]
    fn invalidate_clears_dependent_routes() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1, now);
        table.relax(2, 2, 1, now);
        table.relax(3, 2, 4, now);
        table.invalidate(2, now);
        assert!(!table.get(2).is_reachable());
        assert!(!table.get(3).is_reachable());
    }

    #[test]
    fn cannot_relax_self() {
        let now = Instant::now();
        let mut table = RoutingTable::new(1, now);
        assert!(!table.relax(1, 1, 999, now));
        assert_eq!(table.get(1).cost, 0);
    }
}
