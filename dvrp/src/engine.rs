//! The routing engine (spec §4.3): the single mutator of the routing table.
//!
//! `Engine` is deliberately synchronous and transport-agnostic — it receives
//! decoded messages and commands, and produces outgoing messages, but never
//! touches a socket itself. The scheduler and transport tasks own I/O; the
//! engine owns correctness.

use std::sync::Arc;
use std::time::Instant;

use dvr_core::clock::Clock;
use dvr_core::endpoint::Endpoint;
use dvr_core::error::{Error, Result};
use dvr_core::table::RoutingTable;
use dvr_core::topology::Topology;
use dvr_core::types::{Cost, NodeId, INF, NO_HOP};
use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::codec::{UpdateMessage, UpdateRecord};
use crate::config::Config;

/// Shared handle to the routing table, as read by the command port for
/// `display` and written by the engine for everything else (spec §4.2,
/// concurrency model: single mutator, shared readers).
pub type SharedTable = Arc<Mutex<RoutingTable>>;

/// Per-neighbor bookkeeping the engine needs beyond the table itself:
/// when we last heard from them, and what we last heard, for the silent-peer
/// and duplicate-suppression rules (spec §4.3, §8).
#[derive(Debug, Clone)]
struct NeighborState {
    endpoint: Endpoint,
    configured_cost: Cost,
    disabled: bool,
    last_seen: Option<Instant>,
    last_vector_fingerprint: Option<u64>,
}

/// The distance-vector engine for one node.
pub struct Engine {
    self_id: NodeId,
    self_endpoint: Endpoint,
    config: Config,
    clock: Arc<dyn Clock>,
    table: SharedTable,
    neighbors: HashMap<NodeId, NeighborState>,
    /// Endpoint for every node named in the topology file, direct neighbor
    /// or not — needed to address update records for destinations this node
    /// only knows about transitively (spec §4.1, §6).
    node_endpoints: HashMap<NodeId, Endpoint>,
    /// Set by the `crash` command to simulate node failure: once `true`,
    /// the engine ignores incoming packets and stops advertising. Crash is
    /// terminal — the process exits once the command loop observes it
    /// (spec §4.3.7: "the process then terminates").
    crashed: bool,
    /// Inbound packets accepted since the last `packets` command
    /// (spec §4.3.5).
    packets_received: u32,
}

impl Engine {
    /// Build an engine from a loaded topology, seeding the table with direct
    /// neighbor costs (spec §6).
    #[must_use]
    pub fn new(topology: &Topology, config: Config, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let mut table = RoutingTable::new(topology.self_id, now);
        let mut neighbors = HashMap::new();
        let node_endpoints: HashMap<NodeId, Endpoint> = topology
            .entries
            .iter()
            .map(|e| (e.id, e.endpoint))
            .collect();

        let self_endpoint = topology
            .self_entry()
            .map_or(Endpoint::new(std::net::Ipv4Addr::UNSPECIFIED, 0), |e| e.endpoint);

        for entry in &topology.entries {
            if entry.id == topology.self_id {
                continue;
            }
            table.ensure(entry.id, now);
            if entry.initial_direct_cost < INF {
                table.set_direct(entry.id, entry.initial_direct_cost, now);
                neighbors.insert(
                    entry.id,
                    NeighborState {
                        endpoint: entry.endpoint,
                        configured_cost: entry.initial_direct_cost,
                        disabled: false,
                        last_seen: Some(now),
                        last_vector_fingerprint: None,
                    },
                );
            }
        }

        Self {
            self_id: topology.self_id,
            self_endpoint,
            config,
            clock,
            table: Arc::new(Mutex::new(table)),
            neighbors,
            node_endpoints,
            crashed: false,
            packets_received: 0,
        }
    }

    #[must_use]
    pub fn shared_table(&self) -> SharedTable {
        Arc::clone(&self.table)
    }

    #[must_use]
    pub const fn self_id(&self) -> NodeId {
        self.self_id
    }

    /// Handle a decoded update datagram (spec §4.1, §4.3):
    /// 1. Reject datagrams from unknown senders.
    /// 2. Suppress duplicates within the dedup window.
    /// 3. Relax every advertised route through the sender.
    ///
    /// Returns whether any table entry actually changed, so the caller knows
    /// whether to schedule an immediate broadcast (spec §4.3.1 step 7).
    pub fn on_packet(&mut self, msg: &UpdateMessage) -> Result<bool> {
        if self.crashed {
            trace!(self_id = self.self_id, "crashed, dropping inbound packet");
            return Ok(false);
        }

        let sender_id = self.find_neighbor_id(msg.sender).ok_or_else(|| {
            Error::UnknownPeer(msg.sender.socket_addr())
        })?;

        let now = self.clock.now();
        let fingerprint = fingerprint(msg);

        if let Some(state) = self.neighbors.get(&sender_id) {
            if state.disabled {
                debug!(neighbor = sender_id, "ignoring update from disabled link");
                return Ok(false);
            }
            if state.last_vector_fingerprint == Some(fingerprint) {
                if let Some(last_seen) = state.last_seen {
                    if now.saturating_duration_since(last_seen) < self.config.dedup_window {
                        trace!(neighbor = sender_id, "duplicate update suppressed");
                        return Ok(false);
                    }
                }
            }
        }

        // Only packets that pass the peer and dedup checks count as
        // "accepted" (spec §4.3.5, §8 scenario 6).
        self.packets_received = self.packets_received.saturating_add(1);

        let direct_cost = self
            .neighbors
            .get(&sender_id)
            .map_or(INF, |n| n.configured_cost);

        let mut changed = false;
        let mut sender_reported_direct_cost = None;
        let mut table = self.table.lock();
        for record in &msg.records {
            if record.neighbor_id == sender_id {
                // The sender's own self-record (cost 0 to itself): trivial,
                // not a route to relax (spec §4.3.1 step 6: "skip dest ==
                // sender").
                continue;
            }
            if record.neighbor_id == self.self_id {
                // The sender's view of the link back to us (spec §4.3.1 step
                // 6 special case): internalize it as our direct cost to
                // `sender_id`, rather than relaxing a route to ourselves.
                changed |= table.set_direct(sender_id, record.cost, now);
                sender_reported_direct_cost = Some(record.cost);
                continue;
            }
            let via_cost = dvr_core::types::saturating_add(direct_cost, record.cost);
            let clamped = if via_cost > self.config.count_to_infinity_ceiling && via_cost < INF {
                INF
            } else {
                via_cost
            };
            table.ensure(record.neighbor_id, now);
            changed |= table.relax(record.neighbor_id, sender_id, clamped, now);
        }
        drop(table);

        if let Some(cost) = sender_reported_direct_cost {
            let entry = self.neighbors.entry(sender_id).or_insert_with(|| NeighborState {
                endpoint: msg.sender,
                configured_cost: cost,
                disabled: false,
                last_seen: Some(now),
                last_vector_fingerprint: None,
            });
            entry.configured_cost = cost;
            entry.disabled = cost >= INF;
        }

        if let Some(state) = self.neighbors.get_mut(&sender_id) {
            state.last_seen = Some(now);
            state.last_vector_fingerprint = Some(fingerprint);
        }

        info!(neighbor = sender_id, records = msg.records.len(), "processed update");
        Ok(changed)
    }

    /// Operator command: set the link cost between `id1` and `id2`
    /// (spec §4.3.2, §6 `update`).
    ///
    /// If one of the two is this node, the direct cost is set locally and
    /// the node's full vector is broadcast immediately ("then broadcast",
    /// spec §4.3.2). If neither is this node, the request is relayed:
    /// this node emits a one-shot redirect datagram to each endpoint,
    /// spoofing the sender as the *other* endpoint and carrying a
    /// single-record self-vector at `cost`. Each receiver's `on_packet`
    /// (§4.3.1 step 6 special case) interprets that record as "my peer says
    /// my cost to reach it is `cost`" and updates its own direct cost
    /// accordingly — both sides converge within one update interval.
    pub fn update_link(
        &mut self,
        id1: NodeId,
        id2: NodeId,
        cost: Cost,
    ) -> Result<Vec<(Endpoint, UpdateMessage)>> {
        if id1 == id2 {
            return Err(Error::UpdateArgs(format!(
                "cannot set a link cost from node {id1} to itself"
            )));
        }

        if id1 == self.self_id || id2 == self.self_id {
            let other = if id1 == self.self_id { id2 } else { id1 };
            self.set_local_direct_cost(other, cost);
            return Ok(self.outgoing_updates());
        }

        let id1_endpoint = *self
            .node_endpoints
            .get(&id1)
            .ok_or(Error::UnknownNode(id1))?;
        let id2_endpoint = *self
            .node_endpoints
            .get(&id2)
            .ok_or(Error::UnknownNode(id2))?;

        Ok(vec![
            (
                id1_endpoint,
                UpdateMessage::new(
                    id2_endpoint,
                    vec![UpdateRecord {
                        endpoint: id1_endpoint,
                        neighbor_id: id1,
                        cost,
                    }],
                ),
            ),
            (
                id2_endpoint,
                UpdateMessage::new(
                    id1_endpoint,
                    vec![UpdateRecord {
                        endpoint: id2_endpoint,
                        neighbor_id: id2,
                        cost,
                    }],
                ),
            ),
        ])
    }

    fn set_local_direct_cost(&mut self, neighbor_id: NodeId, cost: Cost) {
        let now = self.clock.now();
        let mut table = self.table.lock();
        table.ensure(neighbor_id, now);
        table.set_direct(neighbor_id, cost, now);
        drop(table);

        let entry = self.neighbors.entry(neighbor_id).or_insert_with(|| NeighborState {
            endpoint: self.self_endpoint,
            configured_cost: cost,
            disabled: false,
            last_seen: Some(now),
            last_vector_fingerprint: None,
        });
        entry.configured_cost = cost;
        entry.disabled = cost >= INF;
    }

    /// Operator command: emit the current vector immediately, without
    /// waiting for the next scheduled tick (spec §4.3.4).
    #[must_use]
    pub fn step(&self) -> Vec<(Endpoint, UpdateMessage)> {
        self.outgoing_updates()
    }

    /// Operator command: read-and-reset the inbound packet counter
    /// (spec §4.3.5).
    pub fn packets(&mut self) -> u32 {
        std::mem::take(&mut self.packets_received)
    }

    /// Operator command: disable the direct link to `neighbor_id`, then
    /// broadcast the updated vector immediately (spec §4.3.3 "Broadcast.",
    /// §6 `disable`).
    pub fn disable_link(&mut self, neighbor_id: NodeId) -> Result<Vec<(Endpoint, UpdateMessage)>> {
        if neighbor_id == self.self_id {
            return Err(Error::DisableSelf(neighbor_id));
        }
        let Some(state) = self.neighbors.get_mut(&neighbor_id) else {
            return Err(Error::DisableNonNeighbor(neighbor_id));
        };
        if state.disabled {
            return Err(Error::DisableNonNeighbor(neighbor_id));
        }
        state.disabled = true;
        state.configured_cost = INF;

        let now = self.clock.now();
        self.table.lock().invalidate(neighbor_id, now);
        warn!(neighbor = neighbor_id, "link disabled by operator");
        Ok(self.outgoing_updates())
    }

    /// Advance time: re-assert direct link costs (so a route overwritten by
    /// a transient cheaper transitive path can fall back once that path
    /// disappears) and expire neighbors that have been silent past the
    /// configured window (spec §4.3, §8).
    pub fn tick(&mut self) {
        let now = self.clock.now();
        self.refresh_direct_links(now);
        self.expire_silent_neighbors(now);
    }

    fn refresh_direct_links(&mut self, now: Instant) {
        let mut table = self.table.lock();
        for (&id, state) in &self.neighbors {
            if !state.disabled {
                table.relax(id, id, state.configured_cost, now);
            }
        }
    }

    fn expire_silent_neighbors(&mut self, now: Instant) {
        let expiry = self.config.expiry_window();
        let mut expired = Vec::new();

        for (&id, state) in &self.neighbors {
            if state.disabled {
                continue;
            }
            if let Some(last_seen) = state.last_seen {
                if now.saturating_duration_since(last_seen) > expiry {
                    expired.push(id);
                }
            }
        }

        if expired.is_empty() {
            return;
        }

        let mut table = self.table.lock();
        for id in &expired {
            table.invalidate(*id, now);
        }
        drop(table);

        for id in expired {
            warn!(neighbor = id, "neighbor silent past expiry window, route invalidated");
            if let Some(state) = self.neighbors.get_mut(&id) {
                state.last_seen = None;
            }
        }
    }

    /// Build the outgoing update datagrams to send to every live direct
    /// neighbor (spec §4.3, §4.5). Returns an empty vec while crashed.
    ///
    /// The vector always includes this node's own self-record (`neighbor_id
    /// == self_id`, `cost == 0`, spec §4.1): receivers use it, via the
    /// `on_packet` special case, to learn this node's view of the link back
    /// to them.
    #[must_use]
    pub fn outgoing_updates(&self) -> Vec<(Endpoint, UpdateMessage)> {
        if self.crashed {
            return Vec::new();
        }

        let table = self.table.lock();
        let records: Vec<UpdateRecord> = table
            .snapshot()
            .into_iter()
            .filter_map(|(id, entry)| {
                let endpoint = if id == self.self_id {
                    self.self_endpoint
                } else {
                    *self.node_endpoints.get(&id)?
                };
                Some(UpdateRecord {
                    endpoint,
                    neighbor_id: id,
                    cost: entry.cost,
                })
            })
            .collect();
        drop(table);

        self.neighbors
            .values()
            .filter(|n| !n.disabled)
            .map(|n| (n.endpoint, UpdateMessage::new(self.self_endpoint, records.clone())))
            .collect()
    }

    /// Operator command: crash this node (spec §4.3.7, §6 `crash`).
    ///
    /// Crash is terminal, not a reversible toggle: once set, the engine
    /// stops accepting packets and advertising, and the caller is expected
    /// to tear down the listener/scheduler and exit the process.
    pub fn crash(&mut self) {
        self.crashed = true;
        warn!(self_id = self.self_id, "node crashed, process terminating");
    }

    #[must_use]
    pub const fn is_crashed(&self) -> bool {
        self.crashed
    }

    /// Human-readable routing table dump (spec §4.2, §6 `display`):
    /// the self-row and unreachable destinations are omitted, leaving only
    /// the rows an operator would act on.
    #[must_use]
    pub fn display(&self) -> String {
        let table = self.table.lock();
        let mut out = String::new();
        for (id, entry) in table.snapshot() {
            if id == self.self_id || entry.cost >= INF || entry.next_hop == NO_HOP {
                continue;
            }
            out.push_str(&format!("{id}\t{}\tvia {}\n", entry.cost, entry.next_hop));
        }
        out
    }

    /// Resolve a datagram's claimed sender endpoint to a node id, searching
    /// every node named in the topology (not just current direct
    /// neighbors) — the cross-remote `update` redirect (spec §4.3.2) can
    /// land a packet whose sender is not yet, or no longer, a neighbor.
    fn find_neighbor_id(&self, endpoint: Endpoint) -> Option<NodeId> {
        self.neighbors
            .iter()
            .find(|(_, state)| state.endpoint == endpoint)
            .map(|(&id, _)| id)
            .or_else(|| {
                self.node_endpoints
                    .iter()
                    .find(|(_, &ep)| ep == endpoint)
                    .map(|(&id, _)| id)
            })
    }
}

/// Cheap order-sensitive fingerprint of an update's records, used only for
/// duplicate suppression within a short time window — not a security
/// property (spec §8 "duplicate suppression").
fn fingerprint(msg: &UpdateMessage) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for record in &msg.records {
        record.neighbor_id.hash(&mut hasher);
        record.cost.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvr_core::clock::TestClock;
    use dvr_core::topology::{Topology, TopologyEntry};
    use std::net::Ipv4Addr;

    /// A 1-2-3 path: 1 and 3 are not direct neighbors, so any route between
    /// them must be learned transitively via 2.
    fn triangle_topology(self_id: NodeId) -> Topology {
        let cost = |a: NodeId, b: NodeId| -> Cost {
            if a == b {
                return INF;
            }
            if (a, b) == (1, 3) || (a, b) == (3, 1) {
                return INF;
            }
            1
        };

        Topology {
            self_id,
            entries: vec![
                TopologyEntry {
                    id: 1,
                    endpoint: Endpoint::new(Ipv4Addr::new(10, 0, 0, 1), 5001),
                    initial_direct_cost: cost(self_id, 1),
                },
                TopologyEntry {
                    id: 2,
                    endpoint: Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5002),
                    initial_direct_cost: cost(self_id, 2),
                },
                TopologyEntry {
                    id: 3,
                    endpoint: Endpoint::new(Ipv4Addr::new(10, 0, 0, 3), 5003),
                    initial_direct_cost: cost(self_id, 3),
                },
            ],
        }
    }

    #[test]
    fn learns_transitive_route() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let mut engine = Engine::new(&topo, Config::default(), clock);

        let msg = UpdateMessage::new(
            Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5002),
            vec![UpdateRecord {
                endpoint: Endpoint::new(Ipv4Addr::new(10, 0, 0, 3), 5003),
                neighbor_id: 3,
                cost: 1,
            }],
        );
        engine.on_packet(&msg).unwrap();

        let table = engine.shared_table();
        let entry = table.lock().get(3);
        assert_eq!(entry.cost, 2);
        assert_eq!(entry.next_hop, 2);
    }

    #[test]
    fn rejects_packet_from_unknown_sender() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let mut engine = Engine::new(&topo, Config::default(), clock);

        let msg = UpdateMessage::new(
            Endpoint::new(Ipv4Addr::new(192, 168, 9, 9), 9999),
            vec![],
        );
        assert!(engine.on_packet(&msg).is_err());
    }

    #[test]
    fn disable_link_invalidates_direct_route() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let mut engine = Engine::new(&topo, Config::default(), clock);

        engine.disable_link(2).unwrap();
        let entry = engine.shared_table().lock().get(2);
        assert!(!entry.is_reachable());
    }

    #[test]
    fn cannot_disable_self() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let mut engine = Engine::new(&topo, Config::default(), clock);
        assert!(engine.disable_link(1).is_err());
    }

    #[test]
    fn tick_expires_silent_neighbor() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let mut engine = Engine::new(&topo, Config::default(), Arc::clone(&clock) as Arc<dyn Clock>);

        clock.advance(engine.config.expiry_window() + std::time::Duration::from_secs(1));
        engine.tick();

        let entry = engine.shared_table().lock().get(2);
        assert!(!entry.is_reachable());
    }

    #[test]
    fn step_emits_to_every_enabled_neighbor_including_self_record() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let engine = Engine::new(&topo, Config::default(), clock);

        let outgoing = engine.step();
        assert_eq!(outgoing.len(), 1); // only node 2 is a direct neighbor of 1
        let (_, msg) = &outgoing[0];
        assert!(msg.records.iter().any(|r| r.neighbor_id == 1 && r.cost == 0));
    }

    #[test]
    fn packets_counts_and_resets() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let mut engine = Engine::new(&topo, Config::default(), clock);

        let msg = UpdateMessage::new(
            Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5002),
            vec![],
        );
        engine.on_packet(&msg).unwrap();
        engine.on_packet(&msg).unwrap();

        assert_eq!(engine.packets(), 2);
        assert_eq!(engine.packets(), 0); // reset after read
    }

    #[test]
    fn crash_is_terminal_and_silences_the_engine() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let mut engine = Engine::new(&topo, Config::default(), clock);

        engine.crash();
        assert!(engine.is_crashed());
        assert!(engine.outgoing_updates().is_empty());

        let msg = UpdateMessage::new(
            Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5002),
            vec![],
        );
        engine.on_packet(&msg).unwrap();
        assert_eq!(engine.packets(), 0, "a crashed engine must not count inbound packets");
    }

    #[test]
    fn display_hides_self_row_and_unreachable_destinations() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let engine = Engine::new(&topo, Config::default(), clock);

        let out = engine.display();
        assert!(!out.lines().any(|l| l.starts_with("1\t")), "self row must not appear");
        assert!(!out.lines().any(|l| l.starts_with("3\t")), "node 3 is not yet reachable");
        assert!(out.contains("2\t1\tvia 2"));
    }

    #[test]
    fn update_link_between_two_remote_nodes_emits_a_redirect_to_each() {
        let clock = Arc::new(TestClock::new());
        let topo = triangle_topology(1);
        let mut engine = Engine::new(&topo, Config::default(), clock);

        let redirects = engine.update_link(2, 3, 42).unwrap();
        assert_eq!(redirects.len(), 2);

        let (dest_for_2, msg_to_2) = redirects
            .iter()
            .find(|(dest, _)| *dest == Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5002))
            .unwrap();
        assert_eq!(*dest_for_2, Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5002));
        assert_eq!(msg_to_2.sender, Endpoint::new(Ipv4Addr::new(10, 0, 0, 3), 5003));
        assert_eq!(msg_to_2.records.len(), 1);
        assert_eq!(msg_to_2.records[0].neighbor_id, 2);
        assert_eq!(msg_to_2.records[0].cost, 42);
    }
}
