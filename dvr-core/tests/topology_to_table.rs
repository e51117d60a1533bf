use std::io::Cursor;
use std::time::Instant;

use dvr_core::table::RoutingTable;
use dvr_core::topology;
use dvr_core::types::INF;

const LINE_TOPOLOGY: &str = "\
3
1
1 10.0.0.1 5001
2 10.0.0.2 5002
3 10.0.0.3 5003
1 2 4
";

#[test]
fn seeding_table_from_topology_only_sets_direct_neighbors() {
    let topo = topology::parse(Cursor::new(LINE_TOPOLOGY), 1).unwrap();
    let now = Instant::now();
    let mut table = RoutingTable::new(topo.self_id, now);

    for entry in &topo.entries {
        if entry.id == topo.self_id {
            continue;
        }
        table.ensure(entry.id, now);
        if entry.initial_direct_cost < INF {
            table.set_direct(entry.id, entry.initial_direct_cost, now);
        }
    }

    assert_eq!(table.get(1), dvr_core::table::RouteEntry { cost: 0, next_hop: 1 });
    assert_eq!(table.get(2).cost, 4);
    assert_eq!(table.get(2).next_hop, 2);
    assert!(!table.get(3).is_reachable());
}
