use std::time::{Duration, Instant};

use dvr_core::table::RoutingTable;
use dvr_core::types::{Cost, NodeId, INF};
use proptest::prelude::*;

fn arb_relax_step() -> impl Strategy<Value = (NodeId, NodeId, Cost)> {
    (2..8u16, 2..8u16, 0..200_000u32)
}

proptest! {
    /// No sequence of relaxations can ever produce a cost above `INF`, and
    /// the self row never moves (spec §3 invariants).
    #[test]
    fn relax_never_exceeds_inf_and_self_is_stable(
        steps in proptest::collection::vec(arb_relax_step(), 0..50)
    ) {
        let now = Instant::now();
        let mut table = RoutingTable::new(1, now);

        for (i, (dest, via, cost)) in steps.into_iter().enumerate() {
            let t = now + Duration::from_millis(i as u64);
            table.ensure(dest, t);
            table.relax(dest, via, cost, t);

            prop_assert!(table.get(dest).cost <= INF);
            prop_assert_eq!(table.get(1), dvr_core::table::RouteEntry { cost: 0, next_hop: 1 });
        }
    }

    /// Invalidating a destination always leaves it unreachable, and never
    /// makes some *other*, unrelated destination unreachable.
    #[test]
    fn invalidate_is_targeted(
        seed_cost in 1..1000u32,
        other_cost in 1..1000u32,
    ) {
        let now = Instant::now();
        let mut table = RoutingTable::new(1, now);
        table.ensure(2, now);
        table.ensure(3, now);
        table.relax(2, 2, seed_cost, now);
        table.relax(3, 3, other_cost, now);

        table.invalidate(2, now);

        prop_assert!(!table.get(2).is_reachable());
        prop_assert_eq!(table.get(3).cost, other_cost.min(INF));
    }
}
