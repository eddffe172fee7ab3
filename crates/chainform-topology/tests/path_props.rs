//! Property tests: any sequence of attaches and splices keeps a simple path.

use std::collections::BTreeMap;

use chainform_topology::{
    attach, check_simple_path, hop_count, splice_between, walk, AgentId, LedgerStore, Side, TopologyLedger,
};
use proptest::prelude::*;

#[derive(Default)]
struct Arena(BTreeMap<AgentId, TopologyLedger>);

impl LedgerStore for Arena {
    type Data = ();

    fn ledger(&self, id: AgentId) -> Option<&TopologyLedger> {
        self.0.get(&id)
    }

    fn ledger_mut(&mut self, id: AgentId) -> Option<&mut TopologyLedger> {
        self.0.get_mut(&id)
    }

    fn ledger_ids(&self) -> Vec<AgentId> {
        self.0.keys().copied().collect()
    }
}

#[derive(Debug, Clone)]
enum Growth {
    /// Attach to a free side of the agent at this index (mod population).
    Attach(usize),
    /// Splice after the agent at this index (mod population) if it has a neighbor.
    Splice(usize, bool),
}

fn growth() -> impl Strategy<Value = Growth> {
    prop_oneof![
        any::<usize>().prop_map(Growth::Attach),
        (any::<usize>(), any::<bool>()).prop_map(|(i, right)| Growth::Splice(i, right)),
    ]
}

fn grow(ops: &[Growth]) -> Arena {
    let mut arena = Arena::default();
    arena.0.insert(AgentId(0), TopologyLedger::new());

    for (n, op) in ops.iter().enumerate() {
        let ids = arena.ledger_ids();
        let new = AgentId(n as i64 + 1);
        arena.0.insert(new, TopologyLedger::new());

        let placed = match *op {
            Growth::Attach(i) => {
                let anchor = ids[i % ids.len()];
                match arena.0[&anchor].free_side() {
                    Some(side) => attach(&mut arena, anchor, side, new).is_ok(),
                    None => false,
                }
            }
            Growth::Splice(i, right) => {
                let a = ids[i % ids.len()];
                let side = if right { Side::Right } else { Side::Left };
                match arena.0[&a].neighbor(side) {
                    Some(b) => splice_between(&mut arena, a, b, new).is_ok(),
                    None => false,
                }
            }
        };

        if !placed {
            arena.0.remove(&new);
        }
    }
    arena
}

proptest! {
    #[test]
    fn growth_keeps_simple_path(ops in prop::collection::vec(growth(), 0..40)) {
        let arena = grow(&ops);
        prop_assert!(check_simple_path(&arena).is_ok());
    }

    #[test]
    fn chain_is_connected(ops in prop::collection::vec(growth(), 0..40)) {
        let arena = grow(&ops);
        let left = walk(&arena, AgentId(0), Side::Left).unwrap();
        let right = walk(&arena, AgentId(0), Side::Right).unwrap();
        prop_assert_eq!(left.len() + right.len() + 1, arena.0.len());
    }

    #[test]
    fn degree_never_exceeds_two(ops in prop::collection::vec(growth(), 0..40)) {
        let arena = grow(&ops);
        for ledger in arena.0.values() {
            prop_assert!(ledger.degree() <= 2);
        }
    }

    #[test]
    fn splice_shifts_hop_counts_by_at_most_one(
        ops in prop::collection::vec(growth(), 1..30),
        pick in any::<usize>(),
        right in any::<bool>(),
    ) {
        let mut arena = grow(&ops);
        let ids = arena.ledger_ids();
        let a = ids[pick % ids.len()];
        let side = if right { Side::Right } else { Side::Left };
        let Some(b) = arena.0[&a].neighbor(side) else { return Ok(()) };

        let before = [
            hop_count(&arena, AgentId(0), Side::Left).unwrap(),
            hop_count(&arena, AgentId(0), Side::Right).unwrap(),
        ];
        let new = AgentId(10_000);
        arena.0.insert(new, TopologyLedger::new());
        splice_between(&mut arena, a, b, new).unwrap();
        let after = [
            hop_count(&arena, AgentId(0), Side::Left).unwrap(),
            hop_count(&arena, AgentId(0), Side::Right).unwrap(),
        ];

        prop_assert_eq!(after[0] + after[1], before[0] + before[1] + 1);
        for (pre, post) in before.iter().zip(after.iter()) {
            prop_assert!(post - pre <= 1);
        }
    }
}
