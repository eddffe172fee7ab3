//! Chainform Topology
//!
//! Bounded-degree adjacency for a swarm that organizes itself into a chain.
//!
//! # Structure
//!
//! Every attached agent owns a [`TopologyLedger`] with exactly two slots,
//! `left` and `right`. The union of all ledgers must form a simple path:
//! no branching (degree is structurally capped at 2) and no cycles.
//!
//! # Splicing
//!
//! New agents enter the chain either by attaching to a free side of an
//! existing agent or by being spliced strictly between two linked agents.
//! Both operations validate every precondition before mutating anything, so
//! a failed edit leaves all ledgers untouched.
//!
//! # Identifiers
//!
//! Agents are addressed by [`AgentId`]. Chain agents count up from zero, free
//! agents count down from `-4`, and `-1..=-3` are reserved sentinels. The
//! [`IdAllocator`] hands out both ranges and is owned by whoever owns the
//! population.

mod error;
mod id;
mod ledger;
mod path;

pub use error::{Result, TopologyError, TopologyFault};
pub use id::{AgentId, IdAllocator};
pub use ledger::{Link, Side, TopologyLedger};
pub use path::{attach, check_simple_path, describe_topology, hop_count, splice_between, walk, LedgerStore};

/// Maximum number of neighbors any agent may hold.
pub const MAX_NEIGHBORS: usize = 2;

/// Number of ledger sides (left and right).
pub const SIDES: usize = 2;

// A chain agent has one slot per side and nothing else
const _: () = assert!(SIDES == MAX_NEIGHBORS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_slot_per_side() {
        assert_eq!(Side::ALL.len(), MAX_NEIGHBORS);
    }
}
