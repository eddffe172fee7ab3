//! Chain edits and path invariants over a population of ledgers.
//!
//! The functions here work against any [`LedgerStore`], so the population can
//! live in whatever arena the caller prefers. Every edit checks all of its
//! preconditions before touching a ledger: a caller never observes a half
//! spliced chain, even when the edit fails.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::{AgentId, Result, Side, TopologyError, TopologyFault, TopologyLedger, MAX_NEIGHBORS};

/// A population of agents addressable by id, each owning a ledger.
pub trait LedgerStore {
    /// Per-link data kept in each ledger. New links start from `Default`.
    type Data: Default;

    /// Ledger of an agent, if it is part of the chain.
    fn ledger(&self, id: AgentId) -> Option<&TopologyLedger<Self::Data>>;

    /// Mutable ledger of an agent.
    fn ledger_mut(&mut self, id: AgentId) -> Option<&mut TopologyLedger<Self::Data>>;

    /// Ids of every agent that owns a ledger, in a stable order.
    fn ledger_ids(&self) -> Vec<AgentId>;

    /// Number of agents owning a ledger. Bounds every walk.
    fn population(&self) -> usize {
        self.ledger_ids().len()
    }
}

fn require<S: LedgerStore>(store: &S, id: AgentId) -> Result<&TopologyLedger<S::Data>> {
    store.ledger(id).ok_or(TopologyError::UnknownAgent(id))
}

fn require_mut<S: LedgerStore>(store: &mut S, id: AgentId) -> Result<&mut TopologyLedger<S::Data>> {
    store.ledger_mut(id).ok_or(TopologyError::UnknownAgent(id))
}

/// Link `new` to the free `side` of `anchor`.
///
/// `new` ends up with `anchor` on the opposite side, which keeps left/right
/// orientation consistent along the whole chain.
pub fn attach<S: LedgerStore>(store: &mut S, anchor: AgentId, side: Side, new: AgentId) -> Result<()> {
    if anchor == new {
        return Err(TopologyError::AlreadyLinked { agent: anchor, neighbor: new });
    }
    if !require(store, new)?.is_empty() {
        return Err(TopologyError::NotIsolated(new));
    }
    let anchor_ledger = require(store, anchor)?;
    if anchor_ledger.degree() >= MAX_NEIGHBORS {
        return Err(TopologyFault::DegreeOverflow { agent: anchor }.into());
    }
    if anchor_ledger.neighbor(side).is_some() {
        return Err(TopologyError::SideOccupied { agent: anchor, side });
    }

    require_mut(store, anchor)?.add(anchor, side, new, S::Data::default())?;
    require_mut(store, new)?.add(new, side.opposite(), anchor, S::Data::default())?;
    Ok(())
}

/// Insert `new` strictly between the linked agents `a` and `b`.
///
/// Afterwards `a` and `b` no longer list each other, both list `new` on the
/// side that used to point at the other, and `new` lists both. Returns the
/// side of `a` that `new` now occupies.
pub fn splice_between<S: LedgerStore>(store: &mut S, a: AgentId, b: AgentId, new: AgentId) -> Result<Side> {
    if new == a || new == b {
        return Err(TopologyError::AlreadyLinked { agent: a, neighbor: b });
    }
    if !require(store, new)?.is_empty() {
        return Err(TopologyError::NotIsolated(new));
    }
    let side = require(store, a)?
        .side_of(b)
        .ok_or(TopologyError::NotLinked { a, b })?;
    if require(store, b)?.side_of(a) != Some(side.opposite()) {
        return Err(TopologyFault::Asymmetric { agent: a, neighbor: b }.into());
    }

    require_mut(store, a)?.replace(side, new, S::Data::default());
    require_mut(store, b)?.replace(side.opposite(), new, S::Data::default());
    let ledger = require_mut(store, new)?;
    ledger.add(new, side.opposite(), a, S::Data::default())?;
    ledger.add(new, side, b, S::Data::default())?;
    Ok(side)
}

/// Agents reached by walking from `from` in direction `side`, nearest first.
///
/// Stops at a neighborless end. Walking further than the population size
/// means the links loop back on themselves, which is reported as a cycle.
pub fn walk<S: LedgerStore>(store: &S, from: AgentId, side: Side) -> Result<Vec<AgentId>> {
    let limit = store.population();
    let mut visited = Vec::new();
    let mut prev = from;
    let mut current = require(store, from)?.neighbor(side);

    while let Some(next) = current {
        if visited.len() >= limit || next == from {
            return Err(TopologyFault::Cycle { agent: from }.into());
        }
        let ledger = store
            .ledger(next)
            .ok_or(TopologyFault::Dangling { agent: prev, neighbor: next })?;
        if !ledger.contains(prev) {
            return Err(TopologyFault::Asymmetric { agent: prev, neighbor: next }.into());
        }
        visited.push(next);
        current = ledger.other_than(prev);
        prev = next;
    }
    Ok(visited)
}

/// Number of hops from `from` to the end of the chain on `side`.
pub fn hop_count<S: LedgerStore>(store: &S, from: AgentId, side: Side) -> Result<usize> {
    walk(store, from, side).map(|agents| agents.len())
}

/// Verify that the union of all ledgers is a set of simple paths.
///
/// Every link must be mirrored on the opposite side of the neighbor, every
/// neighbor must exist, and every agent must be reachable from a path end.
/// An agent that can't be reached from an end sits on a cycle.
pub fn check_simple_path<S: LedgerStore>(store: &S) -> std::result::Result<(), TopologyFault> {
    let ids = store.ledger_ids();

    for &id in &ids {
        let Some(ledger) = store.ledger(id) else { continue };
        for (side, link) in ledger.iter() {
            let neighbor = store
                .ledger(link.id)
                .ok_or(TopologyFault::Dangling { agent: id, neighbor: link.id })?;
            if neighbor.side_of(id) != Some(side.opposite()) {
                return Err(TopologyFault::Asymmetric { agent: id, neighbor: link.id });
            }
        }
    }

    let mut reached: HashSet<AgentId> = HashSet::with_capacity(ids.len());
    for &id in &ids {
        let Some(ledger) = store.ledger(id) else { continue };
        if ledger.degree() == MAX_NEIGHBORS || reached.contains(&id) {
            continue;
        }
        reached.insert(id);
        for side in Side::ALL {
            let arm = walk(store, id, side).map_err(|err| match err {
                TopologyError::Fault(fault) => fault,
                _ => TopologyFault::Cycle { agent: id },
            })?;
            reached.extend(arm);
        }
    }

    match ids.into_iter().find(|id| !reached.contains(id)) {
        Some(agent) => Err(TopologyFault::Cycle { agent }),
        None => Ok(()),
    }
}

/// Human-readable dump of every ledger, one agent per line.
pub fn describe_topology<S: LedgerStore>(store: &S) -> String {
    let mut out = String::new();
    for id in store.ledger_ids() {
        let Some(ledger) = store.ledger(id) else { continue };
        let left = ledger.neighbor(Side::Left).unwrap_or(AgentId::NO_NEIGHBOR);
        let right = ledger.neighbor(Side::Right).unwrap_or(AgentId::NO_NEIGHBOR);
        let _ = writeln!(out, "{id}: left={left} right={right}");
    }
    out
}
