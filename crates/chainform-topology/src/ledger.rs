//! Per-agent two-slot neighbor ledger.

use std::fmt;

use crate::{AgentId, Result, TopologyError, SIDES};

/// One side of an agent in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const ALL: [Side; SIDES] = [Side::Left, Side::Right];

    /// The other side.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Slot index: 0 for left, 1 for right.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// A neighbor reference plus whatever the owner tracks about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Link<T> {
    pub id: AgentId,
    pub data: T,
}

/// Bounded adjacency for one agent: at most one neighbor per side.
///
/// The ledger stores ids only. Callers resolve them against the live
/// population at use time, so a removed agent never leaves a dangling
/// reference behind.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyLedger<T = ()> {
    slots: [Option<Link<T>>; SIDES],
}

impl<T> Default for TopologyLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TopologyLedger<T> {
    /// An empty ledger.
    pub const fn new() -> Self {
        Self { slots: [None, None] }
    }

    /// The link on a side, if any.
    #[inline]
    pub fn get(&self, side: Side) -> Option<&Link<T>> {
        self.slots[side.index()].as_ref()
    }

    /// Mutable access to the link on a side.
    #[inline]
    pub fn get_mut(&mut self, side: Side) -> Option<&mut Link<T>> {
        self.slots[side.index()].as_mut()
    }

    /// Neighbor id on a side.
    #[inline]
    pub fn neighbor(&self, side: Side) -> Option<AgentId> {
        self.get(side).map(|link| link.id)
    }

    /// Which side holds this neighbor.
    pub fn side_of(&self, id: AgentId) -> Option<Side> {
        Side::ALL.into_iter().find(|&side| self.neighbor(side) == Some(id))
    }

    /// True if `id` is a neighbor on either side.
    pub fn contains(&self, id: AgentId) -> bool {
        self.side_of(id).is_some()
    }

    /// Link data for a neighbor.
    pub fn data_for(&self, id: AgentId) -> Option<&T> {
        self.side_of(id).and_then(|side| self.get(side)).map(|link| &link.data)
    }

    /// Mutable link data for a neighbor.
    pub fn data_for_mut(&mut self, id: AgentId) -> Option<&mut T> {
        let side = self.side_of(id)?;
        self.get_mut(side).map(|link| &mut link.data)
    }

    /// Number of occupied sides.
    pub fn degree(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// True if no side is occupied.
    pub fn is_empty(&self) -> bool {
        self.degree() == 0
    }

    /// A free side, preferring right.
    ///
    /// Growth fills the right side first; a left slot only opens once the
    /// right is taken.
    pub fn free_side(&self) -> Option<Side> {
        [Side::Right, Side::Left]
            .into_iter()
            .find(|&side| self.slots[side.index()].is_none())
    }

    /// The neighbor on the other side from `id`.
    pub fn other_than(&self, id: AgentId) -> Option<AgentId> {
        let side = self.side_of(id)?;
        self.neighbor(side.opposite())
    }

    /// Iterate occupied sides, left first.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &Link<T>)> {
        Side::ALL
            .into_iter()
            .filter_map(move |side| self.get(side).map(|link| (side, link)))
    }

    /// Iterate occupied sides mutably, left first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Side, &mut Link<T>)> {
        let [left, right] = &mut self.slots;
        left.as_mut()
            .map(|link| (Side::Left, link))
            .into_iter()
            .chain(right.as_mut().map(|link| (Side::Right, link)))
    }

    /// Neighbor ids, left first.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.iter().map(|(_, link)| link.id)
    }

    /// Link a neighbor on a side.
    ///
    /// Fails if the side is taken or the neighbor is already linked; the
    /// ledger is unchanged on failure.
    pub fn add(&mut self, owner: AgentId, side: Side, id: AgentId, data: T) -> Result<()> {
        if id.is_sentinel() {
            return Err(TopologyError::ReservedId(id));
        }
        if self.contains(id) {
            return Err(TopologyError::AlreadyLinked { agent: owner, neighbor: id });
        }
        if self.slots[side.index()].is_some() {
            return Err(TopologyError::SideOccupied { agent: owner, side });
        }
        self.slots[side.index()] = Some(Link { id, data });
        Ok(())
    }

    /// Unlink a neighbor, returning its link and the side it occupied.
    pub fn remove(&mut self, id: AgentId) -> Option<(Side, Link<T>)> {
        let side = self.side_of(id)?;
        self.slots[side.index()].take().map(|link| (side, link))
    }

    /// Replace whatever is on `side` with a new link.
    pub(crate) fn replace(&mut self, side: Side, id: AgentId, data: T) -> Option<Link<T>> {
        self.slots[side.index()].replace(Link { id, data })
    }

    /// Drop every link.
    pub fn clear(&mut self) {
        self.slots = [None, None];
    }
}
