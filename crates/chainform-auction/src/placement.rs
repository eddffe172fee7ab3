//! Where a recruited agent joins the chain.
//!
//! Placement is decided from a read-only view of the winner's surroundings so
//! it can be planned before any ledger is touched. The caller carries out the
//! resulting [`Placement`] with `attach` or `splice_between`.

use chainform_topology::{AgentId, Side, TopologyLedger};

/// A topology edit that places a new agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "edit", rename_all = "snake_case"))]
pub enum Placement {
    /// Link to the free `side` of `anchor`.
    Attach { anchor: AgentId, side: Side },
    /// Insert strictly between the linked pair `a` and `b`.
    Splice { a: AgentId, b: AgentId },
}

impl Placement {
    /// The existing agent the new one is placed next to.
    pub fn anchor(&self) -> AgentId {
        match *self {
            Placement::Attach { anchor, .. } => anchor,
            Placement::Splice { a, .. } => a,
        }
    }
}

/// One neighbor of an insertion winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborView {
    pub id: AgentId,
    /// Length of the chain arm this neighbor leads into, counted from the winner.
    pub hops: usize,
    /// Chain hops from this neighbor to the seed.
    pub seed_hops: usize,
}

/// What an insertion winner knows about its position in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteView {
    pub winner: AgentId,
    pub is_seed: bool,
    pub left: Option<NeighborView>,
    pub right: Option<NeighborView>,
}

impl SiteView {
    fn neighbor(&self, side: Side) -> Option<&NeighborView> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }

    /// First free side, right before left.
    fn free_side(&self) -> Option<Side> {
        [Side::Right, Side::Left].into_iter().find(|&side| self.neighbor(side).is_none())
    }
}

/// Decide where an insertion auction's announcer joins.
///
/// A seed with a free side takes the new agent there. A saturated seed
/// splices on the side whose arm is shorter, left on a tie. A non-seed with
/// both neighbors splices toward the neighbor more hops from the seed, left
/// on a tie. A non-seed at a chain end extends it.
pub fn plan_insertion(site: &SiteView) -> Placement {
    let winner = site.winner;
    let toward = match (site.left, site.right) {
        (Some(left), Some(right)) => {
            let go_right = if site.is_seed {
                right.hops < left.hops
            } else {
                right.seed_hops > left.seed_hops
            };
            if go_right {
                right
            } else {
                left
            }
        }
        _ => {
            let side = site.free_side().unwrap_or(Side::Right);
            return Placement::Attach { anchor: winner, side };
        }
    };
    Placement::Splice { a: winner, b: toward.id }
}

/// Decide where a push auction's winner joins.
///
/// The announced side is used if it is still free; otherwise the other side,
/// if that one is free. `None` means the announcer no longer has room.
pub fn plan_push<T>(announcer: AgentId, announced: Side, ledger: &TopologyLedger<T>) -> Option<Placement> {
    [announced, announced.opposite()]
        .into_iter()
        .find(|&side| ledger.neighbor(side).is_none())
        .map(|side| Placement::Attach { anchor: announcer, side })
}
