//! Auction announcements.

use chainform_formation::geometry::rotate_deg;
use chainform_formation::{DVec2, StateSnapshot};
use chainform_topology::{AgentId, Side};

/// Boundary-growth announcement from an attached agent with a free side.
#[derive(Debug, Clone)]
pub struct PushAnnouncement {
    pub origin_gradient: DVec2,
    pub origin_state: StateSnapshot,
    /// The announcer's side being offered.
    pub side: Side,
}

impl PushAnnouncement {
    pub fn new(origin_state: StateSnapshot, side: Side) -> Self {
        Self {
            origin_gradient: origin_state.gradient,
            origin_state,
            side,
        }
    }

    /// Offset from the announcer to the open slot, in world coordinates.
    ///
    /// Recomputed from the announced descriptor and gradient rather than
    /// trusted from the announcer's ledger.
    pub fn slot_offset(&self) -> DVec2 {
        let rels = self.origin_state.descriptor.relationships_at(self.origin_gradient);
        let frame = self.origin_state.heading - self.origin_state.rot_error;
        rotate_deg(rels[self.side.index()], frame)
    }

    /// World position of the open slot given where the announcer is.
    pub fn slot_position(&self, announcer_position: DVec2) -> DVec2 {
        announcer_position + self.slot_offset()
    }
}

/// Anywhere-in-chain announcement from a free agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionAnnouncement {
    pub announcer: AgentId,
}
