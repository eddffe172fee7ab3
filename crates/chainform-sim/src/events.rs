//! Formation events for the run timeline.

use chainform_auction::{AuctionKind, ExpiryReason, Placement};
use chainform_formation::DVec2;
use chainform_topology::AgentId;
use serde::{Deserialize, Serialize};

/// Events that occur while a chain forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FormationEvent {
    /// A free agent entered the arena
    AgentSpawned {
        agent: AgentId,
        position: DVec2,
        tick: u64,
    },

    /// The operator picked the seed
    SeedElected { agent: AgentId, tick: u64 },

    /// An auction was announced
    AuctionOpened {
        kind: AuctionKind,
        announcer: AgentId,
        version: u64,
        tick: u64,
    },

    /// A bid was sent
    BidPlaced {
        kind: AuctionKind,
        bidder: AgentId,
        auction: AgentId,
        cost: f64,
        tick: u64,
    },

    /// A free agent was promoted and placed
    AuctionSettled {
        kind: AuctionKind,
        announcer: AgentId,
        recruit: AgentId,
        cell: AgentId,
        placement: Placement,
        version: u64,
        tick: u64,
    },

    /// An auction closed without changing the chain
    AuctionExpired {
        kind: AuctionKind,
        announcer: AgentId,
        reason: ExpiryReason,
        tick: u64,
    },

    /// The operator replaced the formation
    FormationChanged { seed: AgentId, version: u64, tick: u64 },

    /// Every cell stayed settled for the whole window
    Quiescent { tick: u64 },

    /// The run hit its tick cap first
    TickCapReached { tick: u64 },

    /// The chain stopped being a simple path
    Fault { description: String, tick: u64 },
}

impl FormationEvent {
    /// Get the tick this event happened on.
    pub fn tick(&self) -> u64 {
        match self {
            FormationEvent::AgentSpawned { tick, .. } => *tick,
            FormationEvent::SeedElected { tick, .. } => *tick,
            FormationEvent::AuctionOpened { tick, .. } => *tick,
            FormationEvent::BidPlaced { tick, .. } => *tick,
            FormationEvent::AuctionSettled { tick, .. } => *tick,
            FormationEvent::AuctionExpired { tick, .. } => *tick,
            FormationEvent::FormationChanged { tick, .. } => *tick,
            FormationEvent::Quiescent { tick } => *tick,
            FormationEvent::TickCapReached { tick } => *tick,
            FormationEvent::Fault { tick, .. } => *tick,
        }
    }

    /// Version published by this event, for settlements and formation changes.
    pub fn version(&self) -> Option<u64> {
        match self {
            FormationEvent::AuctionSettled { version, .. } | FormationEvent::FormationChanged { version, .. } => {
                Some(*version)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainform_topology::Side;

    #[test]
    fn serializes_with_type_tag() {
        let event = FormationEvent::AuctionSettled {
            kind: AuctionKind::Push,
            announcer: AgentId(0),
            recruit: AgentId(-4),
            cell: AgentId(1),
            placement: Placement::Attach { anchor: AgentId(0), side: Side::Right },
            version: 1,
            tick: 4,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AuctionSettled");
        assert_eq!(json["kind"], "push");
        assert_eq!(json["placement"]["edit"], "attach");

        let back: FormationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.tick(), 4);
        assert_eq!(back.version(), Some(1));
    }
}
