//! Packets exchanged between agents and the environment.

use std::fmt;

use chainform_auction::{Bid, InsertionAnnouncement, PushAnnouncement};
use chainform_formation::{FormationDescriptor, StateSnapshot};
use chainform_topology::{AgentId, Side};

/// Payload of a packet.
#[derive(Debug, Clone)]
pub enum Message {
    /// Single-hop state gossip.
    State(StateSnapshot),
    /// New formation, accepted only from the operator.
    ChangeFormation(FormationDescriptor),
    PushAnnouncement(PushAnnouncement),
    InsertionAnnouncement(InsertionAnnouncement),
    Bid(Bid),
    /// Hold still until this formation version has been adopted.
    Bump { version: u64 },
    /// The receiver gained `neighbor` on `side`.
    LinkAdded { neighbor: AgentId, side: Side },
    /// The receiver lost `neighbor`.
    LinkDropped { neighbor: AgentId },
}

/// Message discriminant, used for routing and per-kind counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    State,
    ChangeFormation,
    PushAnnouncement,
    InsertionAnnouncement,
    Bid,
    Bump,
    LinkAdded,
    LinkDropped,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::State(_) => MessageKind::State,
            Message::ChangeFormation(_) => MessageKind::ChangeFormation,
            Message::PushAnnouncement(_) => MessageKind::PushAnnouncement,
            Message::InsertionAnnouncement(_) => MessageKind::InsertionAnnouncement,
            Message::Bid(_) => MessageKind::Bid,
            Message::Bump { .. } => MessageKind::Bump,
            Message::LinkAdded { .. } => MessageKind::LinkAdded,
            Message::LinkDropped { .. } => MessageKind::LinkDropped,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::State => "state",
            MessageKind::ChangeFormation => "change_formation",
            MessageKind::PushAnnouncement => "push_announcement",
            MessageKind::InsertionAnnouncement => "insertion_announcement",
            MessageKind::Bid => "bid",
            MessageKind::Bump => "bump",
            MessageKind::LinkAdded => "link_added",
            MessageKind::LinkDropped => "link_dropped",
        };
        f.write_str(name)
    }
}

/// A message in flight from one agent to another.
#[derive(Debug, Clone)]
pub struct Packet {
    pub from: AgentId,
    /// A concrete agent, or [`AgentId::BROADCAST`] before routing.
    pub to: AgentId,
    pub message: Message,
}

impl Packet {
    pub fn new(from: AgentId, to: AgentId, message: Message) -> Self {
        Self { from, to, message }
    }

    pub fn broadcast(from: AgentId, message: Message) -> Self {
        Self::new(from, AgentId::BROADCAST, message)
    }

    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    pub fn is_broadcast(&self) -> bool {
        self.to == AgentId::BROADCAST
    }
}
