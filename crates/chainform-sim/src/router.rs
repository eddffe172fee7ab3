//! Store-and-forward packet routing.
//!
//! Packets produced during a tick are forwarded at the end of it and
//! delivered into inboxes at the start of the next one. Nothing an agent
//! sends is visible to anyone in the same tick.

use chainform_topology::AgentId;
use tracing::trace;

use crate::{MessageKind, Packet};

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Free,
    Attached,
    Everyone,
}

impl Audience {
    /// Fan-out for a broadcast of `kind`.
    pub fn of(kind: MessageKind) -> Self {
        match kind {
            MessageKind::PushAnnouncement => Audience::Free,
            MessageKind::InsertionAnnouncement => Audience::Attached,
            _ => Audience::Everyone,
        }
    }

    pub fn includes(&self, attached: bool) -> bool {
        match self {
            Audience::Free => !attached,
            Audience::Attached => attached,
            Audience::Everyone => true,
        }
    }
}

/// Address lookup over the live population.
pub trait Directory {
    /// True if `id` names a live agent.
    fn contains(&self, id: AgentId) -> bool;

    /// Live agents in `audience`, in a stable order.
    fn members(&self, audience: Audience) -> Vec<AgentId>;
}

/// Counts from one forwarding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    pub forwarded: usize,
    pub dropped: usize,
}

impl RouteStats {
    pub fn merge(&mut self, other: RouteStats) {
        self.forwarded += other.forwarded;
        self.dropped += other.dropped;
    }
}

/// Holds packets between forwarding and delivery.
#[derive(Debug, Default)]
pub struct Router {
    in_flight: Vec<Packet>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve destinations and hold packets for the next delivery.
    ///
    /// Broadcasts fan out to the audience for their kind, never back to the
    /// sender. Unicast packets to unknown agents are dropped and counted.
    pub fn forward<D>(&mut self, packets: Vec<Packet>, directory: &D) -> RouteStats
    where
        D: Directory + ?Sized,
    {
        let mut stats = RouteStats::default();
        for packet in packets {
            if packet.is_broadcast() {
                for to in directory.members(Audience::of(packet.kind())) {
                    if to == packet.from {
                        continue;
                    }
                    self.in_flight.push(Packet::new(packet.from, to, packet.message.clone()));
                    stats.forwarded += 1;
                }
            } else if directory.contains(packet.to) {
                self.in_flight.push(packet);
                stats.forwarded += 1;
            } else {
                trace!(from = %packet.from, to = %packet.to, kind = %packet.kind(), "dropping unroutable packet");
                stats.dropped += 1;
            }
        }
        stats
    }

    /// Hand every held packet to `deliver`, which returns the packet if its
    /// destination has gone. Returns how many were dropped that way.
    pub fn deliver<F>(&mut self, mut deliver: F) -> usize
    where
        F: FnMut(Packet) -> Option<Packet>,
    {
        let mut dropped = 0;
        for packet in std::mem::take(&mut self.in_flight) {
            if let Some(packet) = deliver(packet) {
                trace!(from = %packet.from, to = %packet.to, kind = %packet.kind(), "destination gone");
                dropped += 1;
            }
        }
        dropped
    }

    /// Packets waiting for delivery.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use chainform_auction::InsertionAnnouncement;

    /// Chain ids are attached, everything else is free.
    struct Roster(Vec<AgentId>);

    impl Directory for Roster {
        fn contains(&self, id: AgentId) -> bool {
            self.0.contains(&id)
        }

        fn members(&self, audience: Audience) -> Vec<AgentId> {
            self.0.iter().copied().filter(|id| audience.includes(id.is_chain())).collect()
        }
    }

    fn roster() -> Roster {
        Roster(vec![AgentId(0), AgentId(1), AgentId(-4), AgentId(-5)])
    }

    #[test]
    fn insertion_announcement_reaches_chain_only() {
        let mut router = Router::new();
        let ann = Message::InsertionAnnouncement(InsertionAnnouncement { announcer: AgentId(-4) });
        let stats = router.forward(vec![Packet::broadcast(AgentId(-4), ann)], &roster());

        assert_eq!(stats, RouteStats { forwarded: 2, dropped: 0 });
        let mut got = Vec::new();
        router.deliver(|p| {
            got.push(p.to);
            None
        });
        assert_eq!(got, vec![AgentId(0), AgentId(1)]);
    }

    #[test]
    fn other_broadcasts_skip_sender() {
        let mut router = Router::new();
        let stats = router.forward(vec![Packet::broadcast(AgentId(1), Message::Bump { version: 2 })], &roster());
        assert_eq!(stats.forwarded, 3);
    }

    #[test]
    fn unknown_unicast_is_dropped() {
        let mut router = Router::new();
        let stats = router.forward(
            vec![Packet::new(AgentId(0), AgentId(-9), Message::Bump { version: 1 })],
            &roster(),
        );
        assert_eq!(stats, RouteStats { forwarded: 0, dropped: 1 });
        assert_eq!(router.in_flight(), 0);
    }

    #[test]
    fn delivery_counts_vanished_destinations() {
        let mut router = Router::new();
        router.forward(
            vec![
                Packet::new(AgentId(0), AgentId(1), Message::Bump { version: 1 }),
                Packet::new(AgentId(0), AgentId(-4), Message::Bump { version: 1 }),
            ],
            &roster(),
        );
        let dropped = router.deliver(|p| if p.to == AgentId(-4) { Some(p) } else { None });
        assert_eq!(dropped, 1);
        assert_eq!(router.in_flight(), 0);
    }
}
