//! Agents: the free pool and the chain cells.
//!
//! An [`Agent`] is a body ([`Pose`]) plus an inbox plus a [`Role`]. Free
//! agents only bid and announce; chain cells own an [`AgentState`] (which in
//! turn owns the topology ledger), relax it against neighbor gossip each tick
//! and move toward their slot.

use std::collections::BTreeMap;

use chainform_auction::{
    AuctionConfig, AuctionKind, AuctionRecord, Bid, InsertionAnnouncement, OutstandingBid, PushAnnouncement,
};
use chainform_formation::{AgentState, DVec2};
use chainform_topology::AgentId;
use tracing::{debug, trace};

use crate::{Actuator, FormationEvent, Message, Packet, Pose, RecruitmentMode, VelocityCommand};

/// Read-only view of the world handed to every agent during a tick.
pub struct TickContext<'a> {
    pub tick: u64,
    /// Poses as they were when the tick started.
    pub positions: &'a BTreeMap<AgentId, Pose>,
    pub auction: &'a AuctionConfig,
    pub recruitment: RecruitmentMode,
    pub actuator: &'a dyn Actuator,
    /// Version most recently published by the environment.
    pub formation_version: u64,
    pub free_agents: usize,
    pub chain_length: usize,
}

impl TickContext<'_> {
    fn position_of(&self, id: AgentId) -> Option<DVec2> {
        self.positions.get(&id).map(|pose| pose.position)
    }
}

/// Packets and timeline events produced during a tick.
#[derive(Debug, Default)]
pub struct Outbox {
    packets: Vec<Packet>,
    events: Vec<FormationEvent>,
}

impl Outbox {
    pub fn send(&mut self, from: AgentId, to: AgentId, message: Message) {
        self.packets.push(Packet::new(from, to, message));
    }

    pub fn broadcast(&mut self, from: AgentId, message: Message) {
        self.packets.push(Packet::broadcast(from, message));
    }

    pub fn record(&mut self, event: FormationEvent) {
        self.events.push(event);
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn events(&self) -> &[FormationEvent] {
        &self.events
    }

    pub fn into_parts(self) -> (Vec<Packet>, Vec<FormationEvent>) {
        (self.packets, self.events)
    }
}

/// An agent not yet part of the chain.
#[derive(Debug, Clone)]
pub struct FreeAgent {
    ready_at: u64,
    auction: Option<AuctionRecord>,
}

impl FreeAgent {
    pub fn new(ready_at: u64) -> Self {
        Self { ready_at, auction: None }
    }

    /// First tick at which this agent may announce an insertion auction.
    pub fn ready_at(&self) -> u64 {
        self.ready_at
    }

    /// Wait until `tick` before announcing again.
    pub fn rest_until(&mut self, tick: u64) {
        self.ready_at = tick;
    }

    pub fn auction(&self) -> Option<&AuctionRecord> {
        self.auction.as_ref()
    }

    fn update(&mut self, id: AgentId, pose: &Pose, inbox: Vec<Packet>, ctx: &TickContext<'_>, out: &mut Outbox) {
        let mut offers = Vec::new();
        for packet in inbox {
            match packet.message {
                Message::PushAnnouncement(ann) if ann.origin_state.id == packet.from => {
                    offers.push((packet.from, ann));
                }
                Message::Bid(bid) => self.receive_bid(id, packet.from, bid),
                other => trace!(agent = %id, from = %packet.from, kind = %other.kind(), "free agent ignoring"),
            }
        }

        match ctx.recruitment {
            RecruitmentMode::Push => self.bid_on_nearest_slot(id, pose, &offers, ctx, out),
            RecruitmentMode::Insertion => {
                if self.auction.is_none() && ctx.tick >= self.ready_at && ctx.chain_length > 0 {
                    self.announce(id, ctx, out);
                }
            }
        }
    }

    fn receive_bid(&mut self, id: AgentId, from: AgentId, bid: Bid) {
        match self.auction.as_mut() {
            Some(record) if bid.bidder == from => {
                if let Err(err) = record.record_bid(bid) {
                    trace!(agent = %id, %from, %err, "bid rejected");
                }
            }
            _ => trace!(agent = %id, %from, "bid without an open auction"),
        }
    }

    fn bid_on_nearest_slot(
        &self,
        id: AgentId,
        pose: &Pose,
        offers: &[(AgentId, PushAnnouncement)],
        ctx: &TickContext<'_>,
        out: &mut Outbox,
    ) {
        let here = ctx.position_of(id).unwrap_or(pose.position);
        let nearest = offers
            .iter()
            .filter_map(|(announcer, ann)| {
                let origin = ctx.position_of(*announcer)?;
                if origin.distance(here) > ctx.auction.sensor_range {
                    return None;
                }
                Some((*announcer, ann.slot_position(origin).distance(here)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((announcer, distance)) = nearest else {
            return;
        };
        let bid = Bid::new(ctx.auction.cost(distance), id);
        out.send(id, announcer, Message::Bid(bid));
        out.record(FormationEvent::BidPlaced {
            kind: AuctionKind::Push,
            bidder: id,
            auction: announcer,
            cost: bid.cost,
            tick: ctx.tick,
        });
    }

    fn announce(&mut self, id: AgentId, ctx: &TickContext<'_>, out: &mut Outbox) {
        let version = ctx.formation_version;
        self.auction = Some(AuctionRecord::open_insertion(id, version, ctx.tick, ctx.auction.round_ticks));
        out.broadcast(id, Message::InsertionAnnouncement(InsertionAnnouncement { announcer: id }));
        out.record(FormationEvent::AuctionOpened {
            kind: AuctionKind::Insertion,
            announcer: id,
            version,
            tick: ctx.tick,
        });
        debug!(agent = %id, version, "insertion auction opened");
    }
}

/// An agent that is part of the chain.
#[derive(Debug, Clone)]
pub struct ChainCell {
    state: AgentState,
    auction: Option<AuctionRecord>,
    outstanding: OutstandingBid,
}

impl ChainCell {
    pub fn new(state: AgentState) -> Self {
        Self {
            state,
            auction: None,
            outstanding: OutstandingBid::default(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.state.id()
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AgentState {
        &mut self.state
    }

    pub fn auction(&self) -> Option<&AuctionRecord> {
        self.auction.as_ref()
    }

    /// The insertion auction this cell currently has a bid in.
    pub fn outstanding_bid(&self) -> Option<AgentId> {
        self.outstanding.auction()
    }

    /// Forget an outstanding bid on `auction` once that auction has closed.
    pub fn release_bid(&mut self, auction: AgentId) -> bool {
        self.outstanding.clear_for(auction)
    }

    /// Bid `cost` in the insertion auction run by `announcer`.
    ///
    /// A cell holds at most one outstanding bid; a second one is rejected
    /// and nothing is sent.
    pub fn offer_bid(
        &mut self,
        announcer: AgentId,
        cost: f64,
        tick: u64,
        out: &mut Outbox,
    ) -> chainform_auction::Result<Bid> {
        let bidder = self.id();
        self.outstanding.commit(bidder, announcer)?;
        let bid = Bid::new(cost, bidder);
        out.send(bidder, announcer, Message::Bid(bid));
        out.record(FormationEvent::BidPlaced {
            kind: AuctionKind::Insertion,
            bidder,
            auction: announcer,
            cost,
            tick,
        });
        Ok(bid)
    }

    fn update(&mut self, pose: &mut Pose, inbox: Vec<Packet>, ctx: &TickContext<'_>, out: &mut Outbox) {
        let id = self.id();
        let mut announcers = Vec::new();
        for packet in inbox {
            self.handle(packet, &mut announcers, out);
        }

        let neighbors: Vec<AgentId> = self.state.ledger().ids().collect();
        for neighbor in neighbors {
            if let Some(position) = ctx.position_of(neighbor) {
                self.state.sense(neighbor, pose.relative(position));
            }
        }

        self.state.relax();

        let command = if self.state.is_frozen() || !self.state.is_anchored() {
            VelocityCommand::STOP
        } else {
            ctx.actuator
                .compute_movement(self.state.trans_error(), self.state.rot_error())
        };
        let here = ctx.position_of(id).unwrap_or(pose.position);
        pose.apply(command);
        self.state.turned(command.angular);

        if self.state.is_settled(ctx.auction.error_threshold) {
            match ctx.recruitment {
                RecruitmentMode::Push => self.maybe_announce(pose, ctx, out),
                RecruitmentMode::Insertion => self.bid_on_nearest(here, &announcers, ctx, out),
            }
        }

        let snapshot = self.state.snapshot(pose.heading);
        for neighbor in self.state.ledger().ids() {
            out.send(id, neighbor, Message::State(snapshot.clone()));
        }
    }

    fn handle(&mut self, packet: Packet, announcers: &mut Vec<AgentId>, out: &mut Outbox) {
        let id = self.id();
        let from = packet.from;
        match packet.message {
            Message::State(snapshot) if snapshot.id == from => {
                self.state.observe(snapshot);
            }
            Message::ChangeFormation(descriptor) => {
                if from != AgentId::OPERATOR {
                    trace!(agent = %id, %from, "formation change from non-operator rejected");
                } else if !descriptor.is_seed(id) {
                    trace!(agent = %id, "formation change addressed to another seed");
                } else if let Err(err) = self.state.adopt_formation(descriptor, None) {
                    trace!(agent = %id, %err, "formation change not adopted");
                }
            }
            Message::InsertionAnnouncement(ann) if ann.announcer == from => announcers.push(from),
            Message::Bid(bid) => self.receive_bid(from, bid),
            Message::Bump { version } => self.receive_bump(from, version, out),
            Message::LinkAdded { neighbor, side } if from == AgentId::OPERATOR => {
                trace!(agent = %id, %neighbor, %side, "link added");
            }
            Message::LinkDropped { neighbor } if from == AgentId::OPERATOR => {
                self.state.forget(neighbor);
            }
            other => trace!(agent = %id, %from, kind = %other.kind(), "cell ignoring"),
        }
    }

    fn receive_bid(&mut self, from: AgentId, bid: Bid) {
        let id = self.id();
        match self.auction.as_mut() {
            Some(record) if record.kind == AuctionKind::Push && bid.bidder == from => {
                if let Err(err) = record.record_bid(bid) {
                    trace!(agent = %id, %from, %err, "bid rejected");
                }
            }
            _ => trace!(agent = %id, %from, "bid without an open auction"),
        }
    }

    /// Freeze until `version` arrives, then pass the hold further from `from`.
    fn receive_bump(&mut self, from: AgentId, version: u64, out: &mut Outbox) {
        let id = self.id();
        if from != AgentId::OPERATOR && !self.state.ledger().contains(from) {
            trace!(agent = %id, %from, "bump from non-neighbor");
            return;
        }
        if version <= self.state.version() {
            return;
        }
        self.state.hold_until(version);
        if let Some(next) = self.state.ledger().other_than(from) {
            out.send(id, next, Message::Bump { version });
        }
    }

    fn maybe_announce(&mut self, pose: &Pose, ctx: &TickContext<'_>, out: &mut Outbox) {
        if self.auction.is_some() || ctx.free_agents == 0 {
            return;
        }
        let Some(side) = self.state.ledger().free_side() else {
            return;
        };
        let id = self.id();
        let version = ctx.formation_version;
        self.auction = Some(AuctionRecord::open_push(id, side, version, ctx.tick, ctx.auction.round_ticks));
        let announcement = PushAnnouncement::new(self.state.snapshot(pose.heading), side);
        out.broadcast(id, Message::PushAnnouncement(announcement));
        out.record(FormationEvent::AuctionOpened {
            kind: AuctionKind::Push,
            announcer: id,
            version,
            tick: ctx.tick,
        });
        debug!(agent = %id, %side, version, "push auction opened");
    }

    fn bid_on_nearest(&mut self, here: DVec2, announcers: &[AgentId], ctx: &TickContext<'_>, out: &mut Outbox) {
        if self.outstanding.is_set() {
            return;
        }
        let nearest = announcers
            .iter()
            .filter_map(|&a| ctx.position_of(a).map(|p| (a, p.distance(here))))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((announcer, distance)) = nearest {
            if let Err(err) = self.offer_bid(announcer, ctx.auction.cost(distance), ctx.tick, out) {
                trace!(agent = %self.id(), %err, "insertion bid not placed");
            }
        }
    }
}

/// Which pool an agent belongs to.
#[derive(Debug, Clone)]
pub enum Role {
    Free(FreeAgent),
    Attached(ChainCell),
}

/// One simulated body.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    pose: Pose,
    role: Role,
    inbox: Vec<Packet>,
    converged_at: Option<u64>,
}

impl Agent {
    /// A free agent that may first announce at `ready_at`.
    pub fn free(id: AgentId, pose: Pose, ready_at: u64) -> Self {
        Self {
            id,
            pose,
            role: Role::Free(FreeAgent::new(ready_at)),
            inbox: Vec::new(),
            converged_at: None,
        }
    }

    /// A chain cell with `state`.
    pub fn attached(id: AgentId, pose: Pose, state: AgentState) -> Self {
        Self {
            id,
            pose,
            role: Role::Attached(ChainCell::new(state)),
            inbox: Vec::new(),
            converged_at: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn position(&self) -> DVec2 {
        self.pose.position
    }

    pub fn heading(&self) -> f64 {
        self.pose.heading
    }

    pub fn odometer(&self) -> f64 {
        self.pose.odometer
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_free(&self) -> bool {
        matches!(self.role, Role::Free(_))
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.role, Role::Attached(_))
    }

    pub fn cell(&self) -> Option<&ChainCell> {
        match &self.role {
            Role::Attached(cell) => Some(cell),
            Role::Free(_) => None,
        }
    }

    pub fn cell_mut(&mut self) -> Option<&mut ChainCell> {
        match &mut self.role {
            Role::Attached(cell) => Some(cell),
            Role::Free(_) => None,
        }
    }

    pub fn free_agent(&self) -> Option<&FreeAgent> {
        match &self.role {
            Role::Free(free) => Some(free),
            Role::Attached(_) => None,
        }
    }

    pub fn free_agent_mut(&mut self) -> Option<&mut FreeAgent> {
        match &mut self.role {
            Role::Free(free) => Some(free),
            Role::Attached(_) => None,
        }
    }

    /// Formation state, for chain cells.
    pub fn state(&self) -> Option<&AgentState> {
        self.cell().map(ChainCell::state)
    }

    pub fn state_mut(&mut self) -> Option<&mut AgentState> {
        self.cell_mut().map(ChainCell::state_mut)
    }

    /// Magnitude of the translational error. Zero for free agents.
    pub fn error_magnitude(&self) -> f64 {
        self.state().map_or(0.0, |s| s.trans_error().length())
    }

    /// Tick at which the cell last became settled, if it still is.
    pub fn converged_at(&self) -> Option<u64> {
        self.converged_at
    }

    /// The auction this agent is running, if any.
    pub fn auction(&self) -> Option<&AuctionRecord> {
        match &self.role {
            Role::Free(free) => free.auction.as_ref(),
            Role::Attached(cell) => cell.auction.as_ref(),
        }
    }

    /// Remove and return this agent's auction if its deadline has passed.
    pub fn take_due_auction(&mut self, tick: u64) -> Option<AuctionRecord> {
        let slot = match &mut self.role {
            Role::Free(free) => &mut free.auction,
            Role::Attached(cell) => &mut cell.auction,
        };
        if slot.as_ref().is_some_and(|record| record.is_due(tick)) {
            slot.take()
        } else {
            None
        }
    }

    /// Queue a packet for the next update.
    pub fn receive(&mut self, packet: Packet) {
        self.inbox.push(packet);
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    /// Run one tick: drain the inbox, then act.
    pub fn update(&mut self, ctx: &TickContext<'_>, out: &mut Outbox) {
        let inbox = std::mem::take(&mut self.inbox);
        match &mut self.role {
            Role::Attached(cell) => {
                cell.update(&mut self.pose, inbox, ctx, out);
                if cell.state.is_settled(ctx.auction.error_threshold) {
                    self.converged_at.get_or_insert(ctx.tick);
                } else {
                    self.converged_at = None;
                }
            }
            Role::Free(free) => free.update(self.id, &self.pose, inbox, ctx, out),
        }
    }
}
