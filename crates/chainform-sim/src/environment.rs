//! The environment: population arena, router and tick scheduler.
//!
//! # Tick order
//!
//! 1. Deliver packets forwarded last tick.
//! 2. Update chain cells in ascending id order, then free agents in spawn
//!    order. Every agent senses the poses from the start of the tick.
//! 3. Forward what the agents sent.
//! 4. Settle auctions whose deadline has passed.
//! 5. Check for quiescence.
//!
//! Settlement is the only place the topology changes, so no update ever
//! observes a half-spliced chain.

use std::collections::BTreeMap;

use chainform_auction::{
    plan_insertion, plan_push, AuctionKind, AuctionRecord, ExpiryReason, NeighborView, Outcome, Placement, SiteView,
};
use chainform_formation::{AgentState, DVec2, FormationDescriptor, FormationError, QuiescenceTracker, Relationship};
use chainform_topology::{
    attach, check_simple_path, describe_topology, splice_between, walk, AgentId, IdAllocator, LedgerStore,
    Side, TopologyLedger,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, trace, warn};

use crate::router::{Audience, Directory, RouteStats, Router};
use crate::{
    Actuator, Agent, AgentReport, DifferentialDrive, Error, FormationEvent, Message, Outbox, Packet, Pose, Result,
    RunReport, RunStats, RunStatus, SimulationConfig, TickContext, TickStats,
};

impl Directory for BTreeMap<AgentId, Agent> {
    fn contains(&self, id: AgentId) -> bool {
        self.contains_key(&id)
    }

    fn members(&self, audience: Audience) -> Vec<AgentId> {
        self.values()
            .filter(|agent| audience.includes(agent.is_attached()))
            .map(Agent::id)
            .collect()
    }
}

/// Owns every agent and drives the simulation one tick at a time.
pub struct Environment {
    config: SimulationConfig,
    formation: FormationDescriptor,
    ids: IdAllocator,
    agents: BTreeMap<AgentId, Agent>,
    router: Router,
    actuator: Box<dyn Actuator>,
    rng: StdRng,
    quiescence: QuiescenceTracker,
    tick: u64,
    status: RunStatus,
    settled_this_tick: bool,
    routed: RouteStats,
    events: Vec<FormationEvent>,
    stats: RunStats,
}

impl Environment {
    /// An empty arena. Spawn free agents, then call [`Environment::form_up`].
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if !(config.agent_radius.is_finite() && config.agent_radius > 0.0) {
            return Err(FormationError::InvalidRadius(config.agent_radius).into());
        }
        let formation = config.formation.descriptor(AgentId(0))?;
        Ok(Self {
            formation,
            ids: IdAllocator::new(),
            agents: BTreeMap::new(),
            router: Router::new(),
            actuator: Box::new(DifferentialDrive::for_radius(config.agent_radius)),
            rng: StdRng::seed_from_u64(config.seed),
            quiescence: QuiescenceTracker::new(config.quiescence_window),
            tick: 0,
            status: RunStatus::Running,
            settled_this_tick: false,
            routed: RouteStats::default(),
            events: Vec::new(),
            stats: RunStats::default(),
            config,
        })
    }

    /// Replace the default differential drive.
    #[must_use]
    pub fn with_actuator(mut self, actuator: impl Actuator + 'static) -> Self {
        self.actuator = Box::new(actuator);
        self
    }

    /// Add a free agent at `position`, facing `heading` degrees.
    pub fn spawn_free_agent(&mut self, position: DVec2, heading: f64) -> AgentId {
        let id = self.ids.next_free();
        let ready_at = self.tick + self.config.auction.readiness_ticks;
        self.agents.insert(id, Agent::free(id, Pose::new(position, heading), ready_at));
        self.events.push(FormationEvent::AgentSpawned {
            agent: id,
            position,
            tick: self.tick,
        });
        trace!(agent = %id, ?position, heading, "spawned free agent");
        id
    }

    /// Scatter the configured number of free agents at random.
    pub fn populate(&mut self) -> Vec<AgentId> {
        let extent = self.config.spawn_extent.abs();
        (0..self.config.free_agents)
            .map(|_| {
                let position = if extent > 0.0 {
                    DVec2::new(self.rng.gen_range(-extent..extent), self.rng.gen_range(-extent..extent))
                } else {
                    DVec2::ZERO
                };
                let heading = self.rng.gen_range(-180.0..180.0);
                self.spawn_free_agent(position, heading)
            })
            .collect()
    }

    /// Promote the free agent nearest `point` to seed and hand it the formation.
    pub fn form_up(&mut self, point: DVec2) -> Result<AgentId> {
        if let Some(&existing) = self.attached_ids().first() {
            return Err(Error::AlreadyFormed(existing));
        }
        let nearest = self
            .free_ids()
            .into_iter()
            .filter_map(|id| self.agents.get(&id).map(|a| (id, a.position().distance(point))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
            .ok_or(Error::NoFreeAgents)?;

        let former = self.agents.remove(&nearest).ok_or(Error::UnknownAgent(nearest))?;
        let seed = self.ids.next_chain();
        self.formation = self.formation.clone().with_seed(seed);
        self.agents.insert(
            seed,
            Agent::attached(seed, former.pose(), AgentState::new(seed, self.formation.clone())),
        );

        let handoff = Packet::new(AgentId::OPERATOR, seed, Message::ChangeFormation(self.formation.clone()));
        let routed = self.router.forward(vec![handoff], &self.agents);
        self.routed.merge(routed);

        self.events.push(FormationEvent::SeedElected { agent: seed, tick: self.tick });
        info!(agent = %seed, from = %nearest, "seed elected");
        Ok(seed)
    }

    /// Replace the formation. Only the operator may do this.
    ///
    /// The descriptor's seed must already be in the chain. Its version is
    /// forced past the current one, and it reaches the seed next tick.
    pub fn change_formation(&mut self, sender: AgentId, descriptor: FormationDescriptor) -> Result<u64> {
        if sender != AgentId::OPERATOR {
            return Err(Error::Unauthorized { sender });
        }
        let seed = descriptor.seed_id();
        if !self.agents.get(&seed).is_some_and(Agent::is_attached) {
            return Err(Error::NotAttached(seed));
        }

        let version = self.formation.version() + 1;
        self.formation = descriptor.with_version(version);
        let packet = Packet::new(AgentId::OPERATOR, seed, Message::ChangeFormation(self.formation.clone()));
        let routed = self.router.forward(vec![packet], &self.agents);
        self.routed.merge(routed);

        self.events.push(FormationEvent::FormationChanged {
            seed,
            version,
            tick: self.tick,
        });
        debug!(%seed, version, "formation changed");
        Ok(version)
    }

    /// Advance one tick. Returns `Ok(false)` once the run has stopped.
    ///
    /// A topology fault is returned as an error, after which every further
    /// call returns `Ok(false)`.
    pub fn step(&mut self) -> Result<bool> {
        if !self.status.is_running() {
            return Ok(false);
        }
        self.tick += 1;
        let tick = self.tick;
        self.settled_this_tick = false;

        let agents = &mut self.agents;
        let delivery_drops = self.router.deliver(|packet| match agents.get_mut(&packet.to) {
            Some(agent) => {
                agent.receive(packet);
                None
            }
            None => Some(packet),
        });

        let positions: BTreeMap<AgentId, Pose> = self.agents.iter().map(|(id, a)| (*id, a.pose())).collect();
        let order = self.update_order();
        let mut outbox = Outbox::default();
        {
            let ctx = TickContext {
                tick,
                positions: &positions,
                auction: &self.config.auction,
                recruitment: self.config.recruitment,
                actuator: self.actuator.as_ref(),
                formation_version: self.formation.version(),
                free_agents: self.free_count(),
                chain_length: self.chain_length(),
            };
            for id in &order {
                if let Some(agent) = self.agents.get_mut(id) {
                    agent.update(&ctx, &mut outbox);
                }
            }
        }

        let (packets, events) = outbox.into_parts();
        self.events.extend(events);
        let routed = self.router.forward(packets, &self.agents);
        self.routed.merge(routed);

        if let Err(err) = self.settle_due() {
            self.status = RunStatus::Aborted;
            self.events.push(FormationEvent::Fault {
                description: err.to_string(),
                tick,
            });
            return Err(err);
        }

        let calm = self.is_calm();
        self.stats.record(TickStats {
            tick,
            aggregate_error: self.aggregate_error(),
            messages_forwarded: self.routed.forwarded,
            packets_dropped: self.routed.dropped + delivery_drops,
            chain_length: self.chain_length(),
            free_agents: self.free_count(),
        });
        self.routed = RouteStats::default();

        if self.quiescence.observe(calm) {
            self.status = RunStatus::Quiescent;
            self.events.push(FormationEvent::Quiescent { tick });
            info!(tick, chain = self.chain_length(), "quiescent");
            return Ok(false);
        }
        if self.config.max_ticks.is_some_and(|max| tick >= max) {
            self.status = RunStatus::TickCapReached;
            self.events.push(FormationEvent::TickCapReached { tick });
            warn!(tick, chain = self.chain_length(), "tick cap reached before quiescence");
            return Ok(false);
        }
        Ok(true)
    }

    /// Step until the run stops.
    pub fn run(&mut self) -> Result<RunReport> {
        while self.step()? {}
        Ok(self.report())
    }

    /// Promote `winner` into the slot on `side` of `announcer`.
    ///
    /// Falls back to the announcer's other side if `side` has been taken
    /// since the auction opened.
    pub fn settle_push_auction(&mut self, announcer: AgentId, side: Side, winner: AgentId) -> Result<AgentId> {
        self.require_free(winner)?;
        let ledger = self
            .ledger(announcer)
            .ok_or(Error::NotAttached(announcer))?;
        let placement = plan_push(announcer, side, ledger).ok_or(Error::NoOpenSide(announcer))?;
        self.recruit(AuctionKind::Push, announcer, winner, placement)
    }

    /// Promote the free `announcer` next to the cell that won its auction.
    pub fn settle_insertion_auction(&mut self, announcer: AgentId, winner: AgentId) -> Result<AgentId> {
        self.require_free(announcer)?;
        let site = self.site_view(winner)?;
        let placement = plan_insertion(&site);
        self.recruit(AuctionKind::Insertion, announcer, announcer, placement)
    }

    fn require_free(&self, id: AgentId) -> Result<()> {
        match self.agents.get(&id) {
            Some(agent) if agent.is_free() => Ok(()),
            Some(_) => Err(Error::NotFree(id)),
            None => Err(Error::UnknownAgent(id)),
        }
    }

    fn site_view(&self, winner: AgentId) -> Result<SiteView> {
        self.agents
            .get(&winner)
            .and_then(Agent::state)
            .ok_or(Error::NotAttached(winner))?;
        let seed = self.formation.seed_id();

        let mut site = SiteView {
            winner,
            is_seed: self.formation.is_seed(winner),
            left: None,
            right: None,
        };
        let mut arms = Vec::with_capacity(2);
        for side in Side::ALL {
            arms.push((side, walk(self, winner, side)?));
        }
        // Zero when the winner is the seed
        let winner_to_seed = arms
            .iter()
            .find_map(|(_, arm)| arm.iter().position(|&id| id == seed))
            .map_or(0, |at| at + 1);

        for (side, arm) in arms {
            let Some(&id) = arm.first() else {
                continue;
            };
            let view = NeighborView {
                id,
                hops: arm.len(),
                seed_hops: arm
                    .iter()
                    .position(|&a| a == seed)
                    .unwrap_or(winner_to_seed + 1),
            };
            match side {
                Side::Left => site.left = Some(view),
                Side::Right => site.right = Some(view),
            }
        }
        Ok(site)
    }

    /// Turn free agent `recruit` into a new cell and carry out `placement`.
    fn recruit(&mut self, kind: AuctionKind, announcer: AgentId, recruit: AgentId, placement: Placement) -> Result<AgentId> {
        let former = self.agents.remove(&recruit).ok_or(Error::UnknownAgent(recruit))?;
        let cell = self.ids.next_chain();
        self.agents.insert(
            cell,
            Agent::attached(cell, former.pose(), AgentState::new(cell, self.formation.clone())),
        );

        let version = self.formation.version() + 1;
        let notices = match self.place(cell, placement, version) {
            Ok(notices) => notices,
            Err(err) => {
                self.agents.remove(&cell);
                self.agents.insert(recruit, former);
                return Err(err);
            }
        };

        if let Err(fault) = check_simple_path(self) {
            error!(
                tick = self.tick,
                %fault,
                topology = %describe_topology(self),
                "chain is no longer a simple path"
            );
            return Err(fault.into());
        }

        self.formation = self.formation.clone().with_version(version);
        let seed = self.formation.seed_id();
        let mut packets = vec![Packet::new(
            AgentId::OPERATOR,
            seed,
            Message::ChangeFormation(self.formation.clone()),
        )];
        packets.extend(notices);
        let routed = self.router.forward(packets, &self.agents);
        self.routed.merge(routed);

        self.settled_this_tick = true;
        self.events.push(FormationEvent::AuctionSettled {
            kind,
            announcer,
            recruit,
            cell,
            placement,
            version,
            tick: self.tick,
        });
        debug!(%kind, %announcer, %recruit, %cell, ?placement, version, "auction settled");
        Ok(cell)
    }

    /// Edit the ledgers and build the notices the affected agents need.
    fn place(&mut self, cell: AgentId, placement: Placement, version: u64) -> Result<Vec<Packet>> {
        let link_added = |to: AgentId, neighbor: AgentId, side: Side| {
            Packet::new(AgentId::OPERATOR, to, Message::LinkAdded { neighbor, side })
        };
        let link_dropped =
            |to: AgentId, neighbor: AgentId| Packet::new(AgentId::OPERATOR, to, Message::LinkDropped { neighbor });

        match placement {
            Placement::Attach { anchor, side } => {
                attach(self, anchor, side, cell)?;
                Ok(vec![
                    link_added(anchor, cell, side),
                    link_added(cell, anchor, side.opposite()),
                ])
            }
            Placement::Splice { a, b } => {
                let side = splice_between(self, a, b, cell)?;
                Ok(vec![
                    link_dropped(a, b),
                    link_added(a, cell, side),
                    link_dropped(b, a),
                    link_added(b, cell, side.opposite()),
                    link_added(cell, a, side.opposite()),
                    link_added(cell, b, side),
                    // b's whole arm waits for the new version before moving again
                    Packet::new(cell, b, Message::Bump { version }),
                ])
            }
        }
    }

    /// Close every auction whose deadline has passed. Only fatal errors escape.
    fn settle_due(&mut self) -> Result<()> {
        let tick = self.tick;
        for id in self.update_order() {
            let Some(record) = self.agents.get_mut(&id).and_then(|a| a.take_due_auction(tick)) else {
                continue;
            };
            self.settle(record)?;
        }
        Ok(())
    }

    fn settle(&mut self, record: AuctionRecord) -> Result<()> {
        let tick = self.tick;
        let kind = record.kind;
        let announcer = record.announcer;

        let current_version = self.formation.version();
        let outcome = {
            let agents = &self.agents;
            let valid = |bidder: AgentId| {
                agents.get(&bidder).is_some_and(|a| match kind {
                    AuctionKind::Push => a.is_free(),
                    AuctionKind::Insertion => a.is_attached(),
                })
            };
            record.close(self.config.auction.policy, &mut self.rng, current_version, valid)
        };

        for agent in self.agents.values_mut() {
            if let Some(cell) = agent.cell_mut() {
                cell.release_bid(announcer);
            }
        }

        let expired = match outcome {
            Outcome::Winner(bid) => {
                let placed = match kind {
                    AuctionKind::Push => {
                        let side = record.side.unwrap_or(Side::Right);
                        self.settle_push_auction(announcer, side, bid.bidder)
                    }
                    AuctionKind::Insertion => self.settle_insertion_auction(announcer, bid.bidder),
                };
                match placed {
                    Ok(_) => None,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        debug!(%kind, %announcer, %err, "settlement discarded");
                        Some(ExpiryReason::NoRoom)
                    }
                }
            }
            Outcome::Expired(reason) => Some(reason),
        };

        if let Some(reason) = expired {
            trace!(%kind, %announcer, ?reason, "auction expired");
            self.events.push(FormationEvent::AuctionExpired {
                kind,
                announcer,
                reason,
                tick,
            });
        }

        let rest = tick + self.config.auction.readiness_ticks;
        if let Some(free) = self.agents.get_mut(&announcer).and_then(Agent::free_agent_mut) {
            free.rest_until(rest);
        }
        Ok(())
    }

    /// No settlement this tick, no auction holding bids, and every cell settled.
    fn is_calm(&self) -> bool {
        let threshold = self.config.auction.error_threshold;
        !self.settled_this_tick
            && self.agents.values().all(|agent| {
                let busy = agent.auction().is_some_and(AuctionRecord::has_bids);
                let settled = agent.state().map_or(true, |s| s.is_settled(threshold));
                !busy && settled
            })
    }

    fn aggregate_error(&self) -> f64 {
        self.agents.values().filter_map(Agent::state).map(|s| s.trans_error().length()).sum()
    }

    /// Chain cells by ascending id, then free agents in spawn order.
    fn update_order(&self) -> Vec<AgentId> {
        let mut order = self.attached_ids();
        order.extend(self.free_ids());
        order
    }

    fn attached_ids(&self) -> Vec<AgentId> {
        self.agents.range(AgentId(0)..).map(|(id, _)| *id).collect()
    }

    /// Free ids count down from the first one issued, so spawn order is descending id order.
    fn free_ids(&self) -> Vec<AgentId> {
        self.agents
            .range(..=AgentId(AgentId::FIRST_FREE))
            .rev()
            .map(|(id, _)| *id)
            .collect()
    }

    /// Chain cells, by ascending id.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.values().filter(|a| a.is_attached())
    }

    /// Free agents, in spawn order.
    pub fn free_agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.values().rev().filter(|a| a.is_free())
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn position(&self, id: AgentId) -> Option<DVec2> {
        self.agents.get(&id).map(Agent::position)
    }

    pub fn error_magnitude(&self, id: AgentId) -> Option<f64> {
        self.agents.get(&id).map(Agent::error_magnitude)
    }

    pub fn odometer(&self, id: AgentId) -> Option<f64> {
        self.agents.get(&id).map(Agent::odometer)
    }

    /// Tick at which a cell settled, or `None` if it hasn't (yet).
    pub fn convergence_tick(&self, id: AgentId) -> Option<u64> {
        self.agents.get(&id).and_then(Agent::converged_at)
    }

    /// The seed, once one has been elected.
    pub fn seed(&self) -> Option<AgentId> {
        let seed = self.formation.seed_id();
        self.agents.get(&seed).filter(|a| a.is_attached()).map(Agent::id)
    }

    pub fn chain_length(&self) -> usize {
        self.agents.range(AgentId(0)..).count()
    }

    pub fn free_count(&self) -> usize {
        self.agents.len() - self.chain_length()
    }

    /// The most recently published formation.
    pub fn formation(&self) -> &FormationDescriptor {
        &self.formation
    }

    pub fn version(&self) -> u64 {
        self.formation.version()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn events(&self) -> &[FormationEvent] {
        &self.events
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Human-readable dump of every ledger.
    pub fn describe_topology(&self) -> String {
        describe_topology(self)
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> RunReport {
        let agents: Vec<AgentReport> = self
            .agents()
            .chain(self.free_agents())
            .map(|a| AgentReport {
                id: a.id(),
                attached: a.is_attached(),
                position: a.position(),
                heading: a.heading(),
                distance_travelled: a.odometer(),
                error: a.error_magnitude(),
                converged_at: a.converged_at(),
            })
            .collect();

        RunReport {
            status: self.status,
            ticks: self.tick,
            version: self.formation.version(),
            chain_length: self.chain_length(),
            free_agents: self.free_count(),
            messages_forwarded: self.stats.total_messages(),
            packets_dropped: self.stats.total_dropped(),
            agents,
        }
    }
}

impl LedgerStore for Environment {
    type Data = Relationship;

    fn ledger(&self, id: AgentId) -> Option<&TopologyLedger<Relationship>> {
        self.agents.get(&id).and_then(Agent::state).map(AgentState::ledger)
    }

    fn ledger_mut(&mut self, id: AgentId) -> Option<&mut TopologyLedger<Relationship>> {
        self.agents
            .get_mut(&id)
            .and_then(Agent::state_mut)
            .map(AgentState::ledger_mut)
    }

    fn ledger_ids(&self) -> Vec<AgentId> {
        self.attached_ids()
    }

    fn population(&self) -> usize {
        self.chain_length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainform_auction::Bid;

    fn env() -> Environment {
        Environment::new(SimulationConfig::default().with_free_agents(0)).unwrap()
    }

    #[test]
    fn update_order_is_chain_then_spawn_order() {
        let mut env = env();
        let a = env.spawn_free_agent(DVec2::ZERO, 0.0);
        let b = env.spawn_free_agent(DVec2::new(1.0, 0.0), 0.0);
        let c = env.spawn_free_agent(DVec2::new(2.0, 0.0), 0.0);
        env.form_up(DVec2::new(1.0, 0.0)).unwrap();

        assert_eq!(env.update_order(), vec![AgentId(0), a, c]);
        assert!(env.agent(b).is_none());
        assert_eq!(env.free_agents().map(Agent::id).collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn form_up_twice_is_rejected() {
        let mut env = env();
        env.spawn_free_agent(DVec2::ZERO, 0.0);
        env.spawn_free_agent(DVec2::ONE, 0.0);
        let seed = env.form_up(DVec2::ZERO).unwrap();
        assert!(matches!(env.form_up(DVec2::ZERO), Err(Error::AlreadyFormed(s)) if s == seed));
    }

    #[test]
    fn form_up_without_free_agents_fails() {
        assert!(matches!(env().form_up(DVec2::ZERO), Err(Error::NoFreeAgents)));
    }

    #[test]
    fn populate_is_reproducible() {
        let config = SimulationConfig::default().with_free_agents(5).with_seed(9);
        let mut a = Environment::new(config.clone()).unwrap();
        let mut b = Environment::new(config).unwrap();
        a.populate();
        b.populate();
        let pa: Vec<_> = a.free_agents().map(Agent::position).collect();
        let pb: Vec<_> = b.free_agents().map(Agent::position).collect();
        assert_eq!(pa.len(), 5);
        assert_eq!(pa, pb);
    }

    #[test]
    fn rejects_bad_agent_radius() {
        assert!(Environment::new(SimulationConfig::default().with_agent_radius(0.0)).is_err());
    }

    #[test]
    fn push_settlement_fails_without_room() {
        let mut env = env();
        for x in 0..4 {
            env.spawn_free_agent(DVec2::new(x as f64, 0.0), 90.0);
        }
        let seed = env.form_up(DVec2::ZERO).unwrap();
        let free: Vec<AgentId> = env.free_agents().map(Agent::id).collect();
        env.settle_push_auction(seed, Side::Right, free[0]).unwrap();
        env.settle_push_auction(seed, Side::Right, free[1]).unwrap();

        let err = env.settle_push_auction(seed, Side::Right, free[2]).unwrap_err();
        assert!(matches!(err, Error::NoOpenSide(id) if id == seed));
        assert!(!err.is_fatal());
        assert_eq!(env.chain_length(), 3);
        assert!(env.agent(free[2]).is_some_and(Agent::is_free));
    }

    #[test]
    fn second_push_in_a_tick_goes_stale() {
        let mut env = env();
        for x in 0..4 {
            env.spawn_free_agent(DVec2::new(0.1 * x as f64, 0.0), 0.0);
        }
        let seed = env.form_up(DVec2::ZERO).unwrap();
        let free: Vec<AgentId> = env.free_agents().map(Agent::id).collect();
        let end = env.settle_push_auction(seed, Side::Right, free[0]).unwrap();

        // Both ends open under the same published version and close together
        let version = env.version();
        let mut left = AuctionRecord::open_push(seed, Side::Left, version, 0, 3);
        left.record_bid(Bid::new(0.1, free[1])).unwrap();
        let mut right = AuctionRecord::open_push(end, Side::Right, version, 0, 3);
        right.record_bid(Bid::new(0.1, free[2])).unwrap();
        env.settle(left).unwrap();
        env.settle(right).unwrap();

        assert_eq!(env.chain_length(), 3);
        assert_eq!(env.version(), version + 1);
        assert!(matches!(
            env.events().last(),
            Some(FormationEvent::AuctionExpired { announcer, reason: ExpiryReason::Stale, .. }) if *announcer == end
        ));
        assert!(env.agent(free[2]).is_some_and(Agent::is_free));
        check_simple_path(&env).unwrap();
    }
}
