//! Per-agent formation state and the neighbor-relative relaxation step.

use std::collections::BTreeMap;

use chainform_topology::{AgentId, Side, TopologyLedger};
use glam::DVec2;
use tracing::{debug, trace};

use crate::geometry::{angle_deg, rotate_deg, wrap_degrees};
use crate::{FormationDescriptor, FormationError, Result};

/// Below this fraction of the spacing, the bearings two neighbors sense of
/// each other are too noisy to recover their relative heading from.
const NEAR_BEARING_FRACTION: f64 = 1.0 / 3.0;

/// What an agent tracks about one neighbor link.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Relationship {
    /// Where the neighbor should be, in the formation's heading frame.
    /// `None` until assigned for the current formation version.
    pub desired: Option<DVec2>,
    /// Where the neighbor was last sensed, in the agent's own frame.
    pub actual: DVec2,
}

/// A relationship flattened with its neighbor id, as carried in gossip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationshipEntry {
    pub neighbor: AgentId,
    pub desired: Option<DVec2>,
    pub actual: DVec2,
}

/// The state an agent gossips to its direct neighbors each tick.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub id: AgentId,
    pub descriptor: FormationDescriptor,
    pub gradient: DVec2,
    pub trans_error: DVec2,
    pub rot_error: f64,
    pub step: u64,
    /// Sender's physical heading in degrees.
    pub heading: f64,
    /// Whether the sender's errors are trustworthy as a reference.
    pub anchored: bool,
    pub relationships: Vec<RelationshipEntry>,
}

impl StateSnapshot {
    /// The sender's relationship with `id`, if they are linked.
    pub fn relationship_to(&self, id: AgentId) -> Option<&RelationshipEntry> {
        self.relationships.iter().find(|r| r.neighbor == id)
    }

    pub fn version(&self) -> u64 {
        self.descriptor.version()
    }
}

/// What a relaxation step did, for logging and events.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Relaxation {
    /// Version adopted from a neighbor during this step.
    pub adopted: Option<u64>,
    /// Neighbor the error was derived from.
    pub reference: Option<AgentId>,
}

/// Formation state owned by one attached agent.
///
/// Mutated only by its owner: gossip from neighbors is cached with
/// [`AgentState::observe`] and folded in by [`AgentState::relax`].
#[derive(Debug, Clone)]
pub struct AgentState {
    id: AgentId,
    descriptor: FormationDescriptor,
    gradient: DVec2,
    ledger: TopologyLedger<Relationship>,
    neighbors: BTreeMap<AgentId, StateSnapshot>,
    trans_error: DVec2,
    rot_error: f64,
    step: u64,
    reference: Option<AgentId>,
    /// Last heading relative to a reference neighbor, in degrees.
    relative_heading: Option<(AgentId, f64)>,
    hold_until: Option<u64>,
}

impl AgentState {
    /// Fresh state for an agent joining under `descriptor`.
    pub fn new(id: AgentId, descriptor: FormationDescriptor) -> Self {
        let gradient = if descriptor.is_seed(id) {
            descriptor.seed_gradient()
        } else {
            DVec2::ZERO
        };
        Self {
            id,
            descriptor,
            gradient,
            ledger: TopologyLedger::new(),
            neighbors: BTreeMap::new(),
            trans_error: DVec2::ZERO,
            rot_error: 0.0,
            step: 0,
            reference: None,
            relative_heading: None,
            hold_until: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn descriptor(&self) -> &FormationDescriptor {
        &self.descriptor
    }

    pub fn version(&self) -> u64 {
        self.descriptor.version()
    }

    pub fn gradient(&self) -> DVec2 {
        self.gradient
    }

    pub fn trans_error(&self) -> DVec2 {
        self.trans_error
    }

    pub fn rot_error(&self) -> f64 {
        self.rot_error
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn reference(&self) -> Option<AgentId> {
        self.reference
    }

    pub fn ledger(&self) -> &TopologyLedger<Relationship> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut TopologyLedger<Relationship> {
        &mut self.ledger
    }

    /// Last gossip received from a neighbor.
    pub fn neighbor_state(&self, id: AgentId) -> Option<&StateSnapshot> {
        self.neighbors.get(&id)
    }

    pub fn is_seed(&self) -> bool {
        self.descriptor.is_seed(self.id)
    }

    /// Waiting for a formation version announced by a bump.
    pub fn is_frozen(&self) -> bool {
        self.hold_until.is_some_and(|v| self.version() < v)
    }

    /// Whether this agent's errors can serve as a neighbor's reference.
    pub fn is_anchored(&self) -> bool {
        self.is_seed() || (self.reference.is_some() && !self.is_frozen())
    }

    /// Anchored and within `threshold` of its slot.
    pub fn is_settled(&self, threshold: f64) -> bool {
        self.is_seed() || (self.is_anchored() && self.trans_error.length() < threshold)
    }

    /// Adopt `descriptor`, deriving the gradient from neighbor `via` unless this agent is the seed.
    ///
    /// Resets both errors and recomputes the desired offset for every linked
    /// side. Fails without changing anything when the neighbor's gossip
    /// doesn't yet say where this agent belongs.
    pub fn adopt_formation(&mut self, descriptor: FormationDescriptor, via: Option<AgentId>) -> Result<()> {
        let gradient = if descriptor.is_seed(self.id) {
            descriptor.seed_gradient()
        } else {
            let via = via.ok_or(FormationError::NoReference { agent: self.id })?;
            let snapshot = self
                .neighbors
                .get(&via)
                .ok_or(FormationError::NoReference { agent: self.id })?;
            let desired = snapshot
                .relationship_to(self.id)
                .and_then(|rel| rel.desired)
                .ok_or(FormationError::MissingDesired { agent: self.id, neighbor: via })?;
            snapshot.gradient + rotate_deg(desired, descriptor.heading())
        };

        debug!(agent = %self.id, version = descriptor.version(), ?via, "adopting formation");
        self.descriptor = descriptor;
        self.gradient = gradient;
        self.trans_error = DVec2::ZERO;
        self.rot_error = 0.0;
        self.reference = None;
        if !self.is_frozen() {
            self.hold_until = None;
        }
        self.assign_desired();
        Ok(())
    }

    fn assign_desired(&mut self) {
        let rels = self.descriptor.relationships_at(self.gradient);
        for (side, link) in self.ledger.iter_mut() {
            link.data.desired = Some(rels[side.index()]);
        }
    }

    /// Cache gossip from a linked neighbor. Gossip from anyone else is ignored.
    pub fn observe(&mut self, snapshot: StateSnapshot) -> bool {
        if !self.ledger.contains(snapshot.id) {
            trace!(agent = %self.id, from = %snapshot.id, "ignoring state from non-neighbor");
            return false;
        }
        self.neighbors.insert(snapshot.id, snapshot);
        true
    }

    /// Drop cached gossip for a neighbor that is no longer linked.
    pub fn forget(&mut self, id: AgentId) {
        self.neighbors.remove(&id);
        if self.reference == Some(id) {
            self.reference = None;
        }
        if self.relative_heading.is_some_and(|(reference, _)| reference == id) {
            self.relative_heading = None;
        }
    }

    /// Record where a neighbor was sensed, in this agent's frame.
    pub fn sense(&mut self, neighbor: AgentId, actual: DVec2) {
        if let Some(rel) = self.ledger.data_for_mut(neighbor) {
            rel.actual = actual;
        }
    }

    /// Account for this agent having turned `degrees` since it last relaxed.
    pub fn turned(&mut self, degrees: f64) {
        if let Some((_, heading)) = self.relative_heading.as_mut() {
            *heading = wrap_degrees(*heading + degrees);
        }
    }

    /// Hold still until `version` arrives.
    pub fn hold_until(&mut self, version: u64) {
        if version > self.version() {
            self.hold_until = Some(self.hold_until.map_or(version, |v| v.max(version)));
        }
    }

    /// One relaxation step from cached neighbor gossip.
    ///
    /// Catches up to the newest version a neighbor advertises, then derives
    /// the error from the reference neighbor (or pins it to zero for the
    /// seed), then advances the step counter.
    pub fn relax(&mut self) -> Relaxation {
        self.neighbors.retain(|id, _| self.ledger.contains(*id));
        let mut outcome = Relaxation::default();

        let newest = self
            .neighbors
            .values()
            .filter(|s| s.version() > self.version())
            .max_by_key(|s| s.version())
            .map(|s| (s.id, s.descriptor.clone()));
        if let Some((via, descriptor)) = newest {
            let version = descriptor.version();
            match self.adopt_formation(descriptor, Some(via)) {
                Ok(()) => outcome.adopted = Some(version),
                Err(err) => trace!(agent = %self.id, %err, "formation catch-up deferred"),
            }
        }

        if self.is_seed() {
            self.gradient = self.descriptor.seed_gradient();
            self.trans_error = DVec2::ZERO;
            self.rot_error = 0.0;
            self.reference = None;
        } else {
            self.reference = self.reference_neighbor();
            if let Some(reference) = self.reference {
                if !self.derive_error(reference) {
                    self.reference = None;
                }
            }
            outcome.reference = self.reference;
        }

        let max_neighbor_step = self.neighbors.values().map(|s| s.step).max().unwrap_or(0);
        self.step = (self.step + 1).max(max_neighbor_step);
        outcome
    }

    /// The anchored, same-version neighbor whose gradient is nearest the seed gradient.
    pub fn reference_neighbor(&self) -> Option<AgentId> {
        let seed_gradient = self.descriptor.seed_gradient();
        self.ledger
            .ids()
            .filter_map(|id| self.neighbors.get(&id))
            .filter(|s| s.anchored && s.version() == self.version())
            .min_by(|a, b| {
                a.gradient
                    .distance(seed_gradient)
                    .total_cmp(&b.gradient.distance(seed_gradient))
            })
            .map(|s| s.id)
    }

    fn derive_error(&mut self, reference: AgentId) -> bool {
        let Some(snapshot) = self.neighbors.get(&reference) else {
            return false;
        };
        let Some(to_me) = snapshot.relationship_to(self.id) else {
            return false;
        };
        let Some(desired) = to_me.desired else {
            return false;
        };
        let Some(mine) = self.ledger.data_for(reference) else {
            return false;
        };

        // Neighbors passing close to each other keep the last relative heading
        let near = self.descriptor.radius() * NEAR_BEARING_FRACTION;
        let held = self
            .relative_heading
            .filter(|(id, _)| *id == reference)
            .map(|(_, heading)| heading);
        let theta = match held {
            Some(heading) if to_me.actual.length() < near || mine.actual.length() < near => heading,
            _ => wrap_degrees(angle_deg(to_me.actual) - angle_deg(-mine.actual)),
        };
        self.relative_heading = Some((reference, theta));

        let desired = rotate_deg(desired, -snapshot.rot_error);
        self.rot_error = wrap_degrees(theta + snapshot.rot_error);
        self.trans_error = rotate_deg(desired - to_me.actual + snapshot.trans_error, -theta);
        true
    }

    /// Relationship entries for every linked side, left first.
    pub fn relationships(&self) -> Vec<RelationshipEntry> {
        self.ledger
            .iter()
            .map(|(_, link)| RelationshipEntry {
                neighbor: link.id,
                desired: link.data.desired,
                actual: link.data.actual,
            })
            .collect()
    }

    /// Desired offset toward a side, if assigned.
    pub fn desired(&self, side: Side) -> Option<DVec2> {
        self.ledger.get(side).and_then(|link| link.data.desired)
    }

    /// The gossip payload for this tick.
    pub fn snapshot(&self, heading: f64) -> StateSnapshot {
        StateSnapshot {
            id: self.id,
            descriptor: self.descriptor.clone(),
            gradient: self.gradient,
            trans_error: self.trans_error,
            rot_error: self.rot_error,
            step: self.step,
            heading,
            anchored: self.is_anchored(),
            relationships: self.relationships(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ShapePreset, DEFAULT_SPACING};

    const SEED: AgentId = AgentId(0);
    const NEXT: AgentId = AgentId(1);

    fn descriptor() -> FormationDescriptor {
        FormationDescriptor::new(ShapePreset::Line, DEFAULT_SPACING, SEED).unwrap()
    }

    /// Seed and one neighbor on its right, both with headings equal to the formation heading.
    fn pair() -> (AgentState, AgentState) {
        let mut seed = AgentState::new(SEED, descriptor());
        let mut next = AgentState::new(NEXT, descriptor());
        seed.ledger_mut().add(SEED, Side::Right, NEXT, Relationship::default()).unwrap();
        next.ledger_mut().add(NEXT, Side::Left, SEED, Relationship::default()).unwrap();
        seed.adopt_formation(descriptor().with_version(1), None).unwrap();
        (seed, next)
    }

    #[test]
    fn seed_pins_itself() {
        let (mut seed, _) = pair();
        seed.relax();
        assert_eq!(seed.trans_error(), DVec2::ZERO);
        assert_eq!(seed.gradient(), seed.descriptor().seed_gradient());
        assert!(seed.is_settled(0.02));
    }

    #[test]
    fn neighbor_adopts_through_seed() {
        let (seed, mut next) = pair();
        assert!(next.observe(seed.snapshot(90.0)));

        let outcome = next.relax();
        assert_eq!(outcome.adopted, Some(1));
        assert_eq!(next.version(), 1);
        assert!((next.gradient() - DVec2::new(DEFAULT_SPACING, 0.0)).length() < 1e-6);
        assert!(next.desired(Side::Left).is_some());
    }

    #[test]
    fn error_is_zero_when_in_place() {
        let (mut seed, mut next) = pair();
        // Both face 90 degrees; next sits 0.09 to the seed's east.
        // In a 90-degree frame, east is -y.
        let east = DVec2::new(0.0, -DEFAULT_SPACING);
        seed.sense(NEXT, east);
        next.sense(SEED, -east);

        next.observe(seed.snapshot(90.0));
        next.relax();
        // A second round uses the seed's sensed offset to compute the error
        next.observe(seed.snapshot(90.0));
        let outcome = next.relax();

        assert_eq!(outcome.reference, Some(SEED));
        assert!(next.trans_error().length() < 1e-6, "{:?}", next.trans_error());
        assert!(next.rot_error().abs() < 1e-6);
        assert!(next.is_settled(0.02));
    }

    #[test]
    fn error_points_toward_slot() {
        let (mut seed, mut next) = pair();
        // next is 0.05 short of its slot along the formation axis
        let sensed = DVec2::new(0.0, -(DEFAULT_SPACING - 0.05));
        seed.sense(NEXT, sensed);
        next.sense(SEED, -sensed);

        next.observe(seed.snapshot(90.0));
        next.relax();
        next.observe(seed.snapshot(90.0));
        next.relax();

        assert!((next.trans_error() - DVec2::new(0.0, -0.05)).length() < 1e-6);
        assert!(!next.is_settled(0.02));
    }

    /// `next` in place east of the seed, errors relaxed to zero.
    fn settled_pair() -> (AgentState, AgentState) {
        let (mut seed, mut next) = pair();
        let east = DVec2::new(0.0, -DEFAULT_SPACING);
        seed.sense(NEXT, east);
        next.sense(SEED, -east);
        for _ in 0..2 {
            next.observe(seed.snapshot(90.0));
            next.relax();
        }
        (seed, next)
    }

    #[test]
    fn close_bearings_keep_the_last_heading() {
        let (mut seed, mut next) = settled_pair();
        // Bearings this close disagree by 90 degrees
        seed.sense(NEXT, DVec2::new(0.0, -0.005));
        next.sense(SEED, DVec2::new(0.005, 0.0));
        next.observe(seed.snapshot(90.0));
        next.relax();

        assert!(next.rot_error().abs() < 1e-6, "{}", next.rot_error());
        assert!((next.trans_error() - DVec2::new(0.0, -0.085)).length() < 1e-6);
    }

    #[test]
    fn turning_carries_the_held_heading() {
        let (mut seed, mut next) = settled_pair();
        next.turned(10.0);
        seed.sense(NEXT, DVec2::new(0.0, -0.005));
        next.sense(SEED, DVec2::new(0.0, 0.005));
        next.observe(seed.snapshot(90.0));
        next.relax();

        assert!((next.rot_error() - 10.0).abs() < 1e-6, "{}", next.rot_error());
    }

    #[test]
    fn forgetting_the_reference_drops_the_heading() {
        let (_, mut next) = settled_pair();
        next.forget(SEED);
        next.turned(10.0);
        assert_eq!(next.relative_heading, None);
    }

    #[test]
    fn ignores_gossip_from_strangers() {
        let (seed, _) = pair();
        let mut stranger = AgentState::new(AgentId(7), descriptor());
        assert!(!stranger.observe(seed.snapshot(90.0)));
        assert!(stranger.neighbor_state(SEED).is_none());
    }

    #[test]
    fn adoption_waits_for_desired_offset() {
        let seed = AgentState::new(SEED, descriptor().with_version(3));
        let mut next = AgentState::new(NEXT, descriptor());
        next.ledger_mut().add(NEXT, Side::Left, SEED, Relationship::default()).unwrap();
        // Seed hasn't linked next yet, so its gossip has no offset for it
        next.observe(seed.snapshot(90.0));

        let outcome = next.relax();
        assert_eq!(outcome.adopted, None);
        assert_eq!(next.version(), 0);
        assert_eq!(
            next.adopt_formation(descriptor().with_version(3), Some(SEED)),
            Err(FormationError::MissingDesired { agent: NEXT, neighbor: SEED })
        );
    }

    #[test]
    fn step_tracks_fastest_neighbor() {
        let (mut seed, mut next) = pair();
        for _ in 0..5 {
            seed.relax();
        }
        next.observe(seed.snapshot(90.0));
        next.relax();
        assert_eq!(next.step(), 5);
        next.relax();
        assert_eq!(next.step(), 6);
    }

    #[test]
    fn hold_freezes_until_version_arrives() {
        let (mut seed, mut next) = pair();
        seed.sense(NEXT, DVec2::new(0.0, -DEFAULT_SPACING));
        next.sense(SEED, DVec2::new(0.0, DEFAULT_SPACING));
        next.observe(seed.snapshot(90.0));
        next.relax();
        next.observe(seed.snapshot(90.0));
        next.relax();
        assert!(next.is_anchored());

        next.hold_until(2);
        assert!(next.is_frozen());
        assert!(!next.is_anchored());
        assert!(!next.is_settled(0.02));

        seed.adopt_formation(descriptor().with_version(2), None).unwrap();
        next.observe(seed.snapshot(90.0));
        next.relax();
        assert!(!next.is_frozen());
    }
}
