//! Chainform Formation
//!
//! The shared target-shape description and the per-agent state that relaxes
//! toward it using only neighbor gossip.
//!
//! # Formation Descriptor
//!
//! A [`FormationDescriptor`] names a shape function `y = f(x)`, a spacing
//! radius, a heading and the seed agent. Each agent places its neighbors
//! where a circle of the spacing radius, centred on its own gradient,
//! crosses the curve. There is no closed form for arbitrary shapes, so the
//! crossings come from a secant search that returns its best estimate rather
//! than failing.
//!
//! # Gradient Relaxation
//!
//! The seed is the fixed frame: zero error, gradient pinned to the
//! descriptor's constant. Every other agent picks a *reference neighbor*, the
//! anchored neighbor whose gradient lies closest to the seed's, and derives
//! its own error from that neighbor's error plus the local mismatch between
//! desired and sensed offsets. Errors therefore accumulate hop by hop from
//! the seed outward.
//!
//! # Versions
//!
//! Descriptors carry a version that grows with every topology change.
//! Agents adopt a newer version as soon as a neighbor gossips it, which
//! recomputes their desired offsets; nothing else triggers the root search.

mod descriptor;
mod error;
pub mod geometry;
mod quiescence;
mod shape;
mod state;

pub use descriptor::{
    FormationDescriptor, RootEstimate, DEFAULT_HEADING, DEFAULT_SPACING, ROOT_MAX_ITERATIONS, ROOT_TOLERANCE,
};
pub use error::{FormationError, Result};
pub use glam::DVec2;
pub use quiescence::QuiescenceTracker;
pub use shape::{ShapeFunction, ShapePreset};
pub use state::{AgentState, Relaxation, Relationship, RelationshipEntry, StateSnapshot};
