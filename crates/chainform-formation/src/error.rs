//! Error types for chainform-formation.

use chainform_topology::AgentId;
use thiserror::Error;

/// Result type for formation operations.
pub type Result<T> = std::result::Result<T, FormationError>;

/// Errors that can occur while building or adopting a formation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormationError {
    /// Spacing radius must be positive and finite.
    #[error("invalid spacing radius {0}")]
    InvalidRadius(f64),

    /// Heading must be finite.
    #[error("invalid heading {0}")]
    InvalidHeading(f64),

    /// No preset matches the given name or index.
    #[error("unknown shape '{0}'")]
    UnknownShape(String),

    /// A non-seed agent tried to adopt a formation without a neighbor to derive its gradient from.
    #[error("agent {agent} has no neighbor state to adopt the formation through")]
    NoReference { agent: AgentId },

    /// The neighbor's gossip doesn't yet carry a desired offset for this agent.
    #[error("neighbor {neighbor} has no desired offset for agent {agent}")]
    MissingDesired { agent: AgentId, neighbor: AgentId },
}
