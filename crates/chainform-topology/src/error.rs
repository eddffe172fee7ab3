//! Error types for chainform-topology.

use thiserror::Error;

use crate::{AgentId, Side};

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// A consistency fault: the chain is no longer a simple path.
///
/// Gradient propagation is undefined on anything but a path, so callers treat
/// every fault as unrecoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyFault {
    /// An agent would need a third neighbor.
    #[error("agent {agent} would exceed two neighbors")]
    DegreeOverflow { agent: AgentId },

    /// Following links from an agent revisits an agent before reaching an end.
    #[error("cycle detected through agent {agent}")]
    Cycle { agent: AgentId },

    /// Two ledgers disagree about a link.
    #[error("agent {agent} lists {neighbor} but the link is not mirrored")]
    Asymmetric { agent: AgentId, neighbor: AgentId },

    /// A ledger references an agent that does not exist.
    #[error("agent {agent} links to missing agent {neighbor}")]
    Dangling { agent: AgentId, neighbor: AgentId },
}

/// Errors raised by ledger edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The requested side already holds a neighbor.
    #[error("agent {agent} already has a neighbor on its {side} side")]
    SideOccupied { agent: AgentId, side: Side },

    /// The two agents are already neighbors.
    #[error("agents {agent} and {neighbor} are already linked")]
    AlreadyLinked { agent: AgentId, neighbor: AgentId },

    /// A splice was requested between agents that are not neighbors.
    #[error("agents {a} and {b} are not linked")]
    NotLinked { a: AgentId, b: AgentId },

    /// The agent to insert still has links of its own.
    #[error("agent {0} must be unlinked before it can join the chain")]
    NotIsolated(AgentId),

    /// No ledger exists for this agent.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// Sentinel IDs never appear in a ledger.
    #[error("{0} is a reserved id")]
    ReservedId(AgentId),

    /// The edit would break the simple-path invariant.
    #[error(transparent)]
    Fault(#[from] TopologyFault),
}
