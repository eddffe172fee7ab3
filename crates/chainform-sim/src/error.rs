//! Error types for chainform-sim.

use chainform_auction::AuctionError;
use chainform_formation::FormationError;
use chainform_topology::{AgentId, TopologyError, TopologyFault};
use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the simulation.
#[derive(Debug, Error)]
pub enum Error {
    /// A topology edit was rejected.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// The chain stopped being a simple path. The run cannot continue.
    #[error("topology fault: {0}")]
    Fault(#[from] TopologyFault),

    /// The formation description was invalid.
    #[error("formation error: {0}")]
    Formation(#[from] FormationError),

    /// A bid was rejected.
    #[error("auction error: {0}")]
    Auction(#[from] AuctionError),

    /// Only the operator may change the formation.
    #[error("formation change from {sender} rejected: not the operator")]
    Unauthorized { sender: AgentId },

    /// No agent with this id exists.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// The agent exists but is not free.
    #[error("agent {0} is not free")]
    NotFree(AgentId),

    /// The agent exists but is not part of the chain.
    #[error("agent {0} is not attached")]
    NotAttached(AgentId),

    /// The announcer has no free side left for a push winner.
    #[error("agent {0} has no open side")]
    NoOpenSide(AgentId),

    /// There are no free agents to promote.
    #[error("no free agents")]
    NoFreeAgents,

    /// A seed has already been elected.
    #[error("formation already has seed {0}")]
    AlreadyFormed(AgentId),

    /// Configuration could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// True if the chain can no longer be trusted and the run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fault(_) | Error::Topology(TopologyError::Fault(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_faults_are_fatal() {
        let fault: Error = TopologyFault::Cycle { agent: AgentId(2) }.into();
        assert!(fault.is_fatal());

        let wrapped: Error = TopologyError::from(TopologyFault::DegreeOverflow { agent: AgentId(0) }).into();
        assert!(wrapped.is_fatal());

        assert!(!Error::NoOpenSide(AgentId(0)).is_fatal());
        assert!(!Error::Unauthorized { sender: AgentId(3) }.is_fatal());
    }
}
