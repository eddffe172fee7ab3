//! Error types for chainform-auction.

use chainform_topology::AgentId;
use thiserror::Error;

/// Result type for auction operations.
pub type Result<T> = std::result::Result<T, AuctionError>;

/// Errors that can occur while bidding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuctionError {
    /// The bidder already has a bid in this auction.
    #[error("agent {bidder} already bid in this auction")]
    DuplicateBid { bidder: AgentId },

    /// The bidder still has an unresolved bid elsewhere.
    #[error("agent {bidder} already has an outstanding bid on {auction}")]
    OutstandingBid { bidder: AgentId, auction: AgentId },

    /// Costs must be finite and non-negative.
    #[error("invalid bid cost {0}")]
    InvalidCost(f64),
}
