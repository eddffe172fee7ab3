//! Bids, the per-auction bid book and settlement policies.

use chainform_topology::AgentId;
use rand::Rng;

use crate::{AuctionError, Result};

/// One offer: lower cost is better.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bid {
    pub cost: f64,
    pub bidder: AgentId,
}

impl Bid {
    pub fn new(cost: f64, bidder: AgentId) -> Self {
        Self { cost, bidder }
    }
}

/// How an announcer picks a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SettlementPolicy {
    /// Lowest cost wins; ties go to the earliest bid.
    #[default]
    MinCost,
    /// Any received bid, chosen uniformly.
    UniformRandom,
}

impl SettlementPolicy {
    /// Pick a winner from `bids`. `None` only when `bids` is empty.
    pub fn select<R: Rng + ?Sized>(&self, bids: &[Bid], rng: &mut R) -> Option<Bid> {
        match self {
            SettlementPolicy::MinCost => bids
                .iter()
                .copied()
                .fold(None, |best: Option<Bid>, bid| match best {
                    Some(b) if b.cost <= bid.cost => Some(b),
                    _ => Some(bid),
                }),
            SettlementPolicy::UniformRandom => {
                if bids.is_empty() {
                    None
                } else {
                    Some(bids[rng.gen_range(0..bids.len())])
                }
            }
        }
    }
}

/// Bids received by one auction, in arrival order, at most one per bidder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BidBook {
    bids: Vec<Bid>,
}

impl BidBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a bid. A second bid from the same bidder is rejected and the first stands.
    pub fn submit(&mut self, bid: Bid) -> Result<()> {
        if !(bid.cost.is_finite() && bid.cost >= 0.0) {
            return Err(AuctionError::InvalidCost(bid.cost));
        }
        if self.bids.iter().any(|b| b.bidder == bid.bidder) {
            return Err(AuctionError::DuplicateBid { bidder: bid.bidder });
        }
        self.bids.push(bid);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    /// Settle among the bids whose bidder still passes `valid`.
    pub fn settle<R, F>(&self, policy: SettlementPolicy, rng: &mut R, valid: F) -> Option<Bid>
    where
        R: Rng + ?Sized,
        F: Fn(AgentId) -> bool,
    {
        let eligible: Vec<Bid> = self.bids.iter().copied().filter(|b| valid(b.bidder)).collect();
        policy.select(&eligible, rng)
    }
}

/// Tracks the single bid an insertion bidder may have in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutstandingBid {
    auction: Option<AgentId>,
}

impl OutstandingBid {
    /// Claim the slot for a bid on `auction`. Fails if a bid is already outstanding.
    pub fn commit(&mut self, bidder: AgentId, auction: AgentId) -> Result<()> {
        if let Some(existing) = self.auction {
            return Err(AuctionError::OutstandingBid { bidder, auction: existing });
        }
        self.auction = Some(auction);
        Ok(())
    }

    /// Release the slot if it was held for `auction`.
    pub fn clear_for(&mut self, auction: AgentId) -> bool {
        if self.auction == Some(auction) {
            self.auction = None;
            true
        } else {
            false
        }
    }

    /// The auction currently bid on.
    pub fn auction(&self) -> Option<AgentId> {
        self.auction
    }

    pub fn is_set(&self) -> bool {
        self.auction.is_some()
    }
}
