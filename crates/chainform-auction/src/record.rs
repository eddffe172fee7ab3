//! Open auctions and how they close.

use std::fmt;

use chainform_topology::{AgentId, Side};
use rand::Rng;
use tracing::trace;

use crate::{Bid, BidBook, Result, SettlementPolicy};

/// Which variant an auction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AuctionKind {
    Push,
    Insertion,
}

impl fmt::Display for AuctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuctionKind::Push => write!(f, "push"),
            AuctionKind::Insertion => write!(f, "insertion"),
        }
    }
}

/// Why an auction closed without a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExpiryReason {
    /// Nobody bid.
    NoBids,
    /// Every bidder has since left the pool it bid from.
    NoValidBids,
    /// The formation changed since the auction opened.
    Stale,
    /// A winner was chosen but the announcer no longer had room for it.
    NoRoom,
}

/// Result of closing an auction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Winner(Bid),
    Expired(ExpiryReason),
}

/// One open auction, owned by its announcer.
///
/// The deadline is fixed at open time; the scheduler settles the record on
/// the first tick at or past it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionRecord {
    pub kind: AuctionKind,
    pub announcer: AgentId,
    /// Formation version published when the auction opened.
    pub version: u64,
    pub opened_at: u64,
    pub deadline: u64,
    /// Offered side, for push auctions.
    pub side: Option<Side>,
    bids: BidBook,
}

impl AuctionRecord {
    /// Open a push auction offering `side` of `announcer`.
    pub fn open_push(announcer: AgentId, side: Side, version: u64, tick: u64, round_ticks: u64) -> Self {
        Self {
            kind: AuctionKind::Push,
            announcer,
            version,
            opened_at: tick,
            deadline: tick + round_ticks,
            side: Some(side),
            bids: BidBook::new(),
        }
    }

    /// Open an insertion auction for the free agent `announcer`.
    pub fn open_insertion(announcer: AgentId, version: u64, tick: u64, round_ticks: u64) -> Self {
        Self {
            kind: AuctionKind::Insertion,
            announcer,
            version,
            opened_at: tick,
            deadline: tick + round_ticks,
            side: None,
            bids: BidBook::new(),
        }
    }

    /// True once `tick` has reached the deadline.
    pub fn is_due(&self, tick: u64) -> bool {
        tick >= self.deadline
    }

    pub fn bids(&self) -> &BidBook {
        &self.bids
    }

    pub fn has_bids(&self) -> bool {
        !self.bids.is_empty()
    }

    /// Add a received bid.
    pub fn record_bid(&mut self, bid: Bid) -> Result<()> {
        self.bids.submit(bid)
    }

    /// Decide the outcome under the current formation version.
    pub fn close<R, F>(&self, policy: SettlementPolicy, rng: &mut R, current_version: u64, valid: F) -> Outcome
    where
        R: Rng + ?Sized,
        F: Fn(AgentId) -> bool,
    {
        if self.version != current_version {
            trace!(announcer = %self.announcer, opened = self.version, current_version, "stale auction");
            return Outcome::Expired(ExpiryReason::Stale);
        }
        if self.bids.is_empty() {
            return Outcome::Expired(ExpiryReason::NoBids);
        }
        match self.bids.settle(policy, rng, valid) {
            Some(bid) => Outcome::Winner(bid),
            None => Outcome::Expired(ExpiryReason::NoValidBids),
        }
    }
}
