//! Chainform Auctions
//!
//! Announce, bid, settle: how free agents get recruited into the chain.
//!
//! # Push auctions
//!
//! An attached agent with a free side, an error under threshold and no open
//! auction announces its open slot to every free agent. Free agents within
//! sensor range bid their distance to the exact slot position. After a fixed
//! number of ticks the lowest bid wins and is attached on that side.
//!
//! # Insertion auctions
//!
//! A free agent whose readiness timer has elapsed announces itself to every
//! attached agent. Settled attached agents bid their distance to it, holding
//! at most one outstanding bid at a time. The winner decides *where* the new
//! agent is spliced; see [`plan_insertion`].
//!
//! # Staleness
//!
//! Every record remembers the formation version it was opened under. A
//! settlement under a newer version is discarded, so at most one splice lands
//! per version.

mod announcement;
mod bid;
mod config;
mod error;
mod placement;
mod record;

pub use announcement::{InsertionAnnouncement, PushAnnouncement};
pub use bid::{Bid, BidBook, OutstandingBid, SettlementPolicy};
pub use config::AuctionConfig;
pub use error::{AuctionError, Result};
pub use placement::{plan_insertion, plan_push, NeighborView, Placement, SiteView};
pub use record::{AuctionKind, AuctionRecord, ExpiryReason, Outcome};
