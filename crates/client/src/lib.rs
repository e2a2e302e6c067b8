//! Bidder side of anonymous sealed-bid auctions.
//!
//! This crate provides:
//! - Sealing a bid into a commitment, ring signatures and two encrypted tokens
//! - Releasing the opening token and, for the winner, the identity token

pub mod bid;
pub mod bidder;

pub use bid::{create_bid, BidError, SealedBid};
pub use bidder::Bidder;
