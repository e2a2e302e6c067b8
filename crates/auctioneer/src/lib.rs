//! Auctioneer side of anonymous sealed-bid auctions.
//!
//! The auctioneer:
//! 1. Opens each published bid with its opening token and checks the whole
//!    chain of commitments and ring signatures
//! 2. Tallies accepted bids and announces the winning commitment
//! 3. Checks the winner's identity token against the winning commitment
//!
//! Every bundle ends as [`Verdict::Accepted`](auction_types::Verdict) or
//! `Rejected`; a rejected bundle never reaches the tally.

pub mod auctioneer;
pub mod error;
mod material;

pub use auctioneer::{Auctioneer, TallyEntry};
pub use error::AuctioneerError;
