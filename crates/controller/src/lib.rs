//! Protocol controller for anonymous sealed-bid auctions.
//!
//! Drives one round end to end: generates the participants from a roster,
//! publishes every step on a [`Ledger`], feeds what the ledger published to
//! the auctioneer, and punishes every rejected party.

pub mod config;
pub mod error;
pub mod ledger;
pub mod roster;
pub mod round;

pub use config::RoundConfig;
pub use error::RoundError;
pub use ledger::{Ledger, LocalLedger};
pub use roster::{random_roster, JsonRoster, Roster, RosterFile};
pub use round::{AuctionRound, RoundOutcome, Seat, WinnerInfo};
