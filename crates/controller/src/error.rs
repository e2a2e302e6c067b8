//! Controller error types.

use auction_auctioneer::AuctioneerError;
use auction_client::BidError;
use auction_crypto::CryptoError;
use auction_module::{GenesisValidationError, LedgerError};
use thiserror::Error;

/// Errors that abort an auction round.
#[derive(Debug, Error)]
pub enum RoundError {
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Ledger refused call: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Roster could not be loaded: {0:#}")]
    Roster(anyhow::Error),

    #[error("Roster is empty")]
    EmptyRoster,

    #[error("Invalid round configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Genesis(#[from] GenesisValidationError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Bid(#[from] BidError),

    #[error(transparent)]
    Auctioneer(#[from] AuctioneerError),
}
