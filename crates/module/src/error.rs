//! Ledger error types.

use thiserror::Error;

use auction_types::AuctionPhase;

/// Errors that can occur when applying a ledger call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid phase. Expected: {expected:?}, Got: {got:?}")]
    InvalidPhase {
        expected: AuctionPhase,
        got: AuctionPhase,
    },

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Deposit mismatch: need {required}, got {got}")]
    DepositMismatch { required: u64, got: u64 },

    #[error("Already submitted bid")]
    AlreadyBid,

    #[error("Bidder limit of {max} reached")]
    TooManyBidders { max: u32 },

    #[error("No bid placed by this address")]
    BidNotFound,

    #[error("Bid already opened")]
    AlreadyOpened,

    #[error("Commitment does not belong to a placed bid")]
    UnknownCommitment,

    #[error("Sender does not hold the winning commitment")]
    NotWinner,

    #[error("Bidder already punished")]
    AlreadyPunished,

    #[error("Deposit was forfeited")]
    Punished,

    #[error("No deposit to withdraw")]
    NothingToWithdraw,

    #[error("Empty token")]
    EmptyToken,

    #[error("Undecodable call: {0}")]
    InvalidCall(String),
}
