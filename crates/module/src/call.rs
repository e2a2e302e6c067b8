//! Call message types for the bulletin board.

use auction_types::{Address, Digest};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Call messages accepted by the bulletin board.
///
/// The deposit travels as the value attached to the call, not inside it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum LedgerCall {
    // === Round lifecycle ===
    /// Open bidding. The first caller becomes the auctioneer.
    StartAuction,

    /// Publish the public half of a bid bundle.
    PlaceBid { commitment: Digest, sig: Vec<u8> },

    /// Publish the withheld opening token `tau_1`.
    OpenBid { opening_token: Vec<u8> },

    /// Publish the tally result (auctioneer only).
    AnnounceWinningCommitment { commitment: Digest },

    /// Publish the winner's identity token `tau_2`.
    OpenIdentity { identity_token: Vec<u8> },

    /// End the round (auctioneer only).
    CloseAuction,

    // === Deposits ===
    /// Forfeit a bidder's deposit to the auctioneer (auctioneer only).
    PunishBidder { bidder: Address },

    /// Return the sender's deposit.
    WithdrawDeposit,
}

impl LedgerCall {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCall::StartAuction => "startAuction",
            LedgerCall::PlaceBid { .. } => "placeBid",
            LedgerCall::OpenBid { .. } => "openBid",
            LedgerCall::AnnounceWinningCommitment { .. } => "announceWinningCommitment",
            LedgerCall::OpenIdentity { .. } => "openIdentity",
            LedgerCall::CloseAuction => "closeAuction",
            LedgerCall::PunishBidder { .. } => "punishBidder",
            LedgerCall::WithdrawDeposit => "withdrawDeposit",
        }
    }
}
