//! Query handlers for the bulletin board.
//!
//! These functions provide read-only access to published data.

use crate::state::{BidRecord, LedgerState};
use auction_types::{Address, AuctionPhase, Digest};
use serde::{Deserialize, Serialize};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum LedgerQuery {
    /// Get the current phase.
    GetPhase,

    /// Get the auctioneer address.
    GetAuctioneer,

    /// Get a specific bid.
    GetBid { bidder: Address },

    /// Get all bids in placement order.
    ListBids,

    /// Get the announced winning commitment.
    GetWinningCommitment,

    /// Get the winner's identity token.
    GetIdentityToken,

    /// Get a deposit balance.
    GetEscrow { address: Address },

    /// Check whether a bidder was punished.
    IsPunished { address: Address },
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerQueryResponse {
    Phase(AuctionPhase),
    Auctioneer(Option<Address>),
    Bid(Option<BidRecord>),
    Bids(Vec<BidRecord>),
    WinningCommitment(Option<Digest>),
    IdentityToken(Option<Vec<u8>>),
    Escrow(u64),
    Punished(bool),
}

/// Handle a query.
pub fn handle_query(state: &LedgerState, query: LedgerQuery) -> LedgerQueryResponse {
    match query {
        LedgerQuery::GetPhase => LedgerQueryResponse::Phase(state.phase),

        LedgerQuery::GetAuctioneer => LedgerQueryResponse::Auctioneer(state.auctioneer),

        LedgerQuery::GetBid { bidder } => {
            LedgerQueryResponse::Bid(state.get_bid(&bidder).cloned())
        }

        LedgerQuery::ListBids => LedgerQueryResponse::Bids(
            state.ordered_bids().into_iter().cloned().collect(),
        ),

        LedgerQuery::GetWinningCommitment => {
            LedgerQueryResponse::WinningCommitment(state.winning_commitment)
        }

        LedgerQuery::GetIdentityToken => {
            LedgerQueryResponse::IdentityToken(state.identity_token.clone())
        }

        LedgerQuery::GetEscrow { address } => {
            LedgerQueryResponse::Escrow(state.get_escrow(&address))
        }

        LedgerQuery::IsPunished { address } => {
            LedgerQueryResponse::Punished(state.punished.contains(&address))
        }
    }
}

/// Bids whose opening token has not been published yet.
pub fn get_unopened_bids(state: &LedgerState) -> Vec<Address> {
    state
        .ordered_bids()
        .into_iter()
        .filter(|record| record.opening_token.is_none())
        .map(|record| record.bidder)
        .collect()
}
