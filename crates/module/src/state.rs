//! Bulletin-board state.

use std::collections::{HashMap, HashSet};

use auction_types::{Address, AuctionPhase, Digest, PublishedBid};
use serde::{Deserialize, Serialize};

use crate::genesis::AuctionGenesisConfig;

/// One placed bid and its later opening token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    pub bidder: Address,
    pub bid: PublishedBid,
    pub opening_token: Option<Vec<u8>>,
}

/// State of one auction round.
///
/// A simplified in-memory representation of what a chain would keep in
/// storage maps.
#[derive(Debug)]
pub struct LedgerState {
    /// Round parameters
    pub config: AuctionGenesisConfig,

    /// Current phase
    pub phase: AuctionPhase,

    /// Address that started the round
    pub auctioneer: Option<Address>,

    /// Bidders in placement order
    pub bidders: Vec<Address>,

    /// Placed bids by bidder
    pub bids: HashMap<Address, BidRecord>,

    /// Announced tally result
    pub winning_commitment: Option<Digest>,

    /// Winner's identity token
    pub identity_token: Option<Vec<u8>>,

    /// Deposit balances
    pub escrow: HashMap<Address, u64>,

    /// Bidders whose deposit was forfeited
    pub punished: HashSet<Address>,
}

impl LedgerState {
    /// Create an empty round.
    pub fn new(config: AuctionGenesisConfig) -> Self {
        Self {
            config,
            phase: AuctionPhase::Created,
            auctioneer: None,
            bidders: Vec::new(),
            bids: HashMap::new(),
            winning_commitment: None,
            identity_token: None,
            escrow: HashMap::new(),
            punished: HashSet::new(),
        }
    }

    /// Whether `address` started the round.
    pub fn is_auctioneer(&self, address: &Address) -> bool {
        self.auctioneer.as_ref() == Some(address)
    }

    /// Get a placed bid.
    pub fn get_bid(&self, bidder: &Address) -> Option<&BidRecord> {
        self.bids.get(bidder)
    }

    /// All placed bids in placement order.
    pub fn ordered_bids(&self) -> Vec<&BidRecord> {
        self.bidders
            .iter()
            .filter_map(|bidder| self.bids.get(bidder))
            .collect()
    }

    /// Bidder whose published commitment equals `commitment`.
    pub fn bidder_of(&self, commitment: &Digest) -> Option<Address> {
        self.ordered_bids()
            .into_iter()
            .find(|record| &record.bid.commitment == commitment)
            .map(|record| record.bidder)
    }

    /// Get a deposit balance.
    pub fn get_escrow(&self, address: &Address) -> u64 {
        self.escrow.get(address).copied().unwrap_or(0)
    }

    /// Add to a deposit balance.
    pub fn add_escrow(&mut self, address: Address, amount: u64) {
        *self.escrow.entry(address).or_insert(0) += amount;
    }

    /// Take the whole balance of `address`.
    pub fn take_escrow(&mut self, address: &Address) -> u64 {
        self.escrow.remove(address).unwrap_or(0)
    }
}
