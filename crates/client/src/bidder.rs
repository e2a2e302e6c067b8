//! Stateful bidder that seals one bid and releases its tokens on demand.

use rand::{CryptoRng, RngCore};
use tracing::info;

use auction_crypto::{CryptoError, Identity, Participant, PublicKey, Ring};
use auction_types::{Digest, PublishedBid};

use crate::bid::{create_bid, BidError, SealedBid};

/// One bidder in a round.
#[derive(Debug)]
pub struct Bidder {
    name: String,
    bid_value: u64,
    identity: Identity,
    auctioneer_key: PublicKey,
    sealed: Option<SealedBid>,
}

impl Bidder {
    pub fn new(
        name: impl Into<String>,
        bid_value: u64,
        identity: Identity,
        auctioneer_key: PublicKey,
    ) -> Self {
        Self {
            name: name.into(),
            bid_value,
            identity,
            auctioneer_key,
            sealed: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bid_value(&self) -> u64 {
        self.bid_value
    }

    pub fn auctioneer_key(&self) -> &PublicKey {
        &self.auctioneer_key
    }

    /// Fix the round's ring. Returns the bidder's ring position.
    pub fn assign_ring(&mut self, ring: Ring) -> Result<usize, CryptoError> {
        self.identity.assign_ring(ring)
    }

    /// Seal the bid and return the `(c, sig)` pair for the bulletin board.
    ///
    /// A bidder seals exactly once per round.
    pub fn bid<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<PublishedBid, BidError> {
        if self.sealed.is_some() {
            return Err(BidError::AlreadySealed);
        }
        let sealed = create_bid(&self.identity, &self.auctioneer_key, self.bid_value, rng)?;
        let published = sealed.published();
        info!(
            bidder = %self.name,
            commitment = %hex::encode(published.commitment),
            "Bid sealed"
        );
        self.sealed = Some(sealed);
        Ok(published)
    }

    pub fn sealed(&self) -> Option<&SealedBid> {
        self.sealed.as_ref()
    }

    /// The published pair of the sealed bid.
    pub fn published(&self) -> Result<PublishedBid, BidError> {
        Ok(self.sealed_bid()?.published())
    }

    /// `tau_1`, released during the opening phase.
    pub fn opening_token(&self) -> Result<Vec<u8>, BidError> {
        Ok(self.sealed_bid()?.opening_token())
    }

    /// `tau_2`, released only by the winner.
    pub fn identity_opening_token(&self) -> Result<Vec<u8>, BidError> {
        Ok(self.sealed_bid()?.identity_token())
    }

    /// Whether the announced winning commitment is this bidder's.
    pub fn is_winner(&self, winning_commitment: &Digest) -> bool {
        self.sealed
            .as_ref()
            .is_some_and(|sealed| &sealed.commitment() == winning_commitment)
    }

    fn sealed_bid(&self) -> Result<&SealedBid, BidError> {
        self.sealed.as_ref().ok_or(BidError::NotSealed)
    }
}

impl Participant for Bidder {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}
