//! Bid-opening, tally and identity-opening.

use std::collections::HashMap;

use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use auction_crypto::codec::{decode_bid_value, encode_bid_value};
use auction_crypto::commitment::verify as verify_commitment;
use auction_crypto::{decrypt, CryptoError, Identity, Participant, PublicKey, Ring};
use auction_types::{Address, BundleLayout, Digest, RejectReason, Verdict, NONCE_LEN};

use crate::error::AuctioneerError;
use crate::material::{split_token, IdentityMaterial, OpeningMaterial, SigParts};

/// An accepted, opened bid.
#[derive(Debug, Clone)]
pub struct TallyEntry {
    /// Publishing address of the bidder
    pub address: Address,
    /// Opened bid value
    pub bid: u64,
    /// Published commitment `c`
    pub commitment: Digest,
    /// Opening nonce `d` of `c`
    pub decommitment: [u8; NONCE_LEN],
    /// Ring the bid signatures were checked against
    pub ring: Ring,
}

impl TallyEntry {
    /// Whether `(bid, decommitment)` still opens `commitment`.
    pub fn is_consistent(&self) -> bool {
        verify_commitment(
            &encode_bid_value(self.bid),
            &self.decommitment,
            &self.commitment,
        )
    }
}

/// The auctioneer role.
///
/// Owns the tally exclusively. Bundles go in, verdicts come out.
#[derive(Debug)]
pub struct Auctioneer {
    identity: Identity,
    /// Accepted entries in first-seen order
    entries: Vec<TallyEntry>,
    /// Address -> position in `entries`
    index: HashMap<Address, usize>,
    winning_commitment: Option<Digest>,
    winning_identity: Option<PublicKey>,
}

impl Auctioneer {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            entries: Vec::new(),
            index: HashMap::new(),
            winning_commitment: None,
            winning_identity: None,
        }
    }

    /// Create an auctioneer with a fresh keypair.
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        bits: usize,
    ) -> Result<Self, AuctioneerError> {
        Ok(Self::new(Identity::generate(rng, bits)?))
    }

    /// Fix the round's ring on the auctioneer identity.
    pub fn assign_ring(&mut self, ring: Ring) -> Result<usize, CryptoError> {
        self.identity.assign_ring(ring)
    }

    /// Validate one published bundle against its opening token.
    ///
    /// Any failed check rejects the bundle and leaves the tally untouched.
    pub fn bid_opening(
        &mut self,
        address: Address,
        ring: &Ring,
        commitment: &Digest,
        sig: &[u8],
        opening_token: &[u8],
    ) -> Verdict {
        if self.index.contains_key(&address) {
            return self.reject(&address, RejectReason::DuplicateOpening);
        }
        if self.entries.iter().any(|entry| &entry.commitment == commitment) {
            return self.reject(&address, RejectReason::DuplicateCommitment);
        }

        match self.check_bid(ring, commitment, sig, opening_token) {
            Ok((bid, decommitment)) => {
                self.index.insert(address, self.entries.len());
                self.entries.push(TallyEntry {
                    address,
                    bid,
                    commitment: *commitment,
                    decommitment,
                    ring: ring.clone(),
                });
                info!(
                    address = %hex::encode(address),
                    commitment = %hex::encode(commitment),
                    "Bid opened"
                );
                Verdict::Accepted
            }
            Err(reason) => self.reject(&address, reason),
        }
    }

    fn check_bid(
        &self,
        ring: &Ring,
        commitment: &Digest,
        sig: &[u8],
        opening_token: &[u8],
    ) -> Result<(u64, [u8; NONCE_LEN]), RejectReason> {
        let layout = BundleLayout::new(ring.width(), ring.len());
        let parts = SigParts::parse(sig, &layout).map_err(malformed)?;

        if !Identity::verify(commitment, parts.sigma, ring).map_err(malformed)? {
            return Err(RejectReason::InvalidBidSignature);
        }

        let (cipher, nonce) = split_token(opening_token).map_err(malformed)?;
        if !verify_commitment(cipher, &nonce, &parts.c1) {
            return Err(RejectReason::TokenCommitmentMismatch);
        }

        let plain = decrypt(cipher, self.identity.keypair()).map_err(undecryptable)?;
        let material = OpeningMaterial::parse(&plain, &layout).map_err(malformed)?;
        if &material.commitment != commitment || material.sigma != parts.sigma {
            return Err(RejectReason::MaterialMismatch);
        }

        let anchored = [commitment.as_slice(), parts.sigma].concat();
        if !Identity::verify(&anchored, material.anchor, ring).map_err(malformed)? {
            return Err(RejectReason::InvalidAnchorSignature);
        }

        if !verify_commitment(material.bid, &material.decommitment, commitment) {
            return Err(RejectReason::BidCommitmentMismatch);
        }
        let bid = decode_bid_value(material.bid).map_err(malformed)?;

        Ok((bid, material.decommitment))
    }

    fn reject(&self, address: &Address, reason: RejectReason) -> Verdict {
        warn!(address = %hex::encode(address), %reason, "Bid rejected");
        Verdict::Rejected(reason)
    }

    /// Select and record the winning commitment.
    ///
    /// Entries whose bid no longer opens their commitment are skipped. The
    /// first-seen entry wins a tie. Once recorded, the same value is
    /// returned on every later call.
    pub fn get_winning_commitment(&mut self) -> Option<Digest> {
        if self.winning_commitment.is_some() {
            return self.winning_commitment;
        }

        let mut winner: Option<&TallyEntry> = None;
        for entry in &self.entries {
            if !entry.is_consistent() {
                warn!(
                    address = %hex::encode(entry.address),
                    "Discarding inconsistent tally entry"
                );
                continue;
            }
            if winner.map_or(true, |best| entry.bid > best.bid) {
                winner = Some(entry);
            }
        }

        let winning = winner.map(|entry| entry.commitment)?;
        info!(
            commitment = %hex::encode(winning),
            candidates = self.entries.len(),
            "Winning commitment determined"
        );
        self.winning_commitment = Some(winning);
        Some(winning)
    }

    /// Validate the winner's identity token.
    ///
    /// `sig` is the winner's published `sigma ‖ c1 ‖ c2`.
    pub fn identity_opening(
        &mut self,
        sig: &[u8],
        identity_token: &[u8],
    ) -> Result<Verdict, AuctioneerError> {
        let winning = self
            .winning_commitment
            .ok_or(AuctioneerError::WinnerNotDetermined)?;
        if self.winning_identity.is_some() {
            return Err(AuctioneerError::IdentityAlreadyOpened);
        }
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.commitment == winning)
            .ok_or(AuctioneerError::WinnerNotDetermined)?;

        match self.check_identity(&entry.ring, &winning, sig, identity_token) {
            Ok(bidder_key) => {
                info!(
                    commitment = %hex::encode(winning),
                    winner = %hex::encode(bidder_key.address()?),
                    "Winner identity opened"
                );
                self.winning_identity = Some(bidder_key);
                Ok(Verdict::Accepted)
            }
            Err(reason) => {
                warn!(commitment = %hex::encode(winning), %reason, "Identity opening rejected");
                Ok(Verdict::Rejected(reason))
            }
        }
    }

    fn check_identity(
        &self,
        ring: &Ring,
        winning: &Digest,
        sig: &[u8],
        identity_token: &[u8],
    ) -> Result<PublicKey, RejectReason> {
        let layout = BundleLayout::new(ring.width(), ring.len());
        let parts = SigParts::parse(sig, &layout).map_err(malformed)?;

        let (cipher, nonce) = split_token(identity_token).map_err(malformed)?;
        if !verify_commitment(cipher, &nonce, &parts.c2) {
            return Err(RejectReason::TokenCommitmentMismatch);
        }

        let plain = decrypt(cipher, self.identity.keypair()).map_err(undecryptable)?;
        let material = IdentityMaterial::parse(&plain, &layout).map_err(malformed)?;

        if &material.commitment != winning {
            return Err(RejectReason::NotWinningCommitment);
        }
        if material.sigma != parts.sigma {
            return Err(RejectReason::MaterialMismatch);
        }
        if &material.auctioneer_key != self.identity.public_key() {
            return Err(RejectReason::WrongVerifier);
        }
        if !ring.contains(&material.bidder_key) {
            return Err(RejectReason::NotRingMember);
        }

        let pair = Ring::new(vec![
            material.bidder_key.clone(),
            material.auctioneer_key.clone(),
        ])
        .map_err(malformed)?;
        let bound = [winning.as_slice(), material.sigma, material.anchor].concat();
        if !Identity::verify(&bound, material.delta, &pair).map_err(malformed)? {
            return Err(RejectReason::InvalidIdentitySignature);
        }

        debug!(ring_size = ring.len(), "Designated-verifier signature checked");
        Ok(material.bidder_key)
    }

    /// Drop the entry of a punished bidder.
    pub fn remove(&mut self, address: &Address) -> Option<TallyEntry> {
        let position = self.index.remove(address)?;
        let entry = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        debug!(address = %hex::encode(address), "Tally entry removed");
        Some(entry)
    }

    /// Accepted entries in first-seen order.
    pub fn entries(&self) -> &[TallyEntry] {
        &self.entries
    }

    pub fn entry(&self, address: &Address) -> Option<&TallyEntry> {
        self.index.get(address).map(|position| &self.entries[*position])
    }

    pub fn winning_commitment(&self) -> Option<Digest> {
        self.winning_commitment
    }

    /// Entry holding the winning commitment, bid value included.
    pub fn winning_bid(&self) -> Option<&TallyEntry> {
        let winning = self.winning_commitment?;
        self.entries.iter().find(|entry| entry.commitment == winning)
    }

    pub fn winning_identity(&self) -> Option<&PublicKey> {
        self.winning_identity.as_ref()
    }
}

impl Participant for Auctioneer {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

fn malformed(err: CryptoError) -> RejectReason {
    RejectReason::Malformed(err.to_string())
}

fn undecryptable(err: CryptoError) -> RejectReason {
    match err {
        CryptoError::Decryption(_) => RejectReason::DecryptionFailed,
        other => malformed(other),
    }
}
