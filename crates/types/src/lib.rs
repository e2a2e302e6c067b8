//! Core type definitions for anonymous sealed-bid auctions.
//!
//! This crate provides the shared data structures passed between bidders,
//! the auctioneer and the public bulletin board: published bid records,
//! adjudication verdicts, round phases and roster entries.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =========================
// PROTOCOL CONSTANTS
// =========================

/// Length of a SHA-256 digest (commitment value `c`).
pub const DIGEST_LEN: usize = 32;

/// Length of a commitment opening nonce `r` (256 bits).
pub const NONCE_LEN: usize = 32;

/// Width of an encoded bid value inside the opening material.
pub const BID_VALUE_LEN: usize = 32;

/// Width of an encoded RSA public exponent.
pub const EXPONENT_LEN: usize = 8;

/// SHA-256 output, used for commitments and addresses.
pub type Digest = [u8; DIGEST_LEN];

/// Publishing address on the bulletin board (32 bytes).
pub type Address = [u8; 32];

// =========================
// PUBLISHED DATA
// =========================

/// Public half of a bid bundle, as placed on the bulletin board.
///
/// `sig` is the byte concatenation `sigma ‖ c1 ‖ c2`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct PublishedBid {
    /// Commitment to the bid value
    pub commitment: Digest,
    /// Ring signature followed by the two token commitments
    pub sig: Vec<u8>,
}

/// Auction round lifecycle as seen by the bulletin board.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AuctionPhase {
    /// No auctioneer yet
    Created,
    /// Accepting `placeBid`
    BiddingOpen,
    /// Opening tokens are being published
    Opening,
    /// Winning commitment published, waiting for the identity token
    WinnerAnnounced,
    /// Winner's identity token published
    IdentityOpened,
    /// Round ended by the auctioneer
    Closed,
}

/// Fixed field widths of a bid bundle for a ring of `ring_len` keys whose
/// signature values are `width` bytes wide.
///
/// `delta` is signed over the two-member ring `[pk_b, pk_a]`, so its values
/// are as wide as the wider of those two keys, which may be narrower than
/// `width`.
///
/// ```text
/// sig    = sigma ‖ c1 ‖ c2
/// tau_1  = C1 ‖ d1            C1 = Enc(c ‖ sigma ‖ Sigma ‖ bid ‖ d)
/// tau_2  = C2 ‖ d2            C2 = Enc(c ‖ pk_b ‖ pk_a ‖ sigma ‖ Sigma ‖ delta)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BundleLayout {
    pub width: usize,
    pub ring_len: usize,
}

impl BundleLayout {
    pub fn new(width: usize, ring_len: usize) -> Self {
        Self { width, ring_len }
    }

    /// Ring signature over the full ring: glue plus one value per member.
    pub fn ring_signature_len(&self) -> usize {
        (self.ring_len + 1) * self.width
    }

    /// Designated-verifier signature over a two-member ring of width
    /// `pair_width`.
    pub fn pair_signature_len(pair_width: usize) -> usize {
        3 * pair_width
    }

    /// Encoded public key: modulus then exponent.
    pub fn public_key_len(&self) -> usize {
        self.width + EXPONENT_LEN
    }

    /// Published `sig = sigma ‖ c1 ‖ c2`.
    pub fn sig_len(&self) -> usize {
        self.ring_signature_len() + 2 * DIGEST_LEN
    }

    /// Plaintext of `C1`.
    pub fn opening_plaintext_len(&self) -> usize {
        DIGEST_LEN + 2 * self.ring_signature_len() + BID_VALUE_LEN + NONCE_LEN
    }

    /// Plaintext of `C2` when `delta` is `pair_width` bytes per value.
    pub fn identity_plaintext_len(&self, pair_width: usize) -> usize {
        DIGEST_LEN
            + 2 * self.public_key_len()
            + 2 * self.ring_signature_len()
            + Self::pair_signature_len(pair_width)
    }
}

// =========================
// ADJUDICATION
// =========================

/// Why the auctioneer rejected a bundle or an identity token.
#[derive(
    Clone, Debug, PartialEq, Eq, Error, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum RejectReason {
    #[error("Malformed field: {0}")]
    Malformed(String),

    #[error("Ring signature on the commitment is invalid")]
    InvalidBidSignature,

    #[error("Opening token does not match its published commitment")]
    TokenCommitmentMismatch,

    #[error("Opening material could not be decrypted")]
    DecryptionFailed,

    #[error("Decrypted material does not match the published bid")]
    MaterialMismatch,

    #[error("Anchoring ring signature is invalid")]
    InvalidAnchorSignature,

    #[error("Bid value does not open the commitment")]
    BidCommitmentMismatch,

    #[error("Bid for this address was already opened")]
    DuplicateOpening,

    #[error("Commitment was already opened for another address")]
    DuplicateCommitment,

    #[error("Commitment is not the winning commitment")]
    NotWinningCommitment,

    #[error("Designated verifier is not this auctioneer")]
    WrongVerifier,

    #[error("Claimed identity is not a member of the bidding ring")]
    NotRingMember,

    #[error("Designated-verifier signature is invalid")]
    InvalidIdentitySignature,
}

/// Terminal outcome of a bid-opening or identity-opening.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    /// Whether the check chain passed.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

// =========================
// ROSTER
// =========================

/// One participant in the roster handed to the protocol controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub bid: u64,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, bid: u64) -> Self {
        Self {
            name: name.into(),
            bid,
        }
    }
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> Digest {
    use sha2::{Digest as _, Sha256};
    Sha256::digest(data).into()
}

/// Derive the bulletin-board address of a participant from its encoded
/// public key.
pub fn address_of(encoded_public_key: &[u8]) -> Address {
    use sha2::{Digest as _, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"AUCTION_ADDRESS_V1:");
    hasher.update(encoded_public_key);
    hasher.finalize().into()
}
