//! Cryptographic primitives for anonymous sealed-bid auctions.
//!
//! All primitives are built on SHA-256 and raw RSA arithmetic.
//!
//! # Overview
//!
//! 1. **Commitments**: `c = SHA256(msg ‖ r)` with a fresh 256-bit nonce `r`
//!    binds a bidder to a value without revealing it.
//!
//! 2. **Chunked encryption**: RSA-OAEP applied block by block, so opening
//!    material of any length can be addressed to the auctioneer alone.
//!
//! 3. **Ring signatures**: a signature on behalf of a ring of RSA public
//!    keys that hides which member signed. A two-member ring of the signer
//!    and the auctioneer gives a designated-verifier signature.
//!
//! 4. **Identities**: per-participant keypair and ring position.

pub mod cipher;
pub mod codec;
pub mod commitment;
pub mod error;
pub mod identity;
pub mod keys;
pub mod ring;

pub use cipher::{decrypt, encrypt};
pub use commitment::{commit, Commitment};
pub use error::CryptoError;
pub use identity::{Identity, Participant, RingMembership};
pub use keys::{KeyPair, PublicKey};
pub use ring::{Ring, RingSignature};
