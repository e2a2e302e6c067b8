//! Bid bundle construction.

use rand::{CryptoRng, RngCore};
use thiserror::Error;
use tracing::debug;

use auction_crypto::codec::encode_bid_value;
use auction_crypto::{encrypt, Commitment, CryptoError, Identity, PublicKey, Ring};
use auction_types::{BundleLayout, Digest, PublishedBid};

/// Errors that can occur during bid creation.
#[derive(Debug, Error)]
pub enum BidError {
    #[error("No bidding ring assigned")]
    NoRing,

    #[error("Bid has not been sealed yet")]
    NotSealed,

    #[error("Bid was already sealed")]
    AlreadySealed,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Everything a bidder keeps after sealing one bid.
///
/// Only [`SealedBid::published`] goes to the bulletin board during bidding;
/// the two tokens are released later, in order.
#[derive(Debug, Clone)]
pub struct SealedBid {
    /// Commitment to the bid value, `(c, d)`
    pub bid_commitment: Commitment,
    /// `sigma`: ring signature on `c`
    pub sigma: Vec<u8>,
    /// `Sigma`: ring signature on `c ‖ sigma`
    pub anchor: Vec<u8>,
    /// `delta`: designated-verifier signature on `c ‖ sigma ‖ Sigma`
    pub delta: Vec<u8>,
    /// Encrypted opening material `C1`
    pub opening_cipher: Vec<u8>,
    /// Commitment to `C1`, `(c1, d1)`
    pub opening_commitment: Commitment,
    /// Encrypted identity material `C2`
    pub identity_cipher: Vec<u8>,
    /// Commitment to `C2`, `(c2, d2)`
    pub identity_commitment: Commitment,
}

impl SealedBid {
    pub fn commitment(&self) -> Digest {
        self.bid_commitment.c
    }

    /// `sig = sigma ‖ c1 ‖ c2`.
    pub fn sig(&self) -> Vec<u8> {
        let mut sig = Vec::with_capacity(self.sigma.len() + 64);
        sig.extend_from_slice(&self.sigma);
        sig.extend_from_slice(&self.opening_commitment.c);
        sig.extend_from_slice(&self.identity_commitment.c);
        sig
    }

    /// The `(c, sig)` pair placed on the bulletin board.
    pub fn published(&self) -> PublishedBid {
        PublishedBid {
            commitment: self.commitment(),
            sig: self.sig(),
        }
    }

    /// `tau_1 = C1 ‖ d1`.
    pub fn opening_token(&self) -> Vec<u8> {
        token(&self.opening_cipher, &self.opening_commitment)
    }

    /// `tau_2 = C2 ‖ d2`.
    pub fn identity_token(&self) -> Vec<u8> {
        token(&self.identity_cipher, &self.identity_commitment)
    }
}

fn token(cipher: &[u8], commitment: &Commitment) -> Vec<u8> {
    let mut out = Vec::with_capacity(cipher.len() + commitment.r.len());
    out.extend_from_slice(cipher);
    out.extend_from_slice(&commitment.r);
    out
}

/// Seal a bid of `bid_value` for `auctioneer_key`.
///
/// The identity must already hold the round's ring. Its own key and the
/// auctioneer key are written at the ring's width.
pub fn create_bid<R: RngCore + CryptoRng>(
    identity: &Identity,
    auctioneer_key: &PublicKey,
    bid_value: u64,
    rng: &mut R,
) -> Result<SealedBid, BidError> {
    let ring = identity.membership().ok_or(BidError::NoRing)?.ring();
    let layout = BundleLayout::new(ring.width(), ring.len());

    // c = H(x ‖ d)
    let value = encode_bid_value(bid_value);
    let bid_commitment = Commitment::create(&value, rng);
    let c = bid_commitment.c;

    let sigma = identity.sign(&c, rng)?;
    let c_sigma = [c.as_slice(), sigma.as_slice()].concat();
    let anchor = identity.sign(&c_sigma, rng)?;

    // C1 = Enc(c ‖ sigma ‖ Sigma ‖ x ‖ d)
    let mut opening = Vec::with_capacity(layout.opening_plaintext_len());
    opening.extend_from_slice(&c_sigma);
    opening.extend_from_slice(&anchor);
    opening.extend_from_slice(&value);
    opening.extend_from_slice(&bid_commitment.r);
    let opening_cipher = encrypt(&opening, auctioneer_key, rng)?;
    let opening_commitment = Commitment::create(&opening_cipher, rng);

    // delta binds the bidder key to the bundle, verifiable only with the auctioneer
    let pair = Ring::new(vec![identity.public_key().clone(), auctioneer_key.clone()])?;
    let bound = [c_sigma.as_slice(), anchor.as_slice()].concat();
    let delta = identity.sign_with(&pair, &bound, rng)?;

    // C2 = Enc(c ‖ pk_b ‖ pk_a ‖ sigma ‖ Sigma ‖ delta)
    let mut identity_plain = Vec::with_capacity(layout.identity_plaintext_len(pair.width()));
    identity_plain.extend_from_slice(&c);
    identity_plain.extend(identity.public_key().encode(layout.width)?);
    identity_plain.extend(auctioneer_key.encode(layout.width)?);
    identity_plain.extend_from_slice(&sigma);
    identity_plain.extend_from_slice(&anchor);
    identity_plain.extend_from_slice(&delta);
    let identity_cipher = encrypt(&identity_plain, auctioneer_key, rng)?;
    let identity_commitment = Commitment::create(&identity_cipher, rng);

    debug!(
        commitment = %hex::encode(c),
        c1 = %hex::encode(opening_commitment.c),
        c2 = %hex::encode(identity_commitment.c),
        "Sealed bid"
    );

    Ok(SealedBid {
        bid_commitment,
        sigma,
        anchor,
        delta,
        opening_cipher,
        opening_commitment,
        identity_cipher,
        identity_commitment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_crypto::{commit, decrypt, KeyPair};
    use auction_types::DIGEST_LEN;
    use once_cell::sync::Lazy;
    use rand::rngs::OsRng;

    struct Fixture {
        bidder: Identity,
        auctioneer: KeyPair,
    }

    static FIXTURE: Lazy<Fixture> = Lazy::new(|| {
        let mut bidder = Identity::generate(&mut OsRng, 1024).unwrap();
        let other = KeyPair::generate(&mut OsRng, 1024).unwrap();
        let auctioneer = KeyPair::generate(&mut OsRng, 1024).unwrap();
        let ring = Ring::new(vec![
            other.public_key().clone(),
            bidder.public_key().clone(),
            auctioneer.public_key().clone(),
        ])
        .unwrap();
        bidder.assign_ring(ring).unwrap();
        Fixture { bidder, auctioneer }
    });

    fn layout() -> BundleLayout {
        let ring = FIXTURE.bidder.membership().unwrap().ring();
        BundleLayout::new(ring.width(), ring.len())
    }

    #[test]
    fn test_create_bid() {
        let sealed = create_bid(&FIXTURE.bidder, FIXTURE.auctioneer.public_key(), 1000, &mut OsRng)
            .unwrap();
        let layout = layout();

        let published = sealed.published();
        assert_eq!(published.sig.len(), layout.sig_len());
        assert_eq!(&published.sig[..sealed.sigma.len()], sealed.sigma.as_slice());
        assert_eq!(
            commit(&encode_bid_value(1000), &sealed.bid_commitment.r).unwrap(),
            published.commitment
        );

        let ring = FIXTURE.bidder.membership().unwrap().ring();
        assert!(Identity::verify(&published.commitment, &sealed.sigma, ring).unwrap());
    }

    #[test]
    fn test_tokens_open_published_commitments() {
        let sealed = create_bid(&FIXTURE.bidder, FIXTURE.auctioneer.public_key(), 7, &mut OsRng)
            .unwrap();
        let sig = sealed.sig();
        let c2 = &sig[sig.len() - DIGEST_LEN..];
        let c1 = &sig[sig.len() - 2 * DIGEST_LEN..sig.len() - DIGEST_LEN];

        let tau_1 = sealed.opening_token();
        let (cipher, nonce) = tau_1.split_at(tau_1.len() - DIGEST_LEN);
        assert_eq!(commit(cipher, nonce).unwrap().as_slice(), c1);

        let tau_2 = sealed.identity_token();
        let (cipher, nonce) = tau_2.split_at(tau_2.len() - DIGEST_LEN);
        assert_eq!(commit(cipher, nonce).unwrap().as_slice(), c2);
    }

    #[test]
    fn test_encrypted_material_layout() {
        let sealed = create_bid(&FIXTURE.bidder, FIXTURE.auctioneer.public_key(), 42, &mut OsRng)
            .unwrap();
        let layout = layout();

        let opening = decrypt(&sealed.opening_cipher, &FIXTURE.auctioneer).unwrap();
        assert_eq!(opening.len(), layout.opening_plaintext_len());
        assert_eq!(&opening[..DIGEST_LEN], &sealed.commitment());

        let identity = decrypt(&sealed.identity_cipher, &FIXTURE.auctioneer).unwrap();
        let pair_width = FIXTURE.bidder.public_key().width();
        assert_eq!(identity.len(), layout.identity_plaintext_len(pair_width));
        assert_eq!(sealed.delta.len(), BundleLayout::pair_signature_len(pair_width));
    }

    #[test]
    fn test_create_bid_requires_ring() {
        let lone = Identity::generate(&mut OsRng, 1024).unwrap();
        assert!(matches!(
            create_bid(&lone, FIXTURE.auctioneer.public_key(), 1, &mut OsRng),
            Err(BidError::NoRing)
        ));
    }
}
