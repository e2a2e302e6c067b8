//! Splitting of published fields and decrypted tokens by fixed widths.

use auction_crypto::codec::FieldReader;
use auction_crypto::{CryptoError, PublicKey};
use auction_types::{BundleLayout, Digest, BID_VALUE_LEN, NONCE_LEN};

/// `sig = sigma ‖ c1 ‖ c2`.
#[derive(Debug)]
pub(crate) struct SigParts<'a> {
    pub sigma: &'a [u8],
    pub c1: Digest,
    pub c2: Digest,
}

impl<'a> SigParts<'a> {
    pub fn parse(sig: &'a [u8], layout: &BundleLayout) -> Result<Self, CryptoError> {
        let mut reader = FieldReader::new(sig);
        let sigma = reader.take(layout.ring_signature_len(), "sigma")?;
        let c1 = reader.take_array("c1")?;
        let c2 = reader.take_array("c2")?;
        reader.finish("sig")?;
        Ok(Self { sigma, c1, c2 })
    }
}

/// A released token `C ‖ d`, split into ciphertext and nonce.
pub(crate) fn split_token(token: &[u8]) -> Result<(&[u8], [u8; NONCE_LEN]), CryptoError> {
    let mut reader = FieldReader::new(token);
    let cipher = reader.take_until_suffix(NONCE_LEN, "token ciphertext")?;
    let nonce = reader.take_array("token nonce")?;
    reader.finish("token")?;
    Ok((cipher, nonce))
}

/// Decrypted `C1 = c ‖ sigma ‖ Sigma ‖ bid ‖ d`.
#[derive(Debug)]
pub(crate) struct OpeningMaterial<'a> {
    pub commitment: Digest,
    pub sigma: &'a [u8],
    pub anchor: &'a [u8],
    pub bid: &'a [u8],
    pub decommitment: [u8; NONCE_LEN],
}

impl<'a> OpeningMaterial<'a> {
    pub fn parse(plain: &'a [u8], layout: &BundleLayout) -> Result<Self, CryptoError> {
        let mut reader = FieldReader::new(plain);
        let commitment = reader.take_array("opened commitment")?;
        let sigma = reader.take(layout.ring_signature_len(), "opened sigma")?;
        let anchor = reader.take(layout.ring_signature_len(), "anchor signature")?;
        let bid = reader.take(BID_VALUE_LEN, "bid value")?;
        let decommitment = reader.take_array("decommitment")?;
        reader.finish("opening material")?;
        Ok(Self {
            commitment,
            sigma,
            anchor,
            bid,
            decommitment,
        })
    }
}

/// Decrypted `C2 = c ‖ pk_b ‖ pk_a ‖ sigma ‖ Sigma ‖ delta`.
///
/// Keys are written at the bidding ring's width; `delta` at the width of the
/// wider of the two decoded keys.
#[derive(Debug)]
pub(crate) struct IdentityMaterial<'a> {
    pub commitment: Digest,
    pub bidder_key: PublicKey,
    pub auctioneer_key: PublicKey,
    pub sigma: &'a [u8],
    pub anchor: &'a [u8],
    pub delta: &'a [u8],
}

impl<'a> IdentityMaterial<'a> {
    pub fn parse(plain: &'a [u8], layout: &BundleLayout) -> Result<Self, CryptoError> {
        let mut reader = FieldReader::new(plain);
        let commitment = reader.take_array("identity commitment")?;
        let bidder_key = reader.take(layout.public_key_len(), "bidder public key")?;
        let auctioneer_key = reader.take(layout.public_key_len(), "auctioneer public key")?;
        let sigma = reader.take(layout.ring_signature_len(), "identity sigma")?;
        let anchor = reader.take(layout.ring_signature_len(), "identity anchor")?;
        let bidder_key = PublicKey::decode(bidder_key, layout.width)?;
        let auctioneer_key = PublicKey::decode(auctioneer_key, layout.width)?;
        let pair_width = bidder_key.width().max(auctioneer_key.width());
        let delta = reader.take(BundleLayout::pair_signature_len(pair_width), "delta")?;
        reader.finish("identity material")?;
        Ok(Self {
            commitment,
            bidder_key,
            auctioneer_key,
            sigma,
            anchor,
            delta,
        })
    }
}
