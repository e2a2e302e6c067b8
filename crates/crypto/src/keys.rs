//! RSA key material.
//!
//! Public keys are what rings and identity tokens carry; the private
//! exponent never leaves [`KeyPair`].

use std::fmt;

use auction_types::{Address, EXPONENT_LEN};
use rand::{CryptoRng, RngCore};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

use crate::codec::{to_fixed_be, FieldReader};
use crate::error::CryptoError;

/// RSA public key `(n, e)`. Two keys are equal iff `n` and `e` are.
#[derive(Clone)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Public modulus `n`.
    pub fn n(&self) -> &BigUint {
        self.0.n()
    }

    /// Public exponent `e`.
    pub fn e(&self) -> &BigUint {
        self.0.e()
    }

    /// Modulus length in bytes.
    pub fn width(&self) -> usize {
        self.0.size()
    }

    /// Length of [`PublicKey::encode`] output for a given key width.
    pub fn encoded_len(width: usize) -> usize {
        width + EXPONENT_LEN
    }

    /// Fixed-width encoding: `n` padded to `width`, then `e` in
    /// `EXPONENT_LEN` bytes.
    pub fn encode(&self, width: usize) -> Result<Vec<u8>, CryptoError> {
        let mut out = to_fixed_be(self.n(), width, "public modulus")?;
        out.extend(to_fixed_be(self.e(), EXPONENT_LEN, "public exponent")?);
        Ok(out)
    }

    /// Inverse of [`PublicKey::encode`].
    pub fn decode(bytes: &[u8], width: usize) -> Result<Self, CryptoError> {
        let mut reader = FieldReader::new(bytes);
        let n = BigUint::from_bytes_be(reader.take(width, "public modulus")?);
        let e = BigUint::from_bytes_be(reader.take(EXPONENT_LEN, "public exponent")?);
        reader.finish("public key")?;
        RsaPublicKey::new(n, e)
            .map(PublicKey)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Bulletin-board address bound to this key.
    pub fn address(&self) -> Result<Address, CryptoError> {
        Ok(auction_types::address_of(&self.encode(self.width())?))
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.n() == other.n() && self.e() == other.e()
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.n().to_bytes_be();
        f.debug_struct("PublicKey")
            .field("bits", &self.n().bits())
            .field("n_prefix", &hex::encode(&n[..n.len().min(8)]))
            .field("e", &self.e().to_string())
            .finish()
    }
}

impl From<RsaPublicKey> for PublicKey {
    fn from(key: RsaPublicKey) -> Self {
        PublicKey(key)
    }
}

/// RSA keypair `{n, e, d}` owned by a single participant.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh keypair with a modulus of `bits` bits.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(rng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(Self::from_private(private))
    }

    /// Wrap an existing RSA private key.
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = PublicKey(private.to_public_key());
        Self { private, public }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private exponent `d`.
    pub fn d(&self) -> &BigUint {
        self.private.d()
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.private
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use rand::rngs::OsRng;

    static KEY: Lazy<KeyPair> = Lazy::new(|| KeyPair::generate(&mut OsRng, 1024).unwrap());

    #[test]
    fn test_public_key_encoding() {
        let public = KEY.public_key();
        let width = public.width();
        assert_eq!(width, 128);

        let encoded = public.encode(width).unwrap();
        assert_eq!(encoded.len(), PublicKey::encoded_len(width));

        let decoded = PublicKey::decode(&encoded, width).unwrap();
        assert_eq!(&decoded, public);
    }

    #[test]
    fn test_public_key_decode_rejects_bad_length() {
        let public = KEY.public_key();
        let encoded = public.encode(public.width()).unwrap();
        assert!(PublicKey::decode(&encoded[1..], public.width()).is_err());
        assert!(PublicKey::decode(&encoded, public.width() + 1).is_err());
    }

    #[test]
    fn test_private_exponent_inverts_public() {
        let public = KEY.public_key();
        let m = BigUint::from(123_456_789u64);
        let c = m.modpow(public.e(), public.n());
        assert_eq!(c.modpow(KEY.d(), public.n()), m);
    }

    #[test]
    fn test_debug_does_not_leak_private_exponent() {
        let rendered = format!("{:?}", *KEY);
        assert!(!rendered.contains(&KEY.d().to_string()));
    }
}
