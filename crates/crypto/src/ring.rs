//! RSA ring signatures.
//!
//! A signature over a ring of `n` RSA public keys proves that one of the key
//! owners signed, without revealing which. The construction closes a hash
//! chain into a loop:
//!
//! 1. `k = H(m)`; the keyed step is `E(v) = H(v ‖ k)` read as an integer
//! 2. the signer at index `s` picks a random 256-bit seed `v'` and starts
//!    the walk from `v = E(v')`
//! 3. for every other index `i`, in the order `s+1, …, n-1, 0, …, s-1`, a
//!    random `x_i` is drawn and `v = E(v ⊕ x_i^{e_i} mod n_i)`; the value
//!    of `v` when the walk wraps to index 0 is the glue
//! 4. the loop is closed at `s` with `y_s = v' ⊕ v` and
//!    `x_s = y_s^{d_s} mod n_s`, the only private-key operation
//!
//! Verification re-walks `0..n` from the glue using public exponents only
//! and accepts iff it arrives back at the glue.
//!
//! The signature is `glue ‖ x_0 ‖ … ‖ x_{n-1}`, each field big-endian and
//! padded to the largest modulus width `W` in the ring.

use auction_types::DIGEST_LEN;
use rand::{CryptoRng, RngCore};
use rsa::BigUint;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::codec::to_fixed_be;
use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};

/// Walk values are SHA-256 outputs, so every modulus must exceed 2^256.
const MIN_MODULUS_BITS: usize = DIGEST_LEN * 8 + 1;

/// Ordered, immutable list of public keys a signature hides among.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ring {
    keys: Vec<PublicKey>,
}

impl Ring {
    /// Build a ring of at least two keys.
    pub fn new(keys: Vec<PublicKey>) -> Result<Self, CryptoError> {
        if keys.len() < 2 {
            return Err(CryptoError::InvalidArgument(format!(
                "a ring needs at least 2 keys, got {}",
                keys.len()
            )));
        }
        if let Some(index) = keys.iter().position(|k| k.n().bits() < MIN_MODULUS_BITS) {
            return Err(CryptoError::InvalidArgument(format!(
                "ring key {index} has a modulus below {MIN_MODULUS_BITS} bits"
            )));
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// Index of `key` in the ring, if present.
    pub fn position(&self, key: &PublicKey) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.position(key).is_some()
    }

    /// Field width `W` of every signature value.
    pub fn width(&self) -> usize {
        self.keys.iter().map(PublicKey::width).max().unwrap_or(0)
    }

    /// Byte length of a signature over this ring: glue plus one value per key.
    pub fn signature_len(&self) -> usize {
        (self.len() + 1) * self.width()
    }
}

/// Parsed ring signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingSignature {
    glue: BigUint,
    values: Vec<BigUint>,
}

impl RingSignature {
    /// Split signature bytes into glue and per-key values for `ring`.
    pub fn from_bytes(bytes: &[u8], ring: &Ring) -> Result<Self, CryptoError> {
        let width = ring.width();
        if bytes.len() % width != 0 {
            return Err(CryptoError::Format {
                field: "ring signature",
                reason: format!("length {} is not a multiple of {width}", bytes.len()),
            });
        }
        if bytes.len() != ring.signature_len() {
            return Err(CryptoError::InvalidLength {
                field: "ring signature",
                expected: ring.signature_len(),
                got: bytes.len(),
            });
        }

        let (glue, values) = bytes.split_at(width);
        Ok(Self {
            glue: BigUint::from_bytes_be(glue),
            values: values.chunks(width).map(BigUint::from_bytes_be).collect(),
        })
    }

    /// Serialize as `glue ‖ x_0 ‖ … ‖ x_{n-1}` at field width `width`.
    pub fn to_bytes(&self, width: usize) -> Result<Vec<u8>, CryptoError> {
        let mut bytes = Vec::with_capacity((self.values.len() + 1) * width);
        bytes.extend(to_fixed_be(&self.glue, width, "glue")?);
        for x in &self.values {
            bytes.extend(to_fixed_be(x, width, "ring value")?);
        }
        Ok(bytes)
    }

    pub fn glue(&self) -> &BigUint {
        &self.glue
    }

    pub fn values(&self) -> &[BigUint] {
        &self.values
    }

    /// Re-walk the ring from the glue and check the loop closes.
    pub fn verify(&self, ring: &Ring, msg: &[u8]) -> Result<bool, CryptoError> {
        if self.values.len() != ring.len() {
            return Ok(false);
        }
        let width = ring.width();
        let k = Sha256::digest(msg);

        let mut r = self.glue.clone();
        for (key, x) in ring.keys().iter().zip(&self.values) {
            let y = x.modpow(key.e(), key.n());
            r = keyed_step(&(&r ^ &y), &k, width)?;
        }
        Ok(r == self.glue)
    }
}

/// Sign `msg` as member `signer` of `ring`, holding the matching keypair.
pub fn sign<R: RngCore + CryptoRng>(
    ring: &Ring,
    signer: usize,
    key: &KeyPair,
    msg: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let n = ring.len();
    let own = ring.keys().get(signer).ok_or_else(|| {
        CryptoError::InvalidArgument(format!("signer index {signer} outside ring of {n}"))
    })?;
    if own != key.public_key() {
        return Err(CryptoError::InvalidArgument(format!(
            "ring key at index {signer} does not belong to the signer"
        )));
    }

    let width = ring.width();
    let k = Sha256::digest(msg);

    let mut seed = [0u8; DIGEST_LEN];
    rng.fill_bytes(&mut seed);
    let v_prime = BigUint::from_bytes_be(&seed);
    let mut v = keyed_step(&v_prime, &k, width)?;

    let mut values = vec![BigUint::from(0u32); n];
    let mut glue = None;
    for i in (1..n).map(|offset| (signer + offset) % n) {
        if i == 0 {
            glue = Some(v.clone());
        }
        let member = &ring.keys()[i];
        let x = random_below(member.n(), width, rng);
        let y = x.modpow(member.e(), member.n());
        v = keyed_step(&(&v ^ &y), &k, width)?;
        values[i] = x;
    }
    // With the signer at index 0 the walk never wraps.
    let glue = glue.unwrap_or_else(|| v.clone());

    let y_s = &v_prime ^ &v;
    values[signer] = y_s.modpow(key.d(), own.n());

    debug!(ring_size = n, width, "Produced ring signature");
    RingSignature { glue, values }.to_bytes(width)
}

/// Verify signature bytes over `ring`.
///
/// A malformed length is an error; every other mismatch is `Ok(false)`.
pub fn verify(ring: &Ring, msg: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
    let parsed = RingSignature::from_bytes(signature, ring)?;
    let valid = parsed.verify(ring, msg)?;
    debug!(ring_size = ring.len(), valid, "Verified ring signature");
    Ok(valid)
}

/// `E(v) = H(v ‖ k)` with `v` at the ring's field width.
fn keyed_step(v: &BigUint, k: &[u8], width: usize) -> Result<BigUint, CryptoError> {
    let mut hasher = Sha256::new();
    hasher.update(to_fixed_be(v, width, "walk value")?);
    hasher.update(k);
    Ok(BigUint::from_bytes_be(&hasher.finalize()))
}

/// Near-uniform sample from `[0, modulus)`.
fn random_below<R: RngCore + CryptoRng>(modulus: &BigUint, width: usize, rng: &mut R) -> BigUint {
    // Eight extra bytes keep the modular bias below 2^-64.
    let mut bytes = vec![0u8; width + 8];
    rng.fill_bytes(&mut bytes);
    BigUint::from_bytes_be(&bytes) % modulus
}
