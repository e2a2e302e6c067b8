//! Hash commitments on SHA-256.
//!
//! A commitment `c = SHA256(msg ‖ r)` with a 256-bit nonce `r` is:
//! - **Hiding**: given `c`, `msg` cannot be recovered without `r`
//! - **Binding**: no different `(msg', r')` opens to the same `c`
//!
//! Used to commit to bid values and to the encrypted opening tokens.

use auction_types::{Digest, NONCE_LEN};
use rand::{CryptoRng, RngCore};
use sha2::{Digest as _, Sha256};
use tracing::debug;

use crate::error::CryptoError;

/// Commitment value together with its opening nonce.
#[derive(Clone, PartialEq, Eq)]
pub struct Commitment {
    /// `c = SHA256(msg ‖ r)`
    pub c: Digest,
    /// Opening nonce (decommitment)
    pub r: [u8; NONCE_LEN],
}

impl Commitment {
    /// Commit to `msg` under a fresh nonce.
    pub fn create<R: RngCore + CryptoRng>(msg: &[u8], rng: &mut R) -> Self {
        let mut r = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut r);
        Self {
            c: digest(msg, &r),
            r,
        }
    }

    /// Check that `msg` opens this commitment.
    pub fn opens(&self, msg: &[u8]) -> bool {
        digest(msg, &self.r) == self.c
    }
}

impl std::fmt::Debug for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commitment")
            .field("c", &hex::encode(self.c))
            .finish_non_exhaustive()
    }
}

/// Compute `SHA256(msg ‖ r)`.
///
/// The nonce must be exactly 256 bits.
pub fn commit(msg: &[u8], r: &[u8]) -> Result<Digest, CryptoError> {
    if r.len() != NONCE_LEN {
        return Err(CryptoError::InvalidArgument(format!(
            "commitment nonce must be {NONCE_LEN} bytes, got {}",
            r.len()
        )));
    }
    let c = digest(msg, r);
    debug!(c = %hex::encode(c), "Computed commitment");
    Ok(c)
}

/// Recompute the commitment of `(msg, r)` and compare with `c`.
///
/// Returns `false` for a nonce of the wrong length.
pub fn verify(msg: &[u8], r: &[u8], c: &Digest) -> bool {
    match commit(msg, r) {
        Ok(expected) => &expected == c,
        Err(_) => false,
    }
}

fn digest(msg: &[u8], r: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(msg);
    hasher.update(r);
    hasher.finalize().into()
}
