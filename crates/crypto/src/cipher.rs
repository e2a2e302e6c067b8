//! Arbitrary-length RSA-OAEP encryption.
//!
//! A single OAEP block carries at most `k - 2·hLen - 2` bytes, where `k` is
//! the modulus length. Longer plaintexts are split into chunks of that size
//! and each chunk is encrypted to exactly `k` bytes. Chunk boundaries carry
//! no meaning: callers delimit their own fields by fixed widths.

use rand::{CryptoRng, RngCore};
use rsa::Oaep;
use sha2::Sha256;
use tracing::debug;

use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};

/// OAEP overhead with SHA-256: `2·32 + 2`.
pub const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// Plaintext bytes carried by one block for a modulus of `width` bytes.
pub fn chunk_size(width: usize) -> Result<usize, CryptoError> {
    width
        .checked_sub(OAEP_OVERHEAD)
        .filter(|size| *size > 0)
        .ok_or_else(|| {
            CryptoError::InvalidArgument(format!("{width}-byte modulus is too small for OAEP"))
        })
}

/// Ciphertext length produced for a plaintext of `len` bytes.
pub fn ciphertext_len(len: usize, width: usize) -> Result<usize, CryptoError> {
    Ok(len.div_ceil(chunk_size(width)?) * width)
}

fn padding() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Encrypt `plain` of any length to `key`.
pub fn encrypt<R: RngCore + CryptoRng>(
    plain: &[u8],
    key: &PublicKey,
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let width = key.width();
    let chunk = chunk_size(width)?;

    let mut cipher = Vec::with_capacity(ciphertext_len(plain.len(), width)?);
    for block in plain.chunks(chunk) {
        let encrypted = key
            .as_rsa()
            .encrypt(rng, padding(), block)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        cipher.extend_from_slice(&encrypted);
    }

    debug!(
        plain_len = plain.len(),
        blocks = plain.len().div_ceil(chunk),
        "Encrypted chunked plaintext"
    );
    Ok(cipher)
}

/// Decrypt a ciphertext produced by [`encrypt`].
///
/// Any block failing the OAEP check aborts the whole decryption.
pub fn decrypt(cipher: &[u8], key: &KeyPair) -> Result<Vec<u8>, CryptoError> {
    let width = key.public_key().width();
    if cipher.len() % width != 0 {
        return Err(CryptoError::Format {
            field: "ciphertext",
            reason: format!("length {} is not a multiple of {width}", cipher.len()),
        });
    }

    let mut plain = Vec::with_capacity(cipher.len());
    for (index, block) in cipher.chunks(width).enumerate() {
        let decrypted = key
            .as_rsa()
            .decrypt(padding(), block)
            .map_err(|e| CryptoError::Decryption(format!("block {index}: {e}")))?;
        plain.extend_from_slice(&decrypted);
    }

    debug!(
        cipher_len = cipher.len(),
        blocks = cipher.len() / width,
        "Decrypted chunked ciphertext"
    );
    Ok(plain)
}
