//! Fixed-width byte layouts.
//!
//! Protocol fields are concatenated without delimiters, so every field is
//! written at an agreed width and read back by position.

use rsa::BigUint;

use crate::error::CryptoError;

/// Encode `value` big-endian, left-padded with zeros to exactly `width` bytes.
pub fn to_fixed_be(
    value: &BigUint,
    width: usize,
    field: &'static str,
) -> Result<Vec<u8>, CryptoError> {
    let raw = value.to_bytes_be();
    // BigUint encodes zero as a single zero byte.
    let raw: &[u8] = if raw.iter().all(|b| *b == 0) { &[] } else { &raw };
    if raw.len() > width {
        return Err(CryptoError::InvalidLength {
            field,
            expected: width,
            got: raw.len(),
        });
    }
    let mut out = vec![0u8; width - raw.len()];
    out.extend_from_slice(raw);
    Ok(out)
}

/// Encode a bid value as a 256-bit big-endian integer.
pub fn encode_bid_value(value: u64) -> [u8; auction_types::BID_VALUE_LEN] {
    let mut out = [0u8; auction_types::BID_VALUE_LEN];
    out[auction_types::BID_VALUE_LEN - 8..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Decode a bid value written by [`encode_bid_value`].
///
/// Values that do not fit in a `u64` are rejected.
pub fn decode_bid_value(bytes: &[u8]) -> Result<u64, CryptoError> {
    if bytes.len() != auction_types::BID_VALUE_LEN {
        return Err(CryptoError::InvalidLength {
            field: "bid value",
            expected: auction_types::BID_VALUE_LEN,
            got: bytes.len(),
        });
    }
    let (high, low) = bytes.split_at(auction_types::BID_VALUE_LEN - 8);
    if high.iter().any(|b| *b != 0) {
        return Err(CryptoError::format("bid value", "exceeds 64 bits"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    Ok(u64::from_be_bytes(buf))
}

/// Cursor over a concatenation of fixed-width fields.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    /// Reads exactly `len` bytes.
    pub fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], CryptoError> {
        if len > self.remaining() {
            return Err(CryptoError::format(
                field,
                format!("truncated: need {len} bytes, {} left", self.remaining()),
            ));
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.bytes[start..start + len])
    }

    /// Reads a fixed-size array.
    pub fn take_array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], CryptoError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    /// Reads everything except the trailing `suffix_len` bytes.
    pub fn take_until_suffix(
        &mut self,
        suffix_len: usize,
        field: &'static str,
    ) -> Result<&'a [u8], CryptoError> {
        let len = self
            .remaining()
            .checked_sub(suffix_len)
            .ok_or_else(|| CryptoError::format(field, "shorter than its fixed suffix"))?;
        self.take(len, field)
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(self, field: &'static str) -> Result<(), CryptoError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CryptoError::format(field, format!("{extra} trailing bytes"))),
        }
    }
}
