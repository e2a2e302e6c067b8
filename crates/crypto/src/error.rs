//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// A failed signature or commitment check is not an error: verification
/// functions report it as `false`.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed {field}: {reason}")]
    Format { field: &'static str, reason: String },

    #[error("Invalid length for {field}: expected {expected}, got {got}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),
}

impl CryptoError {
    pub(crate) fn format(field: &'static str, reason: impl Into<String>) -> Self {
        CryptoError::Format {
            field,
            reason: reason.into(),
        }
    }
}
