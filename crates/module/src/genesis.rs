//! Genesis configuration for the bulletin board.
//!
//! Fixed for the lifetime of one auction round.

use serde::{Deserialize, Serialize};

/// Genesis configuration for the bulletin board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionGenesisConfig {
    /// Deposit every participant attaches to its first call
    pub deposit: u64,

    /// Maximum number of bids accepted
    pub max_bidders: u32,

    /// Whether deposits can be withdrawn as soon as the winning commitment
    /// is announced. When unset, withdrawals wait for the identity opening
    /// or for the round to close.
    pub early_withdrawal: bool,
}

impl Default for AuctionGenesisConfig {
    fn default() -> Self {
        Self {
            deposit: 50,
            max_bidders: 64,
            early_withdrawal: true,
        }
    }
}

impl AuctionGenesisConfig {
    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.deposit == 0 {
            return Err(GenesisValidationError::InvalidDeposit(
                "Deposit cannot be zero".into(),
            ));
        }
        if self.max_bidders < 1 {
            return Err(GenesisValidationError::InvalidBidderLimit(
                "At least one bidder must be allowed".into(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid deposit: {0}")]
    InvalidDeposit(String),

    #[error("Invalid bidder limit: {0}")]
    InvalidBidderLimit(String),
}
