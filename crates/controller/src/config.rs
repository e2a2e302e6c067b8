//! Round configuration.

use auction_module::AuctionGenesisConfig;
use serde::{Deserialize, Serialize};

use crate::error::RoundError;

/// Smallest accepted RSA modulus.
pub const MIN_KEY_BITS: usize = 1024;

/// Parameters of one auction round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// RSA modulus size for every participant key
    pub key_bits: usize,

    /// Bulletin-board parameters
    pub genesis: AuctionGenesisConfig,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            key_bits: 2048,
            genesis: AuctionGenesisConfig::default(),
        }
    }
}

impl RoundConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, RoundError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RoundError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RoundError> {
        if self.key_bits < MIN_KEY_BITS {
            return Err(RoundError::InvalidConfig(format!(
                "key_bits must be at least {MIN_KEY_BITS}, got {}",
                self.key_bits
            )));
        }
        if self.key_bits % 8 != 0 {
            return Err(RoundError::InvalidConfig(format!(
                "key_bits must be a multiple of 8, got {}",
                self.key_bits
            )));
        }
        self.genesis.validate()?;
        Ok(())
    }
}
