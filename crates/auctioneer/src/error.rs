use auction_crypto::CryptoError;
use thiserror::Error;

/// Errors raised by the auctioneer outside of bundle verdicts.
#[derive(Debug, Error)]
pub enum AuctioneerError {
    #[error("Winning commitment has not been determined")]
    WinnerNotDetermined,

    #[error("Winner identity was already opened")]
    IdentityAlreadyOpened,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
