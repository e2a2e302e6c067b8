//! The bulletin board as seen by the controller.

use std::sync::Arc;

use parking_lot::RwLock;

use auction_module::handlers::{self, CallContext, CallReceipt};
use auction_module::queries::{handle_query, LedgerQuery, LedgerQueryResponse};
use auction_module::{AuctionGenesisConfig, LedgerCall, LedgerState};
use auction_types::{Address, Digest, PublishedBid};

use crate::error::RoundError;

/// Publication interface of the bulletin board.
///
/// Every call either publishes durably or fails; there is no partial
/// success.
pub trait Ledger {
    fn start_auction(&self, sender: Address, deposit: u64) -> Result<(), RoundError>;

    fn place_bid(
        &self,
        sender: Address,
        deposit: u64,
        bid: &PublishedBid,
    ) -> Result<(), RoundError>;

    fn open_bid(&self, sender: Address, opening_token: &[u8]) -> Result<(), RoundError>;

    fn announce_winning_commitment(
        &self,
        sender: Address,
        commitment: Digest,
    ) -> Result<(), RoundError>;

    fn open_identity(&self, sender: Address, identity_token: &[u8]) -> Result<(), RoundError>;

    fn close_auction(&self, sender: Address) -> Result<(), RoundError>;

    /// Returns the forfeited amount.
    fn punish_bidder(&self, sender: Address, bidder: Address) -> Result<u64, RoundError>;

    /// Returns the withdrawn amount.
    fn withdraw_deposit(&self, sender: Address) -> Result<u64, RoundError>;

    fn published_bid(&self, bidder: &Address) -> Result<Option<PublishedBid>, RoundError>;

    fn opening_token(&self, bidder: &Address) -> Result<Option<Vec<u8>>, RoundError>;

    fn identity_token(&self) -> Result<Option<Vec<u8>>, RoundError>;
}

/// In-process bulletin board. Clones share the same state.
#[derive(Clone, Debug)]
pub struct LocalLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl LocalLedger {
    pub fn new(config: AuctionGenesisConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::new(config))),
        }
    }

    /// Apply one call as `sender` with `value` attached.
    pub fn submit(
        &self,
        sender: Address,
        value: u64,
        call: LedgerCall,
    ) -> Result<CallReceipt, RoundError> {
        let mut state = self.state.write();
        Ok(handlers::dispatch(
            &mut *state,
            &CallContext::new(sender, value),
            call,
        )?)
    }

    pub fn query(&self, query: LedgerQuery) -> LedgerQueryResponse {
        handle_query(&*self.state.read(), query)
    }

    /// Run `f` against a read snapshot of the state.
    pub fn with_state<T>(&self, f: impl FnOnce(&LedgerState) -> T) -> T {
        f(&*self.state.read())
    }

    fn record(&self, sender: Address, value: u64, call: LedgerCall) -> Result<(), RoundError> {
        self.submit(sender, value, call).map(|_| ())
    }

    fn amount(&self, sender: Address, call: LedgerCall) -> Result<u64, RoundError> {
        match self.submit(sender, 0, call)? {
            CallReceipt::Forfeited(amount) | CallReceipt::Withdrawn(amount) => Ok(amount),
            CallReceipt::Recorded => Ok(0),
        }
    }
}

impl Ledger for LocalLedger {
    fn start_auction(&self, sender: Address, deposit: u64) -> Result<(), RoundError> {
        self.record(sender, deposit, LedgerCall::StartAuction)
    }

    fn place_bid(
        &self,
        sender: Address,
        deposit: u64,
        bid: &PublishedBid,
    ) -> Result<(), RoundError> {
        self.record(
            sender,
            deposit,
            LedgerCall::PlaceBid {
                commitment: bid.commitment,
                sig: bid.sig.clone(),
            },
        )
    }

    fn open_bid(&self, sender: Address, opening_token: &[u8]) -> Result<(), RoundError> {
        self.record(
            sender,
            0,
            LedgerCall::OpenBid {
                opening_token: opening_token.to_vec(),
            },
        )
    }

    fn announce_winning_commitment(
        &self,
        sender: Address,
        commitment: Digest,
    ) -> Result<(), RoundError> {
        self.record(
            sender,
            0,
            LedgerCall::AnnounceWinningCommitment { commitment },
        )
    }

    fn open_identity(&self, sender: Address, identity_token: &[u8]) -> Result<(), RoundError> {
        self.record(
            sender,
            0,
            LedgerCall::OpenIdentity {
                identity_token: identity_token.to_vec(),
            },
        )
    }

    fn close_auction(&self, sender: Address) -> Result<(), RoundError> {
        self.record(sender, 0, LedgerCall::CloseAuction)
    }

    fn punish_bidder(&self, sender: Address, bidder: Address) -> Result<u64, RoundError> {
        self.amount(sender, LedgerCall::PunishBidder { bidder })
    }

    fn withdraw_deposit(&self, sender: Address) -> Result<u64, RoundError> {
        self.amount(sender, LedgerCall::WithdrawDeposit)
    }

    fn published_bid(&self, bidder: &Address) -> Result<Option<PublishedBid>, RoundError> {
        Ok(self.with_state(|state| state.get_bid(bidder).map(|record| record.bid.clone())))
    }

    fn opening_token(&self, bidder: &Address) -> Result<Option<Vec<u8>>, RoundError> {
        Ok(self.with_state(|state| {
            state
                .get_bid(bidder)
                .and_then(|record| record.opening_token.clone())
        }))
    }

    fn identity_token(&self) -> Result<Option<Vec<u8>>, RoundError> {
        Ok(self.with_state(|state| state.identity_token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_module::LedgerError;
    use auction_types::AuctionPhase;

    const AUCTIONEER: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];

    #[test]
    fn test_local_ledger_publishes() {
        let ledger = LocalLedger::new(AuctionGenesisConfig::default());
        ledger.start_auction(AUCTIONEER, 50).unwrap();

        let bid = PublishedBid {
            commitment: [7u8; 32],
            sig: vec![1, 2, 3],
        };
        ledger.place_bid(ALICE, 50, &bid).unwrap();
        assert_eq!(ledger.published_bid(&ALICE).unwrap(), Some(bid));
        assert_eq!(ledger.opening_token(&ALICE).unwrap(), None);

        ledger.open_bid(ALICE, &[9, 9]).unwrap();
        assert_eq!(ledger.opening_token(&ALICE).unwrap(), Some(vec![9, 9]));
        assert_eq!(
            ledger.query(LedgerQuery::GetPhase),
            LedgerQueryResponse::Phase(AuctionPhase::Opening)
        );
    }

    #[test]
    fn test_clones_share_state() {
        let ledger = LocalLedger::new(AuctionGenesisConfig::default());
        let handle = ledger.clone();
        ledger.start_auction(AUCTIONEER, 50).unwrap();
        assert!(handle.with_state(|state| state.is_auctioneer(&AUCTIONEER)));
    }

    #[test]
    fn test_refusals_surface_as_ledger_errors() {
        let ledger = LocalLedger::new(AuctionGenesisConfig::default());
        ledger.start_auction(AUCTIONEER, 50).unwrap();
        assert!(matches!(
            ledger.punish_bidder(ALICE, AUCTIONEER),
            Err(RoundError::Ledger(LedgerError::NotAuthorized))
        ));
        assert!(matches!(
            ledger.place_bid(
                ALICE,
                1,
                &PublishedBid {
                    commitment: [0u8; 32],
                    sig: vec![1]
                }
            ),
            Err(RoundError::Ledger(LedgerError::DepositMismatch { .. }))
        ));
    }
}
