//! One full auction round: setup, bidding, opening, tally, identity opening
//! and deposit settlement.

use rand::{CryptoRng, RngCore};
use tracing::{info, warn};

use auction_auctioneer::{Auctioneer, AuctioneerError};
use auction_client::Bidder;
use auction_crypto::{Identity, Participant, PublicKey, Ring};
use auction_types::{Address, Digest, RejectReason, Verdict};

use crate::config::RoundConfig;
use crate::error::RoundError;
use crate::ledger::Ledger;
use crate::roster::Roster;

/// A bidder together with its publishing address.
#[derive(Debug)]
pub struct Seat {
    pub address: Address,
    pub bidder: Bidder,
}

/// The disclosed winner of a round.
#[derive(Debug, Clone)]
pub struct WinnerInfo {
    pub name: String,
    pub address: Address,
    pub bid: u64,
    pub commitment: Digest,
    pub public_key: PublicKey,
}

/// Result of [`AuctionRound::run`].
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    /// Winner whose identity opening was accepted
    pub winner: Option<WinnerInfo>,
    /// Addresses whose bid opening was accepted, in opening order
    pub accepted: Vec<Address>,
    /// Addresses whose deposit was forfeited
    pub punished: Vec<Address>,
    /// Deposits returned at the end of the round
    pub refunds: Vec<(Address, u64)>,
}

/// Participants and ring of one round.
#[derive(Debug)]
pub struct AuctionRound {
    config: RoundConfig,
    auctioneer: Auctioneer,
    auctioneer_address: Address,
    seats: Vec<Seat>,
    ring: Ring,
}

impl AuctionRound {
    /// Generate keys for the auctioneer and every roster entry, and fix the
    /// public ring: bidder keys in roster order, then the auctioneer key.
    pub fn setup<R: RngCore + CryptoRng>(
        config: RoundConfig,
        roster: &impl Roster,
        rng: &mut R,
    ) -> Result<Self, RoundError> {
        config.validate()?;
        let entries = roster.get_participants().map_err(RoundError::Roster)?;
        if entries.is_empty() {
            return Err(RoundError::EmptyRoster);
        }
        if entries.len() > config.genesis.max_bidders as usize {
            return Err(RoundError::InvalidConfig(format!(
                "roster of {} exceeds max_bidders {}",
                entries.len(),
                config.genesis.max_bidders
            )));
        }

        let mut auctioneer = Auctioneer::generate(rng, config.key_bits)?;
        let auctioneer_key = auctioneer.public_key().clone();

        let identities = entries
            .iter()
            .map(|_| Identity::generate(rng, config.key_bits))
            .collect::<Result<Vec<_>, _>>()?;

        let mut keys: Vec<PublicKey> = identities
            .iter()
            .map(|identity| identity.public_key().clone())
            .collect();
        keys.push(auctioneer_key.clone());
        let ring = Ring::new(keys)?;

        auctioneer.assign_ring(ring.clone())?;
        let auctioneer_address = auctioneer.address()?;

        let mut seats = Vec::with_capacity(entries.len());
        for (entry, identity) in entries.into_iter().zip(identities) {
            let mut bidder = Bidder::new(entry.name, entry.bid, identity, auctioneer_key.clone());
            bidder.assign_ring(ring.clone())?;
            seats.push(Seat {
                address: bidder.address()?,
                bidder,
            });
        }

        info!(
            bidders = seats.len(),
            key_bits = config.key_bits,
            "Round set up"
        );
        Ok(Self {
            config,
            auctioneer,
            auctioneer_address,
            seats,
            ring,
        })
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn auctioneer(&self) -> &Auctioneer {
        &self.auctioneer
    }

    pub fn auctioneer_address(&self) -> Address {
        self.auctioneer_address
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// The published ring.
    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    /// Drive the round to completion against `ledger`.
    ///
    /// Any ledger failure aborts the round at the step where it happened.
    pub fn run<R: RngCore + CryptoRng>(
        &mut self,
        ledger: &impl Ledger,
        rng: &mut R,
    ) -> Result<RoundOutcome, RoundError> {
        let deposit = self.config.genesis.deposit;
        let mut outcome = RoundOutcome::default();

        // ---------------------------------------------------------------
        // Bidding
        // ---------------------------------------------------------------
        ledger.start_auction(self.auctioneer_address, deposit)?;
        info!("Bidding open");

        for seat in &mut self.seats {
            let published = seat.bidder.bid(rng)?;
            ledger.place_bid(seat.address, deposit, &published)?;
        }

        // ---------------------------------------------------------------
        // Bid opening
        // ---------------------------------------------------------------
        for seat in &self.seats {
            ledger.open_bid(seat.address, &seat.bidder.opening_token()?)?;
        }
        info!(bids = self.seats.len(), "Opening tokens published");

        for seat in &self.seats {
            let verdict = match (
                ledger.published_bid(&seat.address)?,
                ledger.opening_token(&seat.address)?,
            ) {
                (Some(published), Some(token)) => self.auctioneer.bid_opening(
                    seat.address,
                    &self.ring,
                    &published.commitment,
                    &published.sig,
                    &token,
                ),
                _ => Verdict::Rejected(RejectReason::Malformed(
                    "bid or opening token missing from the ledger".into(),
                )),
            };

            if verdict.is_accepted() {
                outcome.accepted.push(seat.address);
            } else {
                ledger.punish_bidder(self.auctioneer_address, seat.address)?;
                outcome.punished.push(seat.address);
            }
        }

        // ---------------------------------------------------------------
        // Tally and identity opening
        // ---------------------------------------------------------------
        if let Some(winning) = self.auctioneer.get_winning_commitment() {
            ledger.announce_winning_commitment(self.auctioneer_address, winning)?;
            info!(commitment = %hex::encode(winning), "Winning commitment announced");

            if let Some(seat) = self.seats.iter().find(|seat| seat.bidder.is_winner(&winning)) {
                ledger.open_identity(seat.address, &seat.bidder.identity_opening_token()?)?;

                let verdict = match (
                    ledger.published_bid(&seat.address)?,
                    ledger.identity_token()?,
                ) {
                    (Some(published), Some(token)) => {
                        self.auctioneer.identity_opening(&published.sig, &token)?
                    }
                    _ => Verdict::Rejected(RejectReason::Malformed(
                        "identity token missing from the ledger".into(),
                    )),
                };

                match (verdict, self.auctioneer.winning_identity()) {
                    (Verdict::Accepted, Some(public_key)) => {
                        let bid = self
                            .auctioneer
                            .winning_bid()
                            .map(|entry| entry.bid)
                            .ok_or(AuctioneerError::WinnerNotDetermined)?;
                        info!(winner = %seat.bidder.name(), bid, "Winner identified");
                        outcome.winner = Some(WinnerInfo {
                            name: seat.bidder.name().to_string(),
                            address: seat.address,
                            bid,
                            commitment: winning,
                            public_key: public_key.clone(),
                        });
                    }
                    (verdict, _) => {
                        warn!(?verdict, "Winner failed to prove its identity");
                        ledger.punish_bidder(self.auctioneer_address, seat.address)?;
                        outcome.punished.push(seat.address);
                    }
                }
            }
        } else {
            warn!("No valid bids, round ends without a winner");
        }

        // ---------------------------------------------------------------
        // Settlement
        // ---------------------------------------------------------------
        ledger.close_auction(self.auctioneer_address)?;

        let participants = self
            .seats
            .iter()
            .map(|seat| seat.address)
            .chain(std::iter::once(self.auctioneer_address));
        for address in participants {
            if outcome.punished.contains(&address) {
                continue;
            }
            let amount = ledger.withdraw_deposit(address)?;
            outcome.refunds.push((address, amount));
        }

        info!(
            accepted = outcome.accepted.len(),
            punished = outcome.punished.len(),
            winner = outcome.winner.as_ref().map(|w| w.name.as_str()),
            "Round complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LocalLedger;
    use auction_types::RosterEntry;
    use rand::rngs::OsRng;

    fn config() -> RoundConfig {
        RoundConfig {
            key_bits: 1024,
            ..Default::default()
        }
    }

    fn roster(bids: &[u64]) -> Vec<RosterEntry> {
        bids.iter()
            .enumerate()
            .map(|(i, bid)| RosterEntry::new(format!("bidder{i}"), *bid))
            .collect()
    }

    /// Flips one byte of the published `sig` of `target` on every read.
    struct TamperingLedger {
        inner: LocalLedger,
        target: Address,
    }

    impl Ledger for TamperingLedger {
        fn start_auction(&self, sender: Address, deposit: u64) -> Result<(), RoundError> {
            self.inner.start_auction(sender, deposit)
        }
        fn place_bid(&self, sender: Address, deposit: u64, bid: &auction_types::PublishedBid) -> Result<(), RoundError> {
            self.inner.place_bid(sender, deposit, bid)
        }
        fn open_bid(&self, sender: Address, token: &[u8]) -> Result<(), RoundError> {
            self.inner.open_bid(sender, token)
        }
        fn announce_winning_commitment(&self, sender: Address, c: Digest) -> Result<(), RoundError> {
            self.inner.announce_winning_commitment(sender, c)
        }
        fn open_identity(&self, sender: Address, token: &[u8]) -> Result<(), RoundError> {
            self.inner.open_identity(sender, token)
        }
        fn close_auction(&self, sender: Address) -> Result<(), RoundError> {
            self.inner.close_auction(sender)
        }
        fn punish_bidder(&self, sender: Address, bidder: Address) -> Result<u64, RoundError> {
            self.inner.punish_bidder(sender, bidder)
        }
        fn withdraw_deposit(&self, sender: Address) -> Result<u64, RoundError> {
            self.inner.withdraw_deposit(sender)
        }
        fn published_bid(&self, bidder: &Address) -> Result<Option<auction_types::PublishedBid>, RoundError> {
            let mut bid = self.inner.published_bid(bidder)?;
            if bidder == &self.target {
                if let Some(bid) = bid.as_mut() {
                    bid.sig[0] ^= 0x80;
                }
            }
            Ok(bid)
        }
        fn opening_token(&self, bidder: &Address) -> Result<Option<Vec<u8>>, RoundError> {
            self.inner.opening_token(bidder)
        }
        fn identity_token(&self) -> Result<Option<Vec<u8>>, RoundError> {
            self.inner.identity_token()
        }
    }

    /// Loses the winner's identity token.
    struct LossyLedger(LocalLedger);

    impl Ledger for LossyLedger {
        fn start_auction(&self, sender: Address, deposit: u64) -> Result<(), RoundError> {
            self.0.start_auction(sender, deposit)
        }
        fn place_bid(&self, sender: Address, deposit: u64, bid: &auction_types::PublishedBid) -> Result<(), RoundError> {
            self.0.place_bid(sender, deposit, bid)
        }
        fn open_bid(&self, sender: Address, token: &[u8]) -> Result<(), RoundError> {
            self.0.open_bid(sender, token)
        }
        fn announce_winning_commitment(&self, sender: Address, c: Digest) -> Result<(), RoundError> {
            self.0.announce_winning_commitment(sender, c)
        }
        fn open_identity(&self, sender: Address, token: &[u8]) -> Result<(), RoundError> {
            self.0.open_identity(sender, token)
        }
        fn close_auction(&self, sender: Address) -> Result<(), RoundError> {
            self.0.close_auction(sender)
        }
        fn punish_bidder(&self, sender: Address, bidder: Address) -> Result<u64, RoundError> {
            self.0.punish_bidder(sender, bidder)
        }
        fn withdraw_deposit(&self, sender: Address) -> Result<u64, RoundError> {
            self.0.withdraw_deposit(sender)
        }
        fn published_bid(&self, bidder: &Address) -> Result<Option<auction_types::PublishedBid>, RoundError> {
            self.0.published_bid(bidder)
        }
        fn opening_token(&self, bidder: &Address) -> Result<Option<Vec<u8>>, RoundError> {
            self.0.opening_token(bidder)
        }
        fn identity_token(&self) -> Result<Option<Vec<u8>>, RoundError> {
            Ok(None)
        }
    }

    /// Every call fails.
    struct DownLedger;

    fn down<T>() -> Result<T, RoundError> {
        Err(RoundError::LedgerUnavailable("connection refused".into()))
    }

    impl Ledger for DownLedger {
        fn start_auction(&self, _: Address, _: u64) -> Result<(), RoundError> {
            down()
        }
        fn place_bid(&self, _: Address, _: u64, _: &auction_types::PublishedBid) -> Result<(), RoundError> {
            down()
        }
        fn open_bid(&self, _: Address, _: &[u8]) -> Result<(), RoundError> {
            down()
        }
        fn announce_winning_commitment(&self, _: Address, _: Digest) -> Result<(), RoundError> {
            down()
        }
        fn open_identity(&self, _: Address, _: &[u8]) -> Result<(), RoundError> {
            down()
        }
        fn close_auction(&self, _: Address) -> Result<(), RoundError> {
            down()
        }
        fn punish_bidder(&self, _: Address, _: Address) -> Result<u64, RoundError> {
            down()
        }
        fn withdraw_deposit(&self, _: Address) -> Result<u64, RoundError> {
            down()
        }
        fn published_bid(&self, _: &Address) -> Result<Option<auction_types::PublishedBid>, RoundError> {
            down()
        }
        fn opening_token(&self, _: &Address) -> Result<Option<Vec<u8>>, RoundError> {
            down()
        }
        fn identity_token(&self) -> Result<Option<Vec<u8>>, RoundError> {
            down()
        }
    }

    struct OfflineRoster;

    impl Roster for OfflineRoster {
        fn get_participants(&self) -> anyhow::Result<Vec<RosterEntry>> {
            anyhow::bail!("roster service offline")
        }
    }

    #[test]
    fn test_setup_builds_ring() {
        let round = AuctionRound::setup(config(), &roster(&[3, 9]), &mut OsRng).unwrap();
        assert_eq!(round.ring().len(), 3);
        assert_eq!(&round.ring().keys()[2], round.auctioneer().public_key());
        assert_eq!(&round.ring().keys()[0], round.seats()[0].bidder.public_key());
        assert_eq!(round.seats()[1].bidder.name(), "bidder1");
    }

    #[test]
    fn test_setup_rejects_bad_rosters() {
        assert!(matches!(
            AuctionRound::setup(config(), &Vec::<RosterEntry>::new(), &mut OsRng),
            Err(RoundError::EmptyRoster)
        ));
        assert!(matches!(
            AuctionRound::setup(config(), &OfflineRoster, &mut OsRng),
            Err(RoundError::Roster(_))
        ));

        let mut small = config();
        small.genesis.max_bidders = 1;
        assert!(matches!(
            AuctionRound::setup(small, &roster(&[1, 2]), &mut OsRng),
            Err(RoundError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_honest_round() {
        let mut round = AuctionRound::setup(config(), &roster(&[3, 9, 5]), &mut OsRng).unwrap();
        let ledger = LocalLedger::new(round.config().genesis.clone());
        let outcome = round.run(&ledger, &mut OsRng).unwrap();

        let winner = outcome.winner.unwrap();
        assert_eq!(winner.name, "bidder1");
        assert_eq!(winner.bid, 9);
        // Reported bid is the one the auctioneer decrypted
        assert_eq!(
            Some(winner.bid),
            round.auctioneer().winning_bid().map(|entry| entry.bid)
        );
        assert_eq!(winner.address, round.seats()[1].address);
        assert_eq!(&winner.public_key, round.seats()[1].bidder.public_key());

        assert_eq!(outcome.accepted.len(), 3);
        assert!(outcome.punished.is_empty());
        assert_eq!(outcome.refunds.len(), 4);
        assert!(outcome.refunds.iter().all(|(_, amount)| *amount == 50));
    }

    #[test]
    fn test_tampered_entry_is_punished() {
        let mut round = AuctionRound::setup(config(), &roster(&[3, 9, 5]), &mut OsRng).unwrap();
        let target = round.seats()[0].address;
        let ledger = TamperingLedger {
            inner: LocalLedger::new(round.config().genesis.clone()),
            target,
        };
        let outcome = round.run(&ledger, &mut OsRng).unwrap();

        assert_eq!(outcome.punished, vec![target]);
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.winner.unwrap().bid, 9);

        // Forfeited deposit went to the auctioneer
        let auctioneer = round.auctioneer_address();
        assert!(outcome.refunds.contains(&(auctioneer, 100)));
        assert!(!outcome.refunds.iter().any(|(address, _)| *address == target));
    }

    #[test]
    fn test_tampered_top_bid_loses() {
        let mut round = AuctionRound::setup(config(), &roster(&[3, 9, 5]), &mut OsRng).unwrap();
        let target = round.seats()[1].address;
        let ledger = TamperingLedger {
            inner: LocalLedger::new(round.config().genesis.clone()),
            target,
        };
        let outcome = round.run(&ledger, &mut OsRng).unwrap();

        assert_eq!(outcome.punished, vec![target]);
        let winner = outcome.winner.unwrap();
        assert_eq!(winner.name, "bidder2");
        assert_eq!(winner.bid, 5);
    }

    #[test]
    fn test_missing_identity_token_punishes_winner() {
        let mut round = AuctionRound::setup(config(), &roster(&[3, 9]), &mut OsRng).unwrap();
        let ledger = LossyLedger(LocalLedger::new(round.config().genesis.clone()));
        let outcome = round.run(&ledger, &mut OsRng).unwrap();

        // No fallback to the runner-up
        assert!(outcome.winner.is_none());
        assert_eq!(outcome.punished, vec![round.seats()[1].address]);
        assert_eq!(outcome.accepted.len(), 2);
    }

    #[test]
    fn test_unavailable_ledger_aborts() {
        let mut round = AuctionRound::setup(config(), &roster(&[3, 9]), &mut OsRng).unwrap();
        assert!(matches!(
            round.run(&DownLedger, &mut OsRng),
            Err(RoundError::LedgerUnavailable(_))
        ));
        assert!(round.seats().iter().all(|seat| seat.bidder.sealed().is_none()));
        assert!(round.auctioneer().entries().is_empty());
    }
}
