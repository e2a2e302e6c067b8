//! End-to-end integration tests for the anonymous sealed-bid auction.
//!
//! These tests exercise the full protocol:
//! 1. Key and ring setup
//! 2. Bid sealing and publication
//! 3. Bid opening and tally
//! 4. Identity opening of the winner
//! 5. Deposit settlement on the reference ledger

use auction_auctioneer::{Auctioneer, AuctioneerError};
use auction_client::Bidder;
use auction_controller::{random_roster, AuctionRound, JsonRoster, LocalLedger, RoundConfig};
use auction_crypto::{Identity, KeyPair, Participant, Ring};
use auction_module::{LedgerQuery, LedgerQueryResponse};
use auction_types::{AuctionPhase, RejectReason, RosterEntry, Verdict};

use once_cell::sync::Lazy;
use rand::rngs::OsRng;

/// Auctioneer key first, then bidder keys.
static KEYS: Lazy<Vec<KeyPair>> = Lazy::new(|| {
    (0..4)
        .map(|_| KeyPair::generate(&mut OsRng, 1024).unwrap())
        .collect()
});

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Auctioneer plus one bidder per value, all on the same ring.
fn setup(bids: &[u64]) -> (Auctioneer, Vec<Bidder>, Ring) {
    let auctioneer_identity = Identity::from_keypair(KEYS[0].clone());
    let auctioneer_key = auctioneer_identity.public_key().clone();

    let mut keys: Vec<_> = KEYS[1..=bids.len()]
        .iter()
        .map(|keypair| keypair.public_key().clone())
        .collect();
    keys.push(auctioneer_key.clone());
    let ring = Ring::new(keys).unwrap();

    let mut auctioneer = Auctioneer::new(auctioneer_identity);
    auctioneer.assign_ring(ring.clone()).unwrap();

    let bidders = bids
        .iter()
        .zip(&KEYS[1..])
        .enumerate()
        .map(|(i, (bid, keypair))| {
            let mut bidder = Bidder::new(
                format!("bidder{i}"),
                *bid,
                Identity::from_keypair(keypair.clone()),
                auctioneer_key.clone(),
            );
            bidder.assign_ring(ring.clone()).unwrap();
            bidder
        })
        .collect();

    (auctioneer, bidders, ring)
}

/// Seal, publish and open every bid in order.
fn open_all(auctioneer: &mut Auctioneer, bidders: &mut [Bidder], ring: &Ring) -> Vec<Verdict> {
    bidders
        .iter_mut()
        .map(|bidder| {
            let published = bidder.bid(&mut OsRng).unwrap();
            auctioneer.bid_opening(
                bidder.address().unwrap(),
                ring,
                &published.commitment,
                &published.sig,
                &bidder.opening_token().unwrap(),
            )
        })
        .collect()
}

/// Test the complete protocol with a single bidder.
#[test]
fn test_full_protocol_flow() {
    init_tracing();

    // ========================================
    // Phase 1: Setup - keys and ring
    // ========================================

    let (mut auctioneer, mut bidders, ring) = setup(&[7]);
    let bidder = &mut bidders[0];
    println!("Setup complete: ring of {} keys", ring.len());

    // ========================================
    // Phase 2: Bidder seals and publishes
    // ========================================

    let published = bidder.bid(&mut OsRng).unwrap();
    assert_eq!(published.sig.len(), bidder.sealed().unwrap().sig().len());
    println!("Bid published: {} byte signature", published.sig.len());

    // ========================================
    // Phase 3: Bid opening
    // ========================================

    let address = bidder.address().unwrap();
    let verdict = auctioneer.bid_opening(
        address,
        &ring,
        &published.commitment,
        &published.sig,
        &bidder.opening_token().unwrap(),
    );
    assert_eq!(verdict, Verdict::Accepted);
    assert_eq!(auctioneer.entry(&address).unwrap().bid, 7);
    println!("Bid opened: value=7");

    // ========================================
    // Phase 4: Tally
    // ========================================

    let winning = auctioneer.get_winning_commitment().unwrap();
    assert_eq!(winning, published.commitment);
    assert!(bidder.is_winner(&winning));
    println!("Winning commitment announced");

    // ========================================
    // Phase 5: Identity opening
    // ========================================

    let verdict = auctioneer
        .identity_opening(&published.sig, &bidder.identity_opening_token().unwrap())
        .unwrap();
    assert_eq!(verdict, Verdict::Accepted);
    assert_eq!(auctioneer.winning_identity(), Some(bidder.public_key()));

    println!("\nAuction settled successfully!");
    println!("  Winner: {}", bidder.name());
}

/// A single flipped byte in the published signature is caught at opening.
#[test]
fn test_tampered_bid_rejected() {
    let (mut auctioneer, mut bidders, ring) = setup(&[7]);
    let bidder = &mut bidders[0];

    let mut published = bidder.bid(&mut OsRng).unwrap();
    let middle = published.sig.len() / 2;
    published.sig[middle] ^= 0x01;

    let verdict = auctioneer.bid_opening(
        bidder.address().unwrap(),
        &ring,
        &published.commitment,
        &published.sig,
        &bidder.opening_token().unwrap(),
    );
    assert!(!verdict.is_accepted());
    assert!(auctioneer.entries().is_empty());
    assert_eq!(auctioneer.get_winning_commitment(), None);
}

#[test]
fn test_highest_bid_wins() {
    let (mut auctioneer, mut bidders, ring) = setup(&[3, 9, 5]);

    let verdicts = open_all(&mut auctioneer, &mut bidders, &ring);
    assert!(verdicts.iter().all(Verdict::is_accepted));
    println!("3 bids opened");

    let winning = auctioneer.get_winning_commitment().unwrap();
    assert!(bidders[1].is_winner(&winning));
    assert!(!bidders[0].is_winner(&winning));
    assert!(!bidders[2].is_winner(&winning));
    assert_eq!(auctioneer.winning_bid().unwrap().bid, 9);

    // A losing bidder cannot claim the win
    let loser = &bidders[2];
    let verdict = auctioneer
        .identity_opening(
            &loser.published().unwrap().sig,
            &loser.identity_opening_token().unwrap(),
        )
        .unwrap();
    assert_eq!(verdict, Verdict::Rejected(RejectReason::NotWinningCommitment));

    let winner = &bidders[1];
    let verdict = auctioneer
        .identity_opening(
            &winner.published().unwrap().sig,
            &winner.identity_opening_token().unwrap(),
        )
        .unwrap();
    assert_eq!(verdict, Verdict::Accepted);
    assert_eq!(auctioneer.winning_identity(), Some(winner.public_key()));

    assert!(matches!(
        auctioneer.identity_opening(
            &winner.published().unwrap().sig,
            &winner.identity_opening_token().unwrap(),
        ),
        Err(AuctioneerError::IdentityAlreadyOpened)
    ));
}

/// Equal bids: the first opened bid wins.
#[test]
fn test_tie_goes_to_first_opened() {
    let (mut auctioneer, mut bidders, ring) = setup(&[9, 9]);
    open_all(&mut auctioneer, &mut bidders, &ring);
    let winning = auctioneer.get_winning_commitment().unwrap();
    assert!(bidders[0].is_winner(&winning));

    // Same bidders, opened in reverse order
    let (mut auctioneer, mut bidders, ring) = setup(&[9, 9]);
    bidders.reverse();
    open_all(&mut auctioneer, &mut bidders, &ring);
    let winning = auctioneer.get_winning_commitment().unwrap();
    assert!(bidders[0].is_winner(&winning));
    assert_eq!(bidders[0].name(), "bidder1");
}

/// Identity opening before the tally is a caller error.
#[test]
fn test_identity_opening_before_tally() {
    let (mut auctioneer, mut bidders, ring) = setup(&[4]);
    open_all(&mut auctioneer, &mut bidders, &ring);

    let bidder = &bidders[0];
    assert!(matches!(
        auctioneer.identity_opening(
            &bidder.published().unwrap().sig,
            &bidder.identity_opening_token().unwrap(),
        ),
        Err(AuctioneerError::WinnerNotDetermined)
    ));
}

/// Complete round through the controller and the reference ledger.
#[test]
fn test_controller_round_on_local_ledger() {
    init_tracing();

    let entries = random_roster(4, 0, 20, &mut OsRng).unwrap();
    let highest = entries.iter().map(|entry| entry.bid).max().unwrap();

    let config = RoundConfig {
        key_bits: 1024,
        ..Default::default()
    };
    let mut round = AuctionRound::setup(config, &entries, &mut OsRng).unwrap();
    let ledger = LocalLedger::new(round.config().genesis.clone());
    println!("Round set up with {} bidders", round.seats().len());

    let outcome = round.run(&ledger, &mut OsRng).unwrap();

    let winner = outcome.winner.expect("round should produce a winner");
    assert_eq!(winner.bid, highest);
    assert!(outcome.punished.is_empty());
    assert_eq!(outcome.accepted.len(), 4);
    println!("  Winner: {} with {}", winner.name, winner.bid);

    assert_eq!(
        ledger.query(LedgerQuery::GetPhase),
        LedgerQueryResponse::Phase(AuctionPhase::Closed)
    );
    assert_eq!(
        ledger.query(LedgerQuery::GetWinningCommitment),
        LedgerQueryResponse::WinningCommitment(Some(winner.commitment))
    );
    for (address, amount) in &outcome.refunds {
        assert_eq!(*amount, 50);
        assert_eq!(
            ledger.query(LedgerQuery::GetEscrow { address: *address }),
            LedgerQueryResponse::Escrow(0)
        );
    }
}

/// Roster read from a JSON file drives a full round.
#[test]
fn test_round_from_roster_file() {
    let path = std::env::temp_dir().join(format!("auction-roster-{}.json", std::process::id()));
    let roster = JsonRoster::new(&path);
    roster
        .save(&[RosterEntry::new("alice", 12), RosterEntry::new("bob", 4)])
        .unwrap();

    let config =
        RoundConfig::from_json(r#"{"key_bits": 1024, "genesis": {"deposit": 10}}"#).unwrap();
    let mut round = AuctionRound::setup(config, &roster, &mut OsRng).unwrap();
    std::fs::remove_file(&path).unwrap();

    let ledger = LocalLedger::new(round.config().genesis.clone());
    let outcome = round.run(&ledger, &mut OsRng).unwrap();

    assert_eq!(outcome.winner.unwrap().name, "alice");
    assert_eq!(outcome.refunds.len(), 3);
    assert!(outcome.refunds.iter().all(|(_, amount)| *amount == 10));
}
