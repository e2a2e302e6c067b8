//! Call handlers for the bulletin board.
//!
//! These functions implement the publication and deposit rules for each
//! call type.

use tracing::{debug, info, warn};

use crate::call::LedgerCall;
use crate::error::LedgerError;
use crate::state::{BidRecord, LedgerState};
use auction_types::{Address, AuctionPhase, Digest, PublishedBid};

/// Context provided by the runtime for each call.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Value attached to the call (for deposits)
    pub value: u64,
}

impl CallContext {
    pub fn new(sender: Address, value: u64) -> Self {
        Self { sender, value }
    }
}

/// What an applied call moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallReceipt {
    /// The call was published
    Recorded,
    /// Deposit moved from a bidder to the auctioneer
    Forfeited(u64),
    /// Deposit returned to the sender
    Withdrawn(u64),
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, LedgerError>;

/// Apply one call.
pub fn dispatch(
    state: &mut LedgerState,
    ctx: &CallContext,
    call: LedgerCall,
) -> HandlerResult<CallReceipt> {
    debug!(call = call.name(), sender = %hex::encode(ctx.sender), "Applying call");
    match call {
        LedgerCall::StartAuction => handle_start_auction(state, ctx),
        LedgerCall::PlaceBid { commitment, sig } => handle_place_bid(state, ctx, commitment, sig),
        LedgerCall::OpenBid { opening_token } => handle_open_bid(state, ctx, opening_token),
        LedgerCall::AnnounceWinningCommitment { commitment } => {
            handle_announce_winning_commitment(state, ctx, commitment)
        }
        LedgerCall::OpenIdentity { identity_token } => {
            handle_open_identity(state, ctx, identity_token)
        }
        LedgerCall::CloseAuction => handle_close_auction(state, ctx),
        LedgerCall::PunishBidder { bidder } => {
            handle_punish_bidder(state, ctx, bidder).map(CallReceipt::Forfeited)
        }
        LedgerCall::WithdrawDeposit => {
            handle_withdraw_deposit(state, ctx).map(CallReceipt::Withdrawn)
        }
    }
}

/// Decode a borsh-encoded call and apply it.
pub fn dispatch_encoded(
    state: &mut LedgerState,
    ctx: &CallContext,
    encoded: &[u8],
) -> HandlerResult<CallReceipt> {
    let call: LedgerCall =
        borsh::from_slice(encoded).map_err(|e| LedgerError::InvalidCall(e.to_string()))?;
    dispatch(state, ctx, call)
}

fn require_phase(state: &LedgerState, expected: AuctionPhase) -> HandlerResult<()> {
    if state.phase != expected {
        return Err(LedgerError::InvalidPhase {
            expected,
            got: state.phase,
        });
    }
    Ok(())
}

fn require_auctioneer(state: &LedgerState, ctx: &CallContext) -> HandlerResult<()> {
    if !state.is_auctioneer(&ctx.sender) {
        return Err(LedgerError::NotAuthorized);
    }
    Ok(())
}

fn require_deposit(state: &LedgerState, ctx: &CallContext) -> HandlerResult<()> {
    if ctx.value != state.config.deposit {
        return Err(LedgerError::DepositMismatch {
            required: state.config.deposit,
            got: ctx.value,
        });
    }
    Ok(())
}

/// Handle StartAuction call.
pub fn handle_start_auction(
    state: &mut LedgerState,
    ctx: &CallContext,
) -> HandlerResult<CallReceipt> {
    match state.phase {
        AuctionPhase::Created => {
            require_deposit(state, ctx)?;
            state.auctioneer = Some(ctx.sender);
            state.add_escrow(ctx.sender, ctx.value);
            state.phase = AuctionPhase::BiddingOpen;
            info!(auctioneer = %hex::encode(ctx.sender), "Auction started");
            Ok(CallReceipt::Recorded)
        }
        // Repeating the call is a no-op until the first bid lands
        AuctionPhase::BiddingOpen if state.bidders.is_empty() => {
            require_auctioneer(state, ctx)?;
            if ctx.value != 0 {
                return Err(LedgerError::DepositMismatch {
                    required: 0,
                    got: ctx.value,
                });
            }
            Ok(CallReceipt::Recorded)
        }
        got => Err(LedgerError::InvalidPhase {
            expected: AuctionPhase::Created,
            got,
        }),
    }
}

/// Handle PlaceBid call.
pub fn handle_place_bid(
    state: &mut LedgerState,
    ctx: &CallContext,
    commitment: Digest,
    sig: Vec<u8>,
) -> HandlerResult<CallReceipt> {
    require_phase(state, AuctionPhase::BiddingOpen)?;

    // The auctioneer is a ring member but never bids
    if state.is_auctioneer(&ctx.sender) {
        return Err(LedgerError::NotAuthorized);
    }
    if state.bids.contains_key(&ctx.sender) {
        return Err(LedgerError::AlreadyBid);
    }
    if state.bidders.len() >= state.config.max_bidders as usize {
        return Err(LedgerError::TooManyBidders {
            max: state.config.max_bidders,
        });
    }
    if sig.is_empty() {
        return Err(LedgerError::EmptyToken);
    }
    require_deposit(state, ctx)?;

    state.bids.insert(
        ctx.sender,
        BidRecord {
            bidder: ctx.sender,
            bid: PublishedBid { commitment, sig },
            opening_token: None,
        },
    );
    state.bidders.push(ctx.sender);
    state.add_escrow(ctx.sender, ctx.value);

    debug!(
        bidder = %hex::encode(ctx.sender),
        commitment = %hex::encode(commitment),
        "Bid placed"
    );
    Ok(CallReceipt::Recorded)
}

/// Handle OpenBid call. The first opening closes bidding.
pub fn handle_open_bid(
    state: &mut LedgerState,
    ctx: &CallContext,
    opening_token: Vec<u8>,
) -> HandlerResult<CallReceipt> {
    if !matches!(state.phase, AuctionPhase::BiddingOpen | AuctionPhase::Opening) {
        return Err(LedgerError::InvalidPhase {
            expected: AuctionPhase::Opening,
            got: state.phase,
        });
    }
    if opening_token.is_empty() {
        return Err(LedgerError::EmptyToken);
    }
    if state.punished.contains(&ctx.sender) {
        return Err(LedgerError::Punished);
    }

    let record = state
        .bids
        .get_mut(&ctx.sender)
        .ok_or(LedgerError::BidNotFound)?;
    if record.opening_token.is_some() {
        return Err(LedgerError::AlreadyOpened);
    }
    record.opening_token = Some(opening_token);

    if state.phase == AuctionPhase::BiddingOpen {
        state.phase = AuctionPhase::Opening;
        info!("Bidding closed, opening started");
    }
    debug!(bidder = %hex::encode(ctx.sender), "Opening token published");
    Ok(CallReceipt::Recorded)
}

/// Handle AnnounceWinningCommitment call.
pub fn handle_announce_winning_commitment(
    state: &mut LedgerState,
    ctx: &CallContext,
    commitment: Digest,
) -> HandlerResult<CallReceipt> {
    require_auctioneer(state, ctx)?;
    require_phase(state, AuctionPhase::Opening)?;

    let winner = state
        .bidder_of(&commitment)
        .ok_or(LedgerError::UnknownCommitment)?;
    if state.punished.contains(&winner) {
        return Err(LedgerError::Punished);
    }

    state.winning_commitment = Some(commitment);
    state.phase = AuctionPhase::WinnerAnnounced;
    info!(commitment = %hex::encode(commitment), "Winning commitment announced");
    Ok(CallReceipt::Recorded)
}

/// Handle OpenIdentity call.
pub fn handle_open_identity(
    state: &mut LedgerState,
    ctx: &CallContext,
    identity_token: Vec<u8>,
) -> HandlerResult<CallReceipt> {
    require_phase(state, AuctionPhase::WinnerAnnounced)?;

    let winner = state
        .winning_commitment
        .and_then(|commitment| state.bidder_of(&commitment));
    if winner != Some(ctx.sender) {
        return Err(LedgerError::NotWinner);
    }
    if identity_token.is_empty() {
        return Err(LedgerError::EmptyToken);
    }

    state.identity_token = Some(identity_token);
    state.phase = AuctionPhase::IdentityOpened;
    info!(winner = %hex::encode(ctx.sender), "Identity token published");
    Ok(CallReceipt::Recorded)
}

/// Handle CloseAuction call.
pub fn handle_close_auction(
    state: &mut LedgerState,
    ctx: &CallContext,
) -> HandlerResult<CallReceipt> {
    require_auctioneer(state, ctx)?;
    if state.phase == AuctionPhase::Closed {
        return Err(LedgerError::InvalidPhase {
            expected: AuctionPhase::IdentityOpened,
            got: state.phase,
        });
    }
    state.phase = AuctionPhase::Closed;
    info!(bids = state.bidders.len(), "Auction closed");
    Ok(CallReceipt::Recorded)
}

/// Handle PunishBidder call. Returns the forfeited amount.
pub fn handle_punish_bidder(
    state: &mut LedgerState,
    ctx: &CallContext,
    bidder: Address,
) -> HandlerResult<u64> {
    require_auctioneer(state, ctx)?;
    if !state.bids.contains_key(&bidder) {
        return Err(LedgerError::BidNotFound);
    }
    if !state.punished.insert(bidder) {
        return Err(LedgerError::AlreadyPunished);
    }

    let forfeited = state.take_escrow(&bidder);
    state.add_escrow(ctx.sender, forfeited);
    warn!(bidder = %hex::encode(bidder), forfeited, "Bidder punished");
    Ok(forfeited)
}

/// Handle WithdrawDeposit call. Returns the withdrawn amount.
pub fn handle_withdraw_deposit(state: &mut LedgerState, ctx: &CallContext) -> HandlerResult<u64> {
    if state.punished.contains(&ctx.sender) {
        return Err(LedgerError::Punished);
    }

    let is_winner = state
        .winning_commitment
        .and_then(|commitment| state.bidder_of(&commitment))
        == Some(ctx.sender);
    let open = match state.phase {
        AuctionPhase::IdentityOpened | AuctionPhase::Closed => true,
        // The winner stays bonded until its identity is opened
        AuctionPhase::WinnerAnnounced => state.config.early_withdrawal && !is_winner,
        _ => false,
    };
    if !open {
        return Err(LedgerError::InvalidPhase {
            expected: AuctionPhase::Closed,
            got: state.phase,
        });
    }

    match state.take_escrow(&ctx.sender) {
        0 => Err(LedgerError::NothingToWithdraw),
        amount => {
            debug!(address = %hex::encode(ctx.sender), amount, "Deposit withdrawn");
            Ok(amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::AuctionGenesisConfig;

    const AUCTIONEER: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const BOB: Address = [3u8; 32];
    const DEPOSIT: u64 = 50;

    fn ctx(sender: Address, value: u64) -> CallContext {
        CallContext::new(sender, value)
    }

    fn place(state: &mut LedgerState, bidder: Address, commitment: u8) -> HandlerResult<CallReceipt> {
        dispatch(
            state,
            &ctx(bidder, DEPOSIT),
            LedgerCall::PlaceBid {
                commitment: [commitment; 32],
                sig: vec![commitment; 8],
            },
        )
    }

    fn open(state: &mut LedgerState, bidder: Address) -> HandlerResult<CallReceipt> {
        dispatch(
            state,
            &ctx(bidder, 0),
            LedgerCall::OpenBid {
                opening_token: vec![0xAA; 16],
            },
        )
    }

    /// Started round with two placed and opened bids.
    fn opened_state() -> LedgerState {
        let mut state = LedgerState::new(AuctionGenesisConfig::default());
        dispatch(&mut state, &ctx(AUCTIONEER, DEPOSIT), LedgerCall::StartAuction).unwrap();
        place(&mut state, ALICE, 0xA1).unwrap();
        place(&mut state, BOB, 0xB0).unwrap();
        open(&mut state, ALICE).unwrap();
        open(&mut state, BOB).unwrap();
        state
    }

    fn announce(state: &mut LedgerState, commitment: u8) -> HandlerResult<CallReceipt> {
        dispatch(
            state,
            &ctx(AUCTIONEER, 0),
            LedgerCall::AnnounceWinningCommitment {
                commitment: [commitment; 32],
            },
        )
    }

    fn withdraw(state: &mut LedgerState, address: Address) -> HandlerResult<CallReceipt> {
        dispatch(state, &ctx(address, 0), LedgerCall::WithdrawDeposit)
    }

    #[test]
    fn test_start_auction() {
        let mut state = LedgerState::new(AuctionGenesisConfig::default());

        let result = dispatch(&mut state, &ctx(AUCTIONEER, 10), LedgerCall::StartAuction);
        assert!(matches!(result, Err(LedgerError::DepositMismatch { required: 50, got: 10 })));

        dispatch(&mut state, &ctx(AUCTIONEER, DEPOSIT), LedgerCall::StartAuction).unwrap();
        assert_eq!(state.phase, AuctionPhase::BiddingOpen);
        assert!(state.is_auctioneer(&AUCTIONEER));
        assert_eq!(state.get_escrow(&AUCTIONEER), DEPOSIT);

        // Idempotent for the auctioneer, refused for anyone else
        dispatch(&mut state, &ctx(AUCTIONEER, 0), LedgerCall::StartAuction).unwrap();
        assert_eq!(state.get_escrow(&AUCTIONEER), DEPOSIT);
        assert!(matches!(
            dispatch(&mut state, &ctx(ALICE, DEPOSIT), LedgerCall::StartAuction),
            Err(LedgerError::NotAuthorized)
        ));

        place(&mut state, ALICE, 1).unwrap();
        assert!(matches!(
            dispatch(&mut state, &ctx(AUCTIONEER, 0), LedgerCall::StartAuction),
            Err(LedgerError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_place_bid_rules() {
        let mut state = LedgerState::new(AuctionGenesisConfig::default());
        assert!(matches!(
            place(&mut state, ALICE, 1),
            Err(LedgerError::InvalidPhase { .. })
        ));

        dispatch(&mut state, &ctx(AUCTIONEER, DEPOSIT), LedgerCall::StartAuction).unwrap();

        let short = dispatch(
            &mut state,
            &ctx(ALICE, DEPOSIT - 1),
            LedgerCall::PlaceBid {
                commitment: [1; 32],
                sig: vec![1],
            },
        );
        assert!(matches!(short, Err(LedgerError::DepositMismatch { .. })));
        assert!(state.get_bid(&ALICE).is_none());

        place(&mut state, ALICE, 1).unwrap();
        assert!(matches!(place(&mut state, ALICE, 2), Err(LedgerError::AlreadyBid)));
        assert!(matches!(
            place(&mut state, AUCTIONEER, 3),
            Err(LedgerError::NotAuthorized)
        ));
        assert_eq!(state.get_escrow(&ALICE), DEPOSIT);
    }

    #[test]
    fn test_bidder_limit() {
        let config = AuctionGenesisConfig {
            max_bidders: 1,
            ..Default::default()
        };
        let mut state = LedgerState::new(config);
        dispatch(&mut state, &ctx(AUCTIONEER, DEPOSIT), LedgerCall::StartAuction).unwrap();
        place(&mut state, ALICE, 1).unwrap();
        assert!(matches!(
            place(&mut state, BOB, 2),
            Err(LedgerError::TooManyBidders { max: 1 })
        ));
    }

    #[test]
    fn test_open_bid_closes_bidding() {
        let mut state = LedgerState::new(AuctionGenesisConfig::default());
        dispatch(&mut state, &ctx(AUCTIONEER, DEPOSIT), LedgerCall::StartAuction).unwrap();
        place(&mut state, ALICE, 1).unwrap();

        assert!(matches!(open(&mut state, BOB), Err(LedgerError::BidNotFound)));
        open(&mut state, ALICE).unwrap();
        assert_eq!(state.phase, AuctionPhase::Opening);
        assert!(matches!(open(&mut state, ALICE), Err(LedgerError::AlreadyOpened)));
        assert!(matches!(
            place(&mut state, BOB, 2),
            Err(LedgerError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_announce_rules() {
        let mut state = opened_state();
        assert!(matches!(
            dispatch(
                &mut state,
                &ctx(ALICE, 0),
                LedgerCall::AnnounceWinningCommitment { commitment: [0xA1; 32] }
            ),
            Err(LedgerError::NotAuthorized)
        ));
        assert!(matches!(
            announce(&mut state, 0x42),
            Err(LedgerError::UnknownCommitment)
        ));

        announce(&mut state, 0xA1).unwrap();
        assert_eq!(state.phase, AuctionPhase::WinnerAnnounced);
        assert_eq!(state.winning_commitment, Some([0xA1; 32]));
    }

    #[test]
    fn test_open_identity_only_by_winner() {
        let mut state = opened_state();
        announce(&mut state, 0xA1).unwrap();

        let call = LedgerCall::OpenIdentity {
            identity_token: vec![7; 4],
        };
        assert!(matches!(
            dispatch(&mut state, &ctx(BOB, 0), call.clone()),
            Err(LedgerError::NotWinner)
        ));
        dispatch(&mut state, &ctx(ALICE, 0), call).unwrap();
        assert_eq!(state.phase, AuctionPhase::IdentityOpened);
        assert_eq!(state.identity_token, Some(vec![7; 4]));
    }

    #[test]
    fn test_punish_forfeits_deposit() {
        let mut state = opened_state();

        assert!(matches!(
            dispatch(&mut state, &ctx(ALICE, 0), LedgerCall::PunishBidder { bidder: BOB }),
            Err(LedgerError::NotAuthorized)
        ));

        let receipt = dispatch(
            &mut state,
            &ctx(AUCTIONEER, 0),
            LedgerCall::PunishBidder { bidder: BOB },
        )
        .unwrap();
        assert_eq!(receipt, CallReceipt::Forfeited(DEPOSIT));
        assert_eq!(state.get_escrow(&BOB), 0);
        assert_eq!(state.get_escrow(&AUCTIONEER), 2 * DEPOSIT);

        assert!(matches!(
            dispatch(&mut state, &ctx(AUCTIONEER, 0), LedgerCall::PunishBidder { bidder: BOB }),
            Err(LedgerError::AlreadyPunished)
        ));

        // A punished bidder cannot win or withdraw
        assert!(matches!(announce(&mut state, 0xB0), Err(LedgerError::Punished)));
        announce(&mut state, 0xA1).unwrap();
        assert!(matches!(withdraw(&mut state, BOB), Err(LedgerError::Punished)));
    }

    #[test]
    fn test_withdraw_rules() {
        let mut state = opened_state();
        assert!(matches!(
            withdraw(&mut state, BOB),
            Err(LedgerError::InvalidPhase { .. })
        ));

        announce(&mut state, 0xA1).unwrap();
        // Losers may leave, the winner stays bonded
        assert_eq!(withdraw(&mut state, BOB).unwrap(), CallReceipt::Withdrawn(DEPOSIT));
        assert!(matches!(
            withdraw(&mut state, ALICE),
            Err(LedgerError::InvalidPhase { .. })
        ));
        assert!(matches!(
            withdraw(&mut state, BOB),
            Err(LedgerError::NothingToWithdraw)
        ));

        dispatch(
            &mut state,
            &ctx(ALICE, 0),
            LedgerCall::OpenIdentity {
                identity_token: vec![1],
            },
        )
        .unwrap();
        assert_eq!(withdraw(&mut state, ALICE).unwrap(), CallReceipt::Withdrawn(DEPOSIT));
        assert_eq!(
            withdraw(&mut state, AUCTIONEER).unwrap(),
            CallReceipt::Withdrawn(DEPOSIT)
        );
    }

    #[test]
    fn test_withdraw_waits_without_early_withdrawal() {
        let mut state = opened_state();
        state.config.early_withdrawal = false;
        announce(&mut state, 0xA1).unwrap();
        assert!(matches!(
            withdraw(&mut state, BOB),
            Err(LedgerError::InvalidPhase { .. })
        ));

        dispatch(&mut state, &ctx(AUCTIONEER, 0), LedgerCall::CloseAuction).unwrap();
        assert_eq!(withdraw(&mut state, BOB).unwrap(), CallReceipt::Withdrawn(DEPOSIT));
        assert!(matches!(
            dispatch(&mut state, &ctx(AUCTIONEER, 0), LedgerCall::CloseAuction),
            Err(LedgerError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_dispatch_encoded() {
        let mut state = LedgerState::new(AuctionGenesisConfig::default());
        let encoded = borsh::to_vec(&LedgerCall::StartAuction).unwrap();
        dispatch_encoded(&mut state, &ctx(AUCTIONEER, DEPOSIT), &encoded).unwrap();
        assert_eq!(state.phase, AuctionPhase::BiddingOpen);

        assert!(matches!(
            dispatch_encoded(&mut state, &ctx(AUCTIONEER, 0), &[0xFF, 0xFF]),
            Err(LedgerError::InvalidCall(_))
        ));
    }
}
