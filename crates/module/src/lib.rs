//! Reference bulletin board for anonymous sealed-bid auctions.
//!
//! This module implements the public ledger one auction round publishes to:
//!
//! - Round start by the auctioneer, with a deposit
//! - Publication of bids, opening tokens and the winner's identity token
//! - Announcement of the winning commitment
//! - Deposit forfeiture and withdrawal
//!
//! The ledger never inspects cryptographic content. It only enforces who
//! may publish what, in which phase, and where deposits go.
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Publication and deposit rules for each call
//! - `queries`: Read-only state access
//! - `state`: Round state
//! - `genesis`: Round configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{handlers, CallContext, LedgerCall, LedgerState};
//!
//! let mut state = LedgerState::new(Default::default());
//! let ctx = CallContext::new(auctioneer, 50);
//! handlers::dispatch(&mut state, &ctx, LedgerCall::StartAuction)?;
//! ```

pub mod call;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod state;

pub use call::LedgerCall;
pub use error::LedgerError;
pub use genesis::{AuctionGenesisConfig, GenesisValidationError};
pub use handlers::{CallContext, CallReceipt, HandlerResult};
pub use queries::{LedgerQuery, LedgerQueryResponse};
pub use state::{BidRecord, LedgerState};
