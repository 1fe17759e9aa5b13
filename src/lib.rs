//! Consensus betting settlement engine of a proof-of-stake sports-betting
//! chain.
//!
//! The engine is a deterministic replay function over typed betting
//! transactions: ingest applies a confirmed block's mutations to the
//! betting store and records undo entries, the payout engine derives the
//! exact output vector the next block must commit to, and the undo
//! protocol inverts a block bit-for-bit on reorganization. Every entry
//! point takes the store explicitly; there are no globals, no wall-clock
//! reads and no floating point anywhere near consensus.

pub mod codec;
pub mod constants;
pub mod error;
pub mod games;
pub mod ingest;
pub mod params;
pub mod payout;
pub mod query;
pub mod state;
pub mod store;
pub mod tx;
pub mod types;
pub mod undo;
pub mod utils;

pub use error::{BettingError, Result};
pub use ingest::{check_betting_tx, process_betting_tx, process_block};
pub use params::ChainParams;
pub use payout::{get_betting_payouts, is_block_payouts_valid};
pub use store::BettingStore;
pub use undo::betting_undo;
