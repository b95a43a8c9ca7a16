//! Reward ledger - exactly-once token rewards and transfers
//!
//! Product events (signup, referral, invite link, promotion, peer transfer)
//! each owe at most one on-chain token movement. The ledger records every
//! event in MongoDB and drives an asynchronous wallet-execution service until
//! the movement is confirmed or definitively failed, however many times the
//! caller re-delivers the event.
//!
//! ## Layout
//!
//! - **ledger**: the state machine (pure transition table plus the driver)
//! - **rewards**: variant resolvers deciding whether and for whom a payout is owed
//! - **execution**: client for the wallet-execution service
//! - **notify**: webhook and analytics side effects on success
//! - **db**: MongoDB persistence and an in-memory store
//! - **nats**: request/reply intake for the binary

pub mod config;
pub mod db;
pub mod execution;
pub mod ledger;
pub mod nats;
pub mod notify;
pub mod rewards;
pub mod types;

pub use config::Args;
pub use rewards::RewardService;
pub use types::{LedgerError, Result};
