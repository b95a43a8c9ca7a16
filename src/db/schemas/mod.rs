//! Database schemas for the reward ledger
//!
//! Defines MongoDB document structures for rewards, transfers, and the user
//! profiles the resolvers read.

mod metadata;
mod reward;
mod transfer;
mod user;

pub use metadata::Metadata;
pub use reward::{RewardDoc, RewardReason, REWARD_COLLECTION};
pub use transfer::{TransferDoc, TRANSFER_COLLECTION};
pub use user::{UserProfile, USER_COLLECTION};
