//! Shared types

mod amount;
mod error;

pub use amount::TokenAmount;
pub use error::{LedgerError, Result};
