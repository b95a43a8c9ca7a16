//! Idempotent execution state machine
//!
//! - [`status`]: persisted status and the progress snapshot
//! - [`machine`]: pure transition table
//! - [`entry`]: the trait documents implement to be driven
//! - [`driver`]: runs one step with I/O

pub mod driver;
pub mod entry;
pub mod machine;
pub mod status;

pub use driver::{Clock, LedgerDriver};
pub use entry::{EntryKind, LedgerEntry, LedgerKey, RewardKey};
pub use machine::{Outcome, Plan, Transition, DEFAULT_PENDING_HASH_TIMEOUT_SECS};
pub use status::{ExecutionStatus, Progress};
