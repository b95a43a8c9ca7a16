//! Execution status and progress snapshot shared by rewards and transfers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one execution
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Owed, nothing dispatched yet (or the last attempt left no handle)
    #[default]
    Pending,
    /// Dispatched, waiting for the provisional handle to resolve
    PendingHash,
    Success,
    Failure,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingHash => "pending_hash",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Status strings a progress write is allowed to overwrite
    pub fn open_states() -> [&'static str; 2] {
        [Self::Pending.as_str(), Self::PendingHash.as_str()]
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state-machine view of a ledger record
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub status: ExecutionStatus,
    /// Confirmed transaction hash
    pub final_handle: Option<String>,
    /// Operation handle returned before confirmation
    pub provisional_handle: Option<String>,
    /// When the record was first inserted
    pub created_at: Option<DateTime<Utc>>,
}

impl Progress {
    pub fn pending(created_at: DateTime<Utc>) -> Self {
        Self {
            status: ExecutionStatus::Pending,
            final_handle: None,
            provisional_handle: None,
            created_at: Some(created_at),
        }
    }
}
