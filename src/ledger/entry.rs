//! The seam between persisted documents and the generic driver

use serde::{Deserialize, Serialize};
use std::fmt;

use super::status::Progress;
use crate::notify::TrackEvent;

/// Which collection an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Reward,
    Transfer,
}

impl EntryKind {
    /// Event name sent with the success webhook
    pub fn success_event(&self) -> &'static str {
        match self {
            Self::Reward => "reward.success",
            Self::Transfer => "transfer.success",
        }
    }
}

/// Idempotency key of a reward: one record per triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardKey {
    pub subject_user_id: String,
    pub event_id: String,
    pub reason: String,
}

impl RewardKey {
    pub fn new(
        subject_user_id: impl Into<String>,
        event_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            subject_user_id: subject_user_id.into(),
            event_id: event_id.into(),
            reason: reason.into(),
        }
    }
}

/// Key addressing any ledger record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerKey {
    Reward(RewardKey),
    Transfer { event_id: String },
}

impl LedgerKey {
    pub fn event_id(&self) -> &str {
        match self {
            Self::Reward(key) => &key.event_id,
            Self::Transfer { event_id } => event_id,
        }
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reward(key) => write!(
                f,
                "reward({}, {}, {})",
                key.subject_user_id, key.event_id, key.reason
            ),
            Self::Transfer { event_id } => write!(f, "transfer({})", event_id),
        }
    }
}

/// A persisted record the driver can advance
pub trait LedgerEntry: Send + Sync {
    const KIND: EntryKind;

    fn key(&self) -> LedgerKey;

    fn progress(&self) -> Progress;

    /// Copy state-machine fields back into the document
    fn set_progress(&mut self, progress: &Progress);

    /// Full denormalized record for the success webhook
    fn notification(&self) -> serde_json::Value;

    /// Analytics event fired alongside the webhook, if any
    fn track_event(&self) -> Option<TrackEvent> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = LedgerKey::Reward(RewardKey::new("u1", "e1", "user_sign_up"));
        assert_eq!(key.to_string(), "reward(u1, e1, user_sign_up)");
        assert_eq!(key.event_id(), "e1");

        let key = LedgerKey::Transfer {
            event_id: "t1".into(),
        };
        assert_eq!(key.to_string(), "transfer(t1)");
    }
}
