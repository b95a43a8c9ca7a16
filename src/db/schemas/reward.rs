//! Reward document schema
//!
//! One document per `(subject_user_id, event_id, reason)`.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::ledger::{EntryKind, ExecutionStatus, LedgerEntry, LedgerKey, Progress, RewardKey};

/// Collection name for rewards
pub const REWARD_COLLECTION: &str = "rewards";

/// Why a reward is owed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RewardReason {
    SignUp,
    /// Referral payout to the first sender who introduced a new user
    Referral,
    /// Payout to the inviter behind an invite link
    ReferralLink,
    /// Free-form promotional payout
    Isolated(String),
}

impl RewardReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SignUp => "user_sign_up",
            Self::Referral => "2x_reward",
            Self::ReferralLink => "referral_link",
            Self::Isolated(reason) => reason,
        }
    }
}

impl From<&str> for RewardReason {
    fn from(value: &str) -> Self {
        match value {
            "user_sign_up" => Self::SignUp,
            "2x_reward" => Self::Referral,
            "referral_link" => Self::ReferralLink,
            other => Self::Isolated(other.to_string()),
        }
    }
}

impl fmt::Display for RewardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reward document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RewardDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Caller-supplied idempotency key
    pub event_id: String,

    /// User being paid
    pub subject_user_id: String,

    /// Reason tag, see [`RewardReason`]
    pub reason: String,

    /// Decimal-string token quantity
    #[serde(default)]
    pub amount: String,

    #[serde(default)]
    pub status: ExecutionStatus,

    /// Final handle from the execution service
    #[serde(default)]
    pub transaction_hash: Option<String>,

    /// Provisional handle from the execution service
    #[serde(default)]
    pub user_op_hash: Option<String>,

    /// Transfer that earned a referral payout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_transfer_hash: Option<String>,

    /// Wallet of the user whose arrival earned a referral payout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_user_address: Option<String>,

    /// User who joined through an invite link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsored_user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_wallet: Option<String>,

    /// Where the caller wants confirmations delivered (stored only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_channel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_handle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl RewardDoc {
    /// Create a new pending reward document
    pub fn new(
        subject_user_id: impl Into<String>,
        event_id: impl Into<String>,
        reason: &RewardReason,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            metadata: Metadata::new(),
            event_id: event_id.into(),
            subject_user_id: subject_user_id.into(),
            reason: reason.as_str().to_string(),
            amount: amount.into(),
            ..Default::default()
        }
    }

    pub fn reward_key(&self) -> RewardKey {
        RewardKey::new(&self.subject_user_id, &self.event_id, &self.reason)
    }
}

impl LedgerEntry for RewardDoc {
    const KIND: EntryKind = EntryKind::Reward;

    fn key(&self) -> LedgerKey {
        LedgerKey::Reward(self.reward_key())
    }

    fn progress(&self) -> Progress {
        Progress {
            status: self.status,
            final_handle: self.transaction_hash.clone(),
            provisional_handle: self.user_op_hash.clone(),
            created_at: self.metadata.created_at_utc(),
        }
    }

    fn set_progress(&mut self, progress: &Progress) {
        self.status = progress.status;
        self.transaction_hash = progress.final_handle.clone();
        self.user_op_hash = progress.provisional_handle.clone();
    }

    fn notification(&self) -> serde_json::Value {
        json!({
            "eventId": self.event_id,
            "subjectUserId": self.subject_user_id,
            "reason": self.reason,
            "amount": self.amount,
            "status": self.status,
            "transactionHash": self.transaction_hash,
            "userOpHash": self.user_op_hash,
            "parentTransferHash": self.parent_transfer_hash,
            "referredUserAddress": self.referred_user_address,
            "sponsoredUserId": self.sponsored_user_id,
            "destinationWallet": self.destination_wallet,
            "responseChannel": self.response_channel,
            "displayHandle": self.display_handle,
            "displayName": self.display_name,
            "createdAt": self.metadata.created_at_utc().map(|d| d.to_rfc3339()),
        })
    }
}

impl IntoIndexes for RewardDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One reward per subject, event and reason
            (
                doc! { "subject_user_id": 1, "event_id": 1, "reason": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("reward_key_unique".to_string())
                        .build(),
                ),
            ),
            // Referral dedupe by parent transfer
            (
                doc! { "subject_user_id": 1, "reason": 1, "parent_transfer_hash": 1 },
                Some(
                    IndexOptions::builder()
                        .name("reward_parent_transfer_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "event_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("reward_event_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for RewardDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
