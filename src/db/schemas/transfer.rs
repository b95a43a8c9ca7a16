//! Transfer document schema
//!
//! Peer-to-peer payments, one document per `event_id`.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::ledger::{EntryKind, ExecutionStatus, LedgerEntry, LedgerKey, Progress};
use crate::notify::TrackEvent;

/// Collection name for transfers
pub const TRANSFER_COLLECTION: &str = "transfers";

/// Transfer document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TransferDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Caller-supplied idempotency key
    pub event_id: String,

    #[serde(default)]
    pub sender_user_id: String,

    #[serde(default)]
    pub recipient_user_id: String,

    /// Decimal-string token quantity
    #[serde(default)]
    pub amount: String,

    #[serde(default)]
    pub chain_id: u64,

    #[serde(default)]
    pub token_address: String,

    #[serde(default)]
    pub status: ExecutionStatus,

    #[serde(default)]
    pub transaction_hash: Option<String>,

    #[serde(default)]
    pub user_op_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_wallet: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_channel: Option<String>,

    /// Sender's handle at creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_handle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl TransferDoc {
    /// Create a new pending transfer document
    pub fn new(
        event_id: impl Into<String>,
        sender_user_id: impl Into<String>,
        recipient_user_id: impl Into<String>,
        amount: impl Into<String>,
        chain_id: u64,
        token_address: impl Into<String>,
    ) -> Self {
        Self {
            metadata: Metadata::new(),
            event_id: event_id.into(),
            sender_user_id: sender_user_id.into(),
            recipient_user_id: recipient_user_id.into(),
            amount: amount.into(),
            chain_id,
            token_address: token_address.into(),
            ..Default::default()
        }
    }
}

impl LedgerEntry for TransferDoc {
    const KIND: EntryKind = EntryKind::Transfer;

    fn key(&self) -> LedgerKey {
        LedgerKey::Transfer {
            event_id: self.event_id.clone(),
        }
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
            "senderUserId": self.sender_user_id,
            "recipientUserId": self.recipient_user_id,
            "amount": self.amount,
            "chainId": self.chain_id,
            "tokenAddress": self.token_address,
            "status": self.status,
            "transactionHash": self.transaction_hash,
            "userOpHash": self.user_op_hash,
            "destinationWallet": self.destination_wallet,
            "responseChannel": self.response_channel,
            "displayHandle": self.display_handle,
            "displayName": self.display_name,
            "createdAt": self.metadata.created_at_utc().map(|d| d.to_rfc3339()),
        })
    }

    fn track_event(&self) -> Option<TrackEvent> {
        Some(TrackEvent {
            user_id: self.sender_user_id.clone(),
            event: "Token Transfer Completed".to_string(),
            properties: json!({
                "eventId": self.event_id,
                "recipientUserId": self.recipient_user_id,
                "amount": self.amount,
                "chainId": self.chain_id,
                "tokenAddress": self.token_address,
                "transactionHash": self.transaction_hash,
            }),
        })
    }
}

impl IntoIndexes for TransferDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One transfer per event
            (
                doc! { "event_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("transfer_event_unique".to_string())
                        .build(),
                ),
            ),
            // Referral scan: transfers received by a user, oldest first
            (
                doc! { "recipient_user_id": 1, "metadata.created_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("transfer_recipient_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for TransferDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
