//! Ledger persistence traits and the MongoDB implementation
//!
//! Every write is addressed by the record's idempotency key. Progress writes
//! only match records that are still open, so a terminal record can never be
//! moved back by a late or concurrent invocation.

use bson::{doc, DateTime, Document};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    RewardDoc, TransferDoc, UserProfile, REWARD_COLLECTION, TRANSFER_COLLECTION, USER_COLLECTION,
};
use crate::ledger::{ExecutionStatus, LedgerKey, Progress, RewardKey};
use crate::types::{LedgerError, Result};

/// Persistence for rewards and transfers (allows swapping backends)
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_reward(&self, key: &RewardKey) -> Result<Option<RewardDoc>>;

    /// Insert a pending reward; if another invocation won the race, return theirs
    async fn insert_reward(&self, doc: RewardDoc) -> Result<RewardDoc>;

    /// Rewards of one reason for one subject that cite a parent transfer
    async fn rewards_for_parent_transfer(
        &self,
        subject_user_id: &str,
        reason: &str,
        parent_transfer_hash: &str,
    ) -> Result<Vec<RewardDoc>>;

    /// Rewards of one reason recorded for an event, any subject
    async fn rewards_for_event(&self, event_id: &str, reason: &str) -> Result<Vec<RewardDoc>>;

    async fn find_transfer(&self, event_id: &str) -> Result<Option<TransferDoc>>;

    /// Insert a pending transfer; if another invocation won the race, return theirs
    async fn insert_transfer(&self, doc: TransferDoc) -> Result<TransferDoc>;

    /// Transfers received by a user, oldest first, ties in insertion order
    async fn transfers_to(&self, recipient_user_id: &str) -> Result<Vec<TransferDoc>>;

    /// Write state-machine fields. Returns `false` when the record was
    /// already terminal and the write was refused.
    async fn save_progress(&self, key: &LedgerKey, progress: &Progress) -> Result<bool>;
}

/// Read access to user profiles
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>>;
}

/// Filter matching exactly one record by idempotency key
pub fn key_filter(key: &LedgerKey) -> Document {
    match key {
        LedgerKey::Reward(key) => reward_filter(key),
        LedgerKey::Transfer { event_id } => doc! { "event_id": event_id },
    }
}

fn reward_filter(key: &RewardKey) -> Document {
    doc! {
        "subject_user_id": &key.subject_user_id,
        "event_id": &key.event_id,
        "reason": &key.reason,
    }
}

/// Update document for a progress write. `created_at` is only ever set when
/// the upsert inserts.
pub fn progress_update(progress: &Progress) -> Document {
    let now = DateTime::now();
    let created_at = progress.created_at.map(DateTime::from_chrono).unwrap_or(now);

    doc! {
        "$set": {
            "status": progress.status.as_str(),
            "transaction_hash": progress.final_handle.clone(),
            "user_op_hash": progress.provisional_handle.clone(),
            "metadata.updated_at": now,
        },
        "$setOnInsert": {
            "metadata.created_at": created_at,
            "metadata.is_deleted": false,
        }
    }
}

/// MongoDB-backed ledger store
#[derive(Clone)]
pub struct MongoLedgerStore {
    rewards: MongoCollection<RewardDoc>,
    transfers: MongoCollection<TransferDoc>,
}

impl MongoLedgerStore {
    /// Open the collections and apply their indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            rewards: mongo.collection(REWARD_COLLECTION).await?,
            transfers: mongo.collection(TRANSFER_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl LedgerStore for MongoLedgerStore {
    async fn find_reward(&self, key: &RewardKey) -> Result<Option<RewardDoc>> {
        self.rewards.find_one(reward_filter(key)).await
    }

    async fn insert_reward(&self, doc: RewardDoc) -> Result<RewardDoc> {
        let key = doc.reward_key();

        match self.rewards.insert_one(doc).await {
            Ok((id, mut stored)) => {
                stored._id = id.as_object_id();
                Ok(stored)
            }
            Err(LedgerError::Duplicate(_)) => {
                debug!(event_id = %key.event_id, "Reward inserted concurrently, loading it");
                self.find_reward(&key).await?.ok_or_else(|| {
                    LedgerError::Database(format!("Reward {} vanished after conflict", key.event_id))
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn rewards_for_parent_transfer(
        &self,
        subject_user_id: &str,
        reason: &str,
        parent_transfer_hash: &str,
    ) -> Result<Vec<RewardDoc>> {
        self.rewards
            .find_many(
                doc! {
                    "subject_user_id": subject_user_id,
                    "reason": reason,
                    "parent_transfer_hash": parent_transfer_hash,
                },
                doc! { "_id": 1 },
            )
            .await
    }

    async fn rewards_for_event(&self, event_id: &str, reason: &str) -> Result<Vec<RewardDoc>> {
        self.rewards
            .find_many(
                doc! { "event_id": event_id, "reason": reason },
                doc! { "_id": 1 },
            )
            .await
    }

    async fn find_transfer(&self, event_id: &str) -> Result<Option<TransferDoc>> {
        self.transfers.find_one(doc! { "event_id": event_id }).await
    }

    async fn insert_transfer(&self, doc: TransferDoc) -> Result<TransferDoc> {
        let event_id = doc.event_id.clone();

        match self.transfers.insert_one(doc).await {
            Ok((id, mut stored)) => {
                stored._id = id.as_object_id();
                Ok(stored)
            }
            Err(LedgerError::Duplicate(_)) => {
                debug!(event_id = %event_id, "Transfer inserted concurrently, loading it");
                self.find_transfer(&event_id).await?.ok_or_else(|| {
                    LedgerError::Database(format!("Transfer {} vanished after conflict", event_id))
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn transfers_to(&self, recipient_user_id: &str) -> Result<Vec<TransferDoc>> {
        self.transfers
            .find_many(
                doc! { "recipient_user_id": recipient_user_id },
                doc! { "metadata.created_at": 1, "_id": 1 },
            )
            .await
    }

    async fn save_progress(&self, key: &LedgerKey, progress: &Progress) -> Result<bool> {
        let mut filter = key_filter(key);
        filter.insert(
            "status",
            doc! { "$in": ExecutionStatus::open_states().to_vec() },
        );

        let update = progress_update(progress);

        let result = match key {
            LedgerKey::Reward(_) => self.rewards.upsert_one(filter, update).await,
            LedgerKey::Transfer { .. } => self.transfers.upsert_one(filter, update).await,
        };

        match result {
            Ok(_) => Ok(true),
            // The only document with this key is terminal, the unique index refused the upsert
            Err(LedgerError::Duplicate(_)) => {
                warn!(key = %key, status = %progress.status, "Refused progress write on terminal record");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// MongoDB-backed user directory
#[derive(Clone)]
pub struct MongoUserDirectory {
    users: MongoCollection<UserProfile>,
}

impl MongoUserDirectory {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: mongo.collection(USER_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl UserDirectory for MongoUserDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.users.find_one(doc! { "user_id": user_id }).await
    }
}

/// Shared handles passed into the services
pub type SharedStore = Arc<dyn LedgerStore>;
pub type SharedDirectory = Arc<dyn UserDirectory>;
