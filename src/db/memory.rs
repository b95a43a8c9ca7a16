//! In-memory ledger store
//!
//! Same semantics as the MongoDB store (unique keys, open-only progress
//! writes, insertion-ordered scans). Used in dev mode and by tests.

use bson::{oid::ObjectId, DateTime};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::mongo::MutMetadata;
use crate::db::schemas::{Metadata, RewardDoc, TransferDoc, UserProfile};
use crate::db::store::{LedgerStore, UserDirectory};
use crate::ledger::{LedgerEntry, LedgerKey, Progress, RewardKey};
use crate::types::Result;

/// Simple in-memory store for rewards, transfers and user profiles
#[derive(Default)]
pub struct InMemoryLedgerStore {
    rewards: RwLock<Vec<RewardDoc>>,
    transfers: RwLock<Vec<TransferDoc>>,
    users: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reward exactly as given, metadata included
    pub async fn seed_reward(&self, mut doc: RewardDoc) {
        doc._id.get_or_insert_with(ObjectId::new);
        self.rewards.write().await.push(doc);
    }

    /// Store a transfer exactly as given, metadata included
    pub async fn seed_transfer(&self, mut doc: TransferDoc) {
        doc._id.get_or_insert_with(ObjectId::new);
        self.transfers.write().await.push(doc);
    }

    pub async fn upsert_user(&self, profile: UserProfile) {
        self.users
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }

    /// Snapshot of all rewards in insertion order
    pub async fn rewards(&self) -> Vec<RewardDoc> {
        self.rewards.read().await.clone()
    }

    /// Snapshot of all transfers in insertion order
    pub async fn transfers(&self) -> Vec<TransferDoc> {
        self.transfers.read().await.clone()
    }
}

fn stamp(metadata: &mut Metadata) {
    let now = DateTime::now();
    metadata.is_deleted = false;
    metadata.created_at = Some(now);
    metadata.updated_at = Some(now);
}

fn write_progress<E: LedgerEntry + MutMetadata>(entry: &mut E, progress: &Progress) -> bool {
    if entry.progress().status.is_terminal() {
        return false;
    }
    entry.set_progress(progress);
    entry.mut_metadata().updated_at = Some(DateTime::now());
    true
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_reward(&self, key: &RewardKey) -> Result<Option<RewardDoc>> {
        Ok(self
            .rewards
            .read()
            .await
            .iter()
            .find(|r| !r.metadata.is_deleted && r.reward_key() == *key)
            .cloned())
    }

    async fn insert_reward(&self, mut doc: RewardDoc) -> Result<RewardDoc> {
        let mut rewards = self.rewards.write().await;
        let key = doc.reward_key();

        if let Some(existing) = rewards.iter().find(|r| r.reward_key() == key) {
            return Ok(existing.clone());
        }

        doc._id = Some(ObjectId::new());
        stamp(&mut doc.metadata);
        rewards.push(doc.clone());
        Ok(doc)
    }

    async fn rewards_for_parent_transfer(
        &self,
        subject_user_id: &str,
        reason: &str,
        parent_transfer_hash: &str,
    ) -> Result<Vec<RewardDoc>> {
        Ok(self
            .rewards
            .read()
            .await
            .iter()
            .filter(|r| {
                !r.metadata.is_deleted
                    && r.subject_user_id == subject_user_id
                    && r.reason == reason
                    && r.parent_transfer_hash.as_deref() == Some(parent_transfer_hash)
            })
            .cloned()
            .collect())
    }

    async fn rewards_for_event(&self, event_id: &str, reason: &str) -> Result<Vec<RewardDoc>> {
        Ok(self
            .rewards
            .read()
            .await
            .iter()
            .filter(|r| !r.metadata.is_deleted && r.event_id == event_id && r.reason == reason)
            .cloned()
            .collect())
    }

    async fn find_transfer(&self, event_id: &str) -> Result<Option<TransferDoc>> {
        Ok(self
            .transfers
            .read()
            .await
            .iter()
            .find(|t| !t.metadata.is_deleted && t.event_id == event_id)
            .cloned())
    }

    async fn insert_transfer(&self, mut doc: TransferDoc) -> Result<TransferDoc> {
        let mut transfers = self.transfers.write().await;

        if let Some(existing) = transfers.iter().find(|t| t.event_id == doc.event_id) {
            return Ok(existing.clone());
        }

        doc._id = Some(ObjectId::new());
        stamp(&mut doc.metadata);
        transfers.push(doc.clone());
        Ok(doc)
    }

    async fn transfers_to(&self, recipient_user_id: &str) -> Result<Vec<TransferDoc>> {
        let mut matching: Vec<TransferDoc> = self
            .transfers
            .read()
            .await
            .iter()
            .filter(|t| !t.metadata.is_deleted && t.recipient_user_id == recipient_user_id)
            .cloned()
            .collect();

        // Stable: equal timestamps keep insertion order
        matching.sort_by_key(|t| t.metadata.created_at);
        Ok(matching)
    }

    async fn save_progress(&self, key: &LedgerKey, progress: &Progress) -> Result<bool> {
        match key {
            LedgerKey::Reward(reward_key) => {
                let mut rewards = self.rewards.write().await;
                match rewards.iter_mut().find(|r| r.reward_key() == *reward_key) {
                    Some(doc) => Ok(write_progress(doc, progress)),
                    None => {
                        let mut doc = RewardDoc {
                            event_id: reward_key.event_id.clone(),
                            subject_user_id: reward_key.subject_user_id.clone(),
                            reason: reward_key.reason.clone(),
                            _id: Some(ObjectId::new()),
                            ..Default::default()
                        };
                        doc.set_progress(progress);
                        doc.metadata = progress
                            .created_at
                            .map(Metadata::created)
                            .unwrap_or_else(Metadata::new);
                        rewards.push(doc);
                        Ok(true)
                    }
                }
            }
            LedgerKey::Transfer { event_id } => {
                let mut transfers = self.transfers.write().await;
                match transfers.iter_mut().find(|t| t.event_id == *event_id) {
                    Some(doc) => Ok(write_progress(doc, progress)),
                    None => {
                        let mut doc = TransferDoc {
                            event_id: event_id.clone(),
                            _id: Some(ObjectId::new()),
                            ..Default::default()
                        };
                        doc.set_progress(progress);
                        doc.metadata = progress
                            .created_at
                            .map(Metadata::created)
                            .unwrap_or_else(Metadata::new);
                        transfers.push(doc);
                        Ok(true)
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryLedgerStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::RewardReason;
    use crate::ledger::ExecutionStatus;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_insert_is_idempotent_per_key() {
        let store = InMemoryLedgerStore::new();
        let first = store
            .insert_reward(RewardDoc::new("u1", "e1", &RewardReason::SignUp, "100"))
            .await
            .unwrap();
        let second = store
            .insert_reward(RewardDoc::new("u1", "e1", &RewardReason::SignUp, "999"))
            .await
            .unwrap();

        assert_eq!(first._id, second._id);
        assert_eq!(second.amount, "100");
        assert_eq!(store.rewards().await.len(), 1);
    }

    #[tokio::test]
    async fn test_progress_refused_on_terminal_record() {
        let store = InMemoryLedgerStore::new();
        let mut doc = RewardDoc::new("u1", "e1", &RewardReason::SignUp, "100");
        doc.status = ExecutionStatus::Success;
        doc.transaction_hash = Some("0xabc".into());
        store.seed_reward(doc.clone()).await;

        let written = store
            .save_progress(
                &doc.key(),
                &Progress {
                    status: ExecutionStatus::Failure,
                    ..doc.progress()
                },
            )
            .await
            .unwrap();

        assert!(!written);
        let stored = store.find_reward(&doc.reward_key()).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_progress_keeps_created_at() {
        let store = InMemoryLedgerStore::new();
        let created = Utc::now() - Duration::minutes(3);
        let mut doc = RewardDoc::new("u1", "e1", &RewardReason::SignUp, "100");
        doc.metadata = Metadata::created(created);
        store.seed_reward(doc.clone()).await;

        let next = Progress {
            status: ExecutionStatus::PendingHash,
            provisional_handle: Some("op1".into()),
            ..doc.progress()
        };
        assert!(store.save_progress(&doc.key(), &next).await.unwrap());

        let stored = store.find_reward(&doc.reward_key()).await.unwrap().unwrap();
        assert_eq!(stored.metadata.created_at, doc.metadata.created_at);
        assert_eq!(stored.user_op_hash.as_deref(), Some("op1"));
    }

    #[tokio::test]
    async fn test_transfers_sorted_oldest_first_stable() {
        let store = InMemoryLedgerStore::new();
        let base = Utc::now() - Duration::hours(1);

        let mut late = TransferDoc::new("t-late", "carol", "newbie", "1", 1, "0xt");
        late.metadata = Metadata::created(base + Duration::minutes(10));
        let mut tie_a = TransferDoc::new("t-a", "alice", "newbie", "1", 1, "0xt");
        tie_a.metadata = Metadata::created(base);
        let mut tie_b = TransferDoc::new("t-b", "bob", "newbie", "1", 1, "0xt");
        tie_b.metadata = Metadata::created(base);
        let other = TransferDoc::new("t-x", "alice", "someone-else", "1", 1, "0xt");

        for doc in [late, tie_a, tie_b, other] {
            store.seed_transfer(doc).await;
        }

        let ids: Vec<String> = store
            .transfers_to("newbie")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.event_id)
            .collect();
        assert_eq!(ids, vec!["t-a", "t-b", "t-late"]);
    }
}
