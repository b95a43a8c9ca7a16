//! Variant resolvers
//!
//! Each public `handle_*` method decides whether and for whom an execution is
//! owed, loads or creates the matching ledger record, and hands it to the
//! [`LedgerDriver`]. Handlers never return errors: the boolean is the only
//! signal, `true` meaning "stop retrying".

mod isolated;
mod link;
mod params;
mod referral;
mod signup;
mod transfer;

pub use params::{
    IsolatedRewardParams, LinkRewardParams, ReferralRewardParams, SignupRewardParams,
    TransferParams,
};
pub use transfer::chain_name_for;

use tracing::{error, warn};

use crate::db::schemas::{RewardDoc, TransferDoc};
use crate::db::{SharedDirectory, SharedStore};
use crate::execution::ExecutionRequest;
use crate::ledger::{LedgerDriver, RewardKey};
use crate::types::{LedgerError, Result, TokenAmount};

/// Treasury-side settings shared by every reward
#[derive(Debug, Clone, Default)]
pub struct RewardSettings {
    /// Credential the execution service uses to sign treasury payouts
    pub treasury_auth_token: Option<String>,
    pub token_address: String,
    pub chain_name: String,
}

pub struct RewardService {
    store: SharedStore,
    users: SharedDirectory,
    driver: LedgerDriver,
    settings: RewardSettings,
}

impl RewardService {
    pub fn new(
        store: SharedStore,
        users: SharedDirectory,
        driver: LedgerDriver,
        settings: RewardSettings,
    ) -> Self {
        Self {
            store,
            users,
            driver,
            settings,
        }
    }

    /// Current reward record, if any
    pub async fn reward_status(&self, key: &RewardKey) -> Result<Option<RewardDoc>> {
        self.store.find_reward(key).await
    }

    /// Current transfer record, if any
    pub async fn transfer_status(&self, event_id: &str) -> Result<Option<TransferDoc>> {
        self.store.find_transfer(event_id).await
    }

    /// Load the reward for `draft`'s key, inserting `draft` when none exists,
    /// then advance it one step.
    ///
    /// `destination` overrides the stored wallet for this call only.
    async fn drive_reward(&self, draft: RewardDoc, destination: Option<String>) -> Result<bool> {
        let mut reward = match self.store.find_reward(&draft.reward_key()).await? {
            Some(existing) => existing,
            None => {
                let draft = self.denormalize(draft).await?;
                self.store.insert_reward(draft).await?
            }
        };

        let request = self.reward_request(&reward, destination);
        self.driver.advance(&mut reward, &request).await
    }

    /// Copy display attributes from the subject's profile onto a new record
    async fn denormalize(&self, mut draft: RewardDoc) -> Result<RewardDoc> {
        if draft.display_handle.is_some() && draft.display_name.is_some() {
            return Ok(draft);
        }

        if let Some(profile) = self.users.find_user(&draft.subject_user_id).await? {
            draft.display_handle = draft.display_handle.or(profile.display_handle);
            draft.display_name = draft.display_name.or(profile.display_name);
            if draft.destination_wallet.is_none() {
                draft.destination_wallet = profile.wallet_address;
            }
        }

        Ok(draft)
    }

    fn reward_request(&self, reward: &RewardDoc, destination: Option<String>) -> ExecutionRequest {
        ExecutionRequest {
            subject_id: reward.subject_user_id.clone(),
            destination_wallet: destination.or_else(|| reward.destination_wallet.clone()),
            amount: reward.amount.clone(),
            auth_token: self.settings.treasury_auth_token.clone(),
            token_address: self.settings.token_address.clone(),
            chain_name: self.settings.chain_name.clone(),
        }
    }
}

/// Borrow a required string field, rejecting absent or blank values
fn required<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LedgerError::MissingInput(name.to_string())),
    }
}

fn required_amount(value: &Option<String>) -> Result<TokenAmount> {
    TokenAmount::parse(required("amount", value)?)
}

/// Collapse a resolver result into the caller's retry signal
fn settle(handler: &str, event_id: Option<&str>, result: Result<bool>) -> bool {
    let event_id = event_id.unwrap_or("-");
    match result {
        Ok(handled) => handled,
        Err(e) if e.is_discardable() => {
            warn!(handler, event_id, error = %e, "Discarding event");
            true
        }
        Err(e) => {
            error!(handler, event_id, error = %e, "Handler failed, caller should retry");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_blank() {
        assert!(required("eventId", &None).is_err());
        assert!(required("eventId", &Some("  ".into())).is_err());
        assert_eq!(required("eventId", &Some("e1".into())).unwrap(), "e1");
    }

    #[test]
    fn test_required_amount() {
        assert!(required_amount(&Some("100".into())).is_ok());
        assert!(matches!(
            required_amount(&Some("0".into())),
            Err(LedgerError::BadRequest(_))
        ));
        assert!(matches!(
            required_amount(&None),
            Err(LedgerError::MissingInput(_))
        ));
    }

    #[test]
    fn test_settle_policy() {
        assert!(settle("signup", Some("e1"), Ok(true)));
        assert!(!settle("signup", Some("e1"), Ok(false)));
        assert!(settle(
            "signup",
            None,
            Err(LedgerError::MissingInput("eventId".into()))
        ));
        assert!(!settle(
            "signup",
            Some("e1"),
            Err(LedgerError::Database("timeout".into()))
        ));
    }
}
