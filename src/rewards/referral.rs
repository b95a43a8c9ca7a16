use tracing::{debug, info, instrument};

use super::{required, required_amount, settle, ReferralRewardParams, RewardService};
use crate::db::schemas::{RewardDoc, RewardReason, UserProfile};
use crate::ledger::{ExecutionStatus, RewardKey};
use crate::types::Result;

impl RewardService {
    /// Pay the user who first sent tokens to a newly registered user
    ///
    /// Only the earliest qualifying sender is rewarded per event. Records
    /// for other senders are left as they are.
    #[instrument(skip_all, fields(event_id = ?params.event_id))]
    pub async fn handle_referral_reward(&self, params: ReferralRewardParams) -> bool {
        let event_id = params.event_id.clone();
        settle("referral", event_id.as_deref(), self.referral_reward(params).await)
    }

    async fn referral_reward(&self, params: ReferralRewardParams) -> Result<bool> {
        let event_id = required("eventId", &params.event_id)?;
        let new_user_id = required("newUserId", &params.new_user_id)?;
        let amount = required_amount(&params.amount)?;

        let Some((parent_hash, referent)) = self.select_referent(new_user_id).await? else {
            info!(new_user_id = %new_user_id, "No qualifying transfer, nothing owed");
            return Ok(true);
        };

        let reason = RewardReason::Referral;
        let key = RewardKey::new(&referent.user_id, event_id, reason.as_str());
        if let Some(existing) = self.store.find_reward(&key).await? {
            if existing.status == ExecutionStatus::Success {
                debug!(referent = %referent.user_id, "Referral already paid");
                return Ok(true);
            }
        }

        let already_rewarded = self
            .store
            .rewards_for_parent_transfer(&referent.user_id, reason.as_str(), &parent_hash)
            .await?
            .iter()
            .any(|r| r.event_id != event_id && r.status != ExecutionStatus::Failure);
        if already_rewarded {
            info!(
                referent = %referent.user_id,
                parent_transfer_hash = %parent_hash,
                "Parent transfer already rewarded by another event"
            );
            return Ok(true);
        }

        let referred_address = self
            .users
            .find_user(new_user_id)
            .await?
            .and_then(|u| u.wallet_address);

        let mut draft = RewardDoc::new(&referent.user_id, event_id, &reason, amount.as_str());
        draft.parent_transfer_hash = Some(parent_hash);
        draft.referred_user_address = referred_address;
        draft.response_channel = params.response_channel.clone();
        draft.destination_wallet = referent.wallet_address.clone();
        draft.display_handle = referent.display_handle.clone();
        draft.display_name = referent.display_name.clone();

        self.drive_reward(draft, None).await
    }

    /// Hash of the earliest settled transfer to `new_user_id` whose sender
    /// resolves to a known user, together with that sender's profile
    async fn select_referent(&self, new_user_id: &str) -> Result<Option<(String, UserProfile)>> {
        // Oldest first, ties in insertion order
        let transfers = self.store.transfers_to(new_user_id).await?;

        for transfer in transfers {
            let Some(hash) = transfer.transaction_hash else {
                continue;
            };
            if transfer.sender_user_id == new_user_id {
                continue;
            }
            match self.users.find_user(&transfer.sender_user_id).await? {
                Some(sender) => return Ok(Some((hash, sender))),
                None => debug!(sender = %transfer.sender_user_id, "Skipping unresolvable sender"),
            }
        }

        Ok(None)
    }
}
