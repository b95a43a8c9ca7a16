use tracing::{info, instrument, warn};

use super::{required, required_amount, settle, LinkRewardParams, RewardService};
use crate::db::schemas::{RewardDoc, RewardReason};
use crate::types::{LedgerError, Result};

impl RewardService {
    /// Pay the owner of an invite link once the invited user has registered
    #[instrument(skip_all, fields(event_id = ?params.event_id))]
    pub async fn handle_link_reward(&self, params: LinkRewardParams) -> bool {
        let event_id = params.event_id.clone();
        settle("link", event_id.as_deref(), self.link_reward(params).await)
    }

    async fn link_reward(&self, params: LinkRewardParams) -> Result<bool> {
        let event_id = required("eventId", &params.event_id)?;
        let inviter_id = required("inviterUserId", &params.inviter_user_id)?;
        let sponsored_id = required("sponsoredUserId", &params.sponsored_user_id)?;
        let amount = required_amount(&params.amount)?;

        if inviter_id == sponsored_id {
            return Err(LedgerError::BadRequest("user cannot sponsor itself".into()));
        }

        if self.users.find_user(sponsored_id).await?.is_none() {
            info!(sponsored_user_id = %sponsored_id, "Sponsored user not registered, nothing owed");
            return Ok(true);
        }

        // Wallet and display attributes come from the profile, never the caller
        let Some(inviter) = self.users.find_user(inviter_id).await? else {
            info!(inviter_user_id = %inviter_id, "Inviter not resolvable, nothing owed");
            return Ok(true);
        };

        let reason = RewardReason::ReferralLink;
        let claimed = self
            .store
            .rewards_for_event(event_id, reason.as_str())
            .await?
            .into_iter()
            .find(|r| r.subject_user_id != inviter_id);
        if let Some(other) = claimed {
            warn!(
                inviter_user_id = %inviter_id,
                rewarded_user_id = %other.subject_user_id,
                "Event already rewards a different inviter"
            );
            return Ok(true);
        }

        let mut draft = RewardDoc::new(inviter_id, event_id, &reason, amount.as_str());
        draft.sponsored_user_id = Some(sponsored_id.to_string());
        draft.response_channel = params.response_channel.clone();
        draft.destination_wallet = inviter.wallet_address.clone();
        draft.display_handle = inviter.display_handle.clone();
        draft.display_name = inviter.display_name.clone();

        self.drive_reward(draft, inviter.wallet_address).await
    }
}
