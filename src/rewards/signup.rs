use tracing::instrument;

use super::{required, required_amount, settle, RewardService, SignupRewardParams};
use crate::db::schemas::{RewardDoc, RewardReason};
use crate::types::Result;

impl RewardService {
    /// Pay the welcome reward for a new account
    #[instrument(skip_all, fields(event_id = ?params.event_id))]
    pub async fn handle_signup_reward(&self, params: SignupRewardParams) -> bool {
        let event_id = params.event_id.clone();
        settle("signup", event_id.as_deref(), self.signup_reward(params).await)
    }

    async fn signup_reward(&self, params: SignupRewardParams) -> Result<bool> {
        let event_id = required("eventId", &params.event_id)?;
        let subject = required("subjectUserId", &params.subject_user_id)?;
        let amount = required_amount(&params.amount)?;

        let mut draft = RewardDoc::new(subject, event_id, &RewardReason::SignUp, amount.as_str());
        draft.destination_wallet = params.destination_wallet.clone();
        draft.response_channel = params.response_channel.clone();
        draft.display_handle = params.display_handle.clone();
        draft.display_name = params.display_name.clone();

        self.drive_reward(draft, None).await
    }
}
