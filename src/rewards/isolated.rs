use tracing::instrument;

use super::{required, required_amount, settle, IsolatedRewardParams, RewardService};
use crate::db::schemas::{RewardDoc, RewardReason};
use crate::types::{LedgerError, Result};

impl RewardService {
    /// Pay a one-off reward under a caller-chosen reason
    #[instrument(skip_all, fields(event_id = ?params.event_id, reason = ?params.reason))]
    pub async fn handle_isolated_reward(&self, params: IsolatedRewardParams) -> bool {
        let event_id = params.event_id.clone();
        settle("isolated", event_id.as_deref(), self.isolated_reward(params).await)
    }

    async fn isolated_reward(&self, params: IsolatedRewardParams) -> Result<bool> {
        let event_id = required("eventId", &params.event_id)?;
        let subject = required("subjectUserId", &params.subject_user_id)?;
        let reason = isolated_reason(required("reason", &params.reason)?)?;
        let amount = required_amount(&params.amount)?;

        let mut draft = RewardDoc::new(subject, event_id, &reason, amount.as_str());
        draft.destination_wallet = params.destination_wallet.clone();
        draft.response_channel = params.response_channel.clone();
        draft.display_handle = params.display_handle.clone();
        draft.display_name = params.display_name.clone();

        self.drive_reward(draft, None).await
    }
}

/// Reasons owned by the other resolvers cannot be paid through this path
fn isolated_reason(raw: &str) -> Result<RewardReason> {
    match RewardReason::from(raw) {
        reason @ RewardReason::Isolated(_) => Ok(reason),
        reserved => Err(LedgerError::BadRequest(format!(
            "reason '{}' is reserved",
            reserved
        ))),
    }
}
