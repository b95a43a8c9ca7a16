use tracing::{debug, instrument, warn};

use super::{required, required_amount, settle, RewardService, TransferParams};
use crate::db::schemas::TransferDoc;
use crate::execution::ExecutionRequest;
use crate::types::{LedgerError, Result};

/// Chain name the execution service expects for an EVM chain id
pub fn chain_name_for(chain_id: u64) -> String {
    match chain_id {
        1 => "ethereum".to_string(),
        10 => "optimism".to_string(),
        137 => "polygon".to_string(),
        8453 => "base".to_string(),
        84532 => "base-sepolia".to_string(),
        42161 => "arbitrum".to_string(),
        other => other.to_string(),
    }
}

impl RewardService {
    /// Move tokens from one user to another, once per event
    #[instrument(skip_all, fields(event_id = ?params.event_id))]
    pub async fn handle_transfer_transaction(&self, params: TransferParams) -> bool {
        let event_id = params.event_id.clone();
        settle("transfer", event_id.as_deref(), self.transfer_transaction(params).await)
    }

    async fn transfer_transaction(&self, params: TransferParams) -> Result<bool> {
        let event_id = required("eventId", &params.event_id)?;

        let mut transfer = match self.store.find_transfer(event_id).await? {
            Some(existing) => {
                debug!(status = %existing.status, "Resuming transfer");
                existing
            }
            None => {
                let draft = self.transfer_draft(event_id, &params).await?;
                self.store.insert_transfer(draft).await?
            }
        };

        let sender = params.sender_user_id.as_deref();
        if sender.is_some_and(|s| s != transfer.sender_user_id) {
            warn!(
                stored_sender = %transfer.sender_user_id,
                "Event id reused by another sender, driving stored transfer"
            );
        }

        let request = ExecutionRequest {
            subject_id: transfer.sender_user_id.clone(),
            destination_wallet: transfer.destination_wallet.clone(),
            amount: transfer.amount.clone(),
            auth_token: params.auth_token.clone(),
            token_address: transfer.token_address.clone(),
            chain_name: chain_name_for(transfer.chain_id),
        };

        self.driver.advance(&mut transfer, &request).await
    }

    async fn transfer_draft(&self, event_id: &str, params: &TransferParams) -> Result<TransferDoc> {
        let sender_id = required("senderUserId", &params.sender_user_id)?;
        let recipient_id = required("recipientUserId", &params.recipient_user_id)?;
        let amount = required_amount(&params.amount)?;
        let token_address = required("tokenAddress", &params.token_address)?;
        let chain_id = params
            .chain_id
            .ok_or_else(|| LedgerError::MissingInput("chainId".into()))?;

        if sender_id == recipient_id {
            return Err(LedgerError::BadRequest(
                "sender and recipient are the same user".into(),
            ));
        }

        let mut draft = TransferDoc::new(
            event_id,
            sender_id,
            recipient_id,
            amount.as_str(),
            chain_id,
            token_address,
        );
        draft.response_channel = params.response_channel.clone();
        draft.destination_wallet = params.destination_wallet.clone();
        draft.display_handle = params.display_handle.clone();
        draft.display_name = params.display_name.clone();

        if draft.destination_wallet.is_none() {
            draft.destination_wallet = self
                .users
                .find_user(recipient_id)
                .await?
                .and_then(|r| r.wallet_address);
        }

        if draft.display_handle.is_none() || draft.display_name.is_none() {
            if let Some(sender) = self.users.find_user(sender_id).await? {
                draft.display_handle = draft.display_handle.or(sender.display_handle);
                draft.display_name = draft.display_name.or(sender.display_name);
            }
        }

        Ok(draft)
    }
}
