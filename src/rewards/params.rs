//! Flat parameter objects accepted by the handlers
//!
//! Every field is optional at the type level so a partial payload still
//! decodes; the handlers report absent required fields as missing input.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRewardParams {
    pub event_id: Option<String>,
    pub subject_user_id: Option<String>,
    pub amount: Option<String>,
    pub destination_wallet: Option<String>,
    pub response_channel: Option<String>,
    pub display_handle: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IsolatedRewardParams {
    pub event_id: Option<String>,
    pub subject_user_id: Option<String>,
    /// Free-form reason tag, e.g. a campaign name
    pub reason: Option<String>,
    pub amount: Option<String>,
    pub destination_wallet: Option<String>,
    pub response_channel: Option<String>,
    pub display_handle: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkRewardParams {
    pub event_id: Option<String>,
    /// Owner of the invite link, the user being paid
    pub inviter_user_id: Option<String>,
    /// User who signed up through the link
    pub sponsored_user_id: Option<String>,
    pub amount: Option<String>,
    pub response_channel: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferralRewardParams {
    pub event_id: Option<String>,
    /// The user who just signed up
    pub new_user_id: Option<String>,
    pub amount: Option<String>,
    pub response_channel: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferParams {
    pub event_id: Option<String>,
    pub sender_user_id: Option<String>,
    pub recipient_user_id: Option<String>,
    pub amount: Option<String>,
    pub chain_id: Option<u64>,
    pub token_address: Option<String>,
    /// Sender's credential, forwarded to the execution service and never stored
    pub auth_token: Option<String>,
    pub destination_wallet: Option<String>,
    pub response_channel: Option<String>,
    pub display_handle: Option<String>,
    pub display_name: Option<String>,
}
