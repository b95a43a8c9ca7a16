//! Event intake over NATS request/reply
//!
//! Publishers send a handler's flat parameter object to one of the
//! subjects below and, when they set a reply subject, receive
//! `{"handled": bool}` back. `false` means "publish again later".
//!
//! | Subject                    | Handler                        |
//! |----------------------------|--------------------------------|
//! | `{prefix}.reward.signup`   | `handle_signup_reward`         |
//! | `{prefix}.reward.referral` | `handle_referral_reward`       |
//! | `{prefix}.reward.link`     | `handle_link_reward`           |
//! | `{prefix}.reward.isolated` | `handle_isolated_reward`       |
//! | `{prefix}.transfer.peer`   | `handle_transfer_transaction`  |
//! | `{prefix}.status.reward`   | `reward_status` (reply only)   |
//! | `{prefix}.status.transfer` | `transfer_status` (reply only) |

use bytes::Bytes;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::NatsClient;
use crate::ledger::{LedgerEntry, RewardKey};
use crate::rewards::RewardService;
use crate::types::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignupReward,
    ReferralReward,
    LinkReward,
    IsolatedReward,
    PeerTransfer,
    RewardStatus,
    TransferStatus,
}

impl Route {
    /// Match a subject under `prefix`
    pub fn from_subject(prefix: &str, subject: &str) -> Option<Self> {
        let rest = subject.strip_prefix(prefix)?.strip_prefix('.')?;
        match rest {
            "reward.signup" => Some(Self::SignupReward),
            "reward.referral" => Some(Self::ReferralReward),
            "reward.link" => Some(Self::LinkReward),
            "reward.isolated" => Some(Self::IsolatedReward),
            "transfer.peer" => Some(Self::PeerTransfer),
            "status.reward" => Some(Self::RewardStatus),
            "status.transfer" => Some(Self::TransferStatus),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferStatusQuery {
    event_id: String,
}

/// Run one message through the service and build the reply body
pub async fn dispatch(service: &RewardService, route: Route, payload: &[u8]) -> Value {
    match route {
        Route::SignupReward => handled(match decode(payload) {
            Some(params) => service.handle_signup_reward(params).await,
            None => true,
        }),
        Route::ReferralReward => handled(match decode(payload) {
            Some(params) => service.handle_referral_reward(params).await,
            None => true,
        }),
        Route::LinkReward => handled(match decode(payload) {
            Some(params) => service.handle_link_reward(params).await,
            None => true,
        }),
        Route::IsolatedReward => handled(match decode(payload) {
            Some(params) => service.handle_isolated_reward(params).await,
            None => true,
        }),
        Route::PeerTransfer => handled(match decode(payload) {
            Some(params) => service.handle_transfer_transaction(params).await,
            None => true,
        }),
        Route::RewardStatus => match decode::<RewardKey>(payload) {
            Some(key) => lookup(service.reward_status(&key).await),
            None => json!({ "found": false, "error": "malformed reward key" }),
        },
        Route::TransferStatus => match decode::<TransferStatusQuery>(payload) {
            Some(query) => lookup(service.transfer_status(&query.event_id).await),
            None => json!({ "found": false, "error": "malformed transfer query" }),
        },
    }
}

/// Serve the intake subjects until the subscription closes
pub async fn run_intake(nats: NatsClient, service: Arc<RewardService>, prefix: String) -> Result<()> {
    let wildcard = format!("{}.>", prefix);
    let mut subscriber = nats.subscribe(&wildcard).await?;
    info!(subject = %wildcard, client = nats.name(), "Listening for ledger events");

    while let Some(msg) = subscriber.next().await {
        let Some(route) = Route::from_subject(&prefix, &msg.subject) else {
            debug!(subject = %msg.subject, "Ignoring unrouted subject");
            continue;
        };

        let nats = nats.clone();
        let service = Arc::clone(&service);

        // Each event is an independent unit of work
        tokio::spawn(async move {
            let reply = dispatch(&service, route, &msg.payload).await;

            let Some(reply_to) = msg.reply else {
                return;
            };
            let body = match serde_json::to_vec(&reply) {
                Ok(body) => Bytes::from(body),
                Err(e) => {
                    warn!(error = %e, "Failed to encode reply");
                    return;
                }
            };
            if let Err(e) = nats.publish(&reply_to, body).await {
                warn!(subject = %reply_to, error = %e, "Failed to send reply");
            }
        });
    }

    info!("Ledger event subscription closed");
    Ok(())
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Option<T> {
    match serde_json::from_slice(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Discarding malformed payload");
            None
        }
    }
}

fn handled(flag: bool) -> Value {
    json!({ "handled": flag })
}

fn lookup<E: LedgerEntry>(result: Result<Option<E>>) -> Value {
    match result {
        Ok(Some(entry)) => json!({ "found": true, "record": entry.notification() }),
        Ok(None) => json!({ "found": false }),
        Err(e) => json!({ "found": false, "error": e.to_string() }),
    }
}
