//! Side effects fired when a record enters `success`
//!
//! Delivery is best-effort: failures are logged and never reach the state
//! machine or the caller.

mod analytics;
mod webhook;

pub use analytics::{AnalyticsConfig, HttpAnalyticsSink};
pub use webhook::{HttpWebhookSink, WebhookConfig};

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ledger::LedgerEntry;
use crate::types::Result;

/// Segment-style analytics event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    pub user_id: String,
    pub event: String,
    pub properties: serde_json::Value,
}

/// Receiver of success notifications
#[async_trait::async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, event: &str, payload: &serde_json::Value) -> Result<()>;
}

/// Receiver of analytics events
#[async_trait::async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn track(&self, event: &TrackEvent) -> Result<()>;
}

/// Fans a success out to the configured sinks
#[derive(Clone, Default)]
pub struct Dispatcher {
    webhook: Option<Arc<dyn WebhookSink>>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
}

impl Dispatcher {
    pub fn new(
        webhook: Option<Arc<dyn WebhookSink>>,
        analytics: Option<Arc<dyn AnalyticsSink>>,
    ) -> Self {
        Self { webhook, analytics }
    }

    /// Dispatcher with no sinks
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Notify sinks about a record that just reached `success`
    pub async fn on_success<E: LedgerEntry>(&self, entry: &E) {
        let key = entry.key();

        if let Some(webhook) = &self.webhook {
            let event = E::KIND.success_event();
            match webhook.deliver(event, &entry.notification()).await {
                Ok(()) => debug!(key = %key, event, "Webhook delivered"),
                Err(e) => warn!(key = %key, error = %e, "Webhook delivery failed"),
            }
        }

        if let (Some(analytics), Some(track)) = (&self.analytics, entry.track_event()) {
            match analytics.track(&track).await {
                Ok(()) => debug!(key = %key, event = %track.event, "Analytics event sent"),
                Err(e) => warn!(key = %key, error = %e, "Analytics track failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{RewardDoc, RewardReason, TransferDoc};
    use crate::types::LedgerError;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingWebhook {
        calls: Mutex<Vec<(String, serde_json::Value)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl WebhookSink for RecordingWebhook {
        async fn deliver(&self, event: &str, payload: &serde_json::Value) -> Result<()> {
            self.calls
                .lock()
                .await
                .push((event.to_string(), payload.clone()));
            if self.fail {
                return Err(LedgerError::Http("503".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingAnalytics {
        events: Mutex<Vec<TrackEvent>>,
    }

    #[async_trait::async_trait]
    impl AnalyticsSink for RecordingAnalytics {
        async fn track(&self, event: &TrackEvent) -> Result<()> {
            self.events.lock().await.push(event.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reward_success_skips_analytics() {
        let webhook = Arc::new(RecordingWebhook::default());
        let analytics = Arc::new(RecordingAnalytics::default());
        let dispatcher = Dispatcher::new(
            Some(webhook.clone() as Arc<dyn WebhookSink>),
            Some(analytics.clone() as Arc<dyn AnalyticsSink>),
        );

        let doc = RewardDoc::new("u1", "e1", &RewardReason::SignUp, "100");
        dispatcher.on_success(&doc).await;

        let calls = webhook.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "reward.success");
        assert_eq!(calls[0].1["eventId"], "e1");
        assert!(analytics.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_transfer_success_tracks() {
        let webhook = Arc::new(RecordingWebhook::default());
        let analytics = Arc::new(RecordingAnalytics::default());
        let dispatcher = Dispatcher::new(
            Some(webhook.clone() as Arc<dyn WebhookSink>),
            Some(analytics.clone() as Arc<dyn AnalyticsSink>),
        );

        let doc = TransferDoc::new("t1", "alice", "bob", "5", 8453, "0xtoken");
        dispatcher.on_success(&doc).await;

        assert_eq!(webhook.calls.lock().await[0].0, "transfer.success");
        let events = analytics.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_webhook_failure_is_swallowed() {
        let webhook = Arc::new(RecordingWebhook {
            fail: true,
            ..Default::default()
        });
        let analytics = Arc::new(RecordingAnalytics::default());
        let dispatcher = Dispatcher::new(
            Some(webhook.clone() as Arc<dyn WebhookSink>),
            Some(analytics.clone() as Arc<dyn AnalyticsSink>),
        );

        let doc = TransferDoc::new("t1", "alice", "bob", "5", 8453, "0xtoken");
        dispatcher.on_success(&doc).await;

        assert_eq!(webhook.calls.lock().await.len(), 1);
        assert_eq!(analytics.events.lock().await.len(), 1);
    }
}
