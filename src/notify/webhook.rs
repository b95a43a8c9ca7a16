//! Notification webhook over HTTP

use std::time::Duration;
use tracing::debug;

use super::WebhookSink;
use crate::types::{LedgerError, Result};

/// Header naming the event carried in the body
pub const EVENT_HEADER: &str = "x-ledger-event";

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Optional shared secret, sent as a bearer token
    pub secret: Option<String>,
    pub request_timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8090/webhooks/ledger".to_string(),
            secret: None,
            request_timeout: Duration::from_secs(5),
        }
    }
}

pub struct HttpWebhookSink {
    config: WebhookConfig,
    http_client: reqwest::Client,
}

impl HttpWebhookSink {
    pub fn new(config: WebhookConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("reward-ledger/0.1")
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }
}

#[async_trait::async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn deliver(&self, event: &str, payload: &serde_json::Value) -> Result<()> {
        let mut request = self
            .http_client
            .post(&self.config.url)
            .header(EVENT_HEADER, event)
            .json(payload);

        if let Some(secret) = &self.config.secret {
            request = request.bearer_auth(secret);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(LedgerError::Http(format!(
                "Webhook {} returned {}",
                self.config.url,
                response.status()
            )));
        }

        debug!(url = %self.config.url, event, "Webhook accepted");
        Ok(())
    }
}
