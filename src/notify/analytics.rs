//! Analytics sink speaking the Segment `track` HTTP API

use std::time::Duration;

use super::{AnalyticsSink, TrackEvent};
use crate::types::{LedgerError, Result};

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Base URL, `/v1/track` is appended
    pub url: String,
    /// Write key, sent as the basic-auth username
    pub write_key: String,
    pub request_timeout: Duration,
}

pub struct HttpAnalyticsSink {
    config: AnalyticsConfig,
    http_client: reqwest::Client,
}

impl HttpAnalyticsSink {
    pub fn new(config: AnalyticsConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    fn track_url(&self) -> String {
        format!("{}/v1/track", self.config.url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    async fn track(&self, event: &TrackEvent) -> Result<()> {
        let response = self
            .http_client
            .post(self.track_url())
            .basic_auth(&self.config.write_key, Option::<&str>::None)
            .json(event)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LedgerError::Http(format!(
                "Analytics track returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_url() {
        let sink = HttpAnalyticsSink::new(AnalyticsConfig {
            url: "https://api.segment.io/".into(),
            write_key: "key".into(),
            request_timeout: Duration::from_secs(5),
        });
        assert_eq!(sink.track_url(), "https://api.segment.io/v1/track");
    }

    #[test]
    fn test_track_body_shape() {
        let event = TrackEvent {
            user_id: "alice".into(),
            event: "Token Transfer Completed".into(),
            properties: serde_json::json!({ "amount": "5" }),
        };
        let body = serde_json::to_value(&event).unwrap();
        assert_eq!(body["userId"], "alice");
        assert_eq!(body["properties"]["amount"], "5");
    }
}
