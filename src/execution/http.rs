//! HTTP adapter for the wallet execution service
//!
//! - `POST {base}/v1/execute` with an [`ExecutionRequest`] body
//! - `GET {base}/v1/operations/{handle}` to resolve a provisional handle
//!
//! Both return `{"transactionHash": ..., "userOpHash": ...}`. The configured
//! rejection status marks a request the service will never accept.

use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ExecutionClient, ExecutionError, ExecutionOutcome, ExecutionRequest};

/// Configuration for the HTTP execution client
#[derive(Debug, Clone)]
pub struct ExecutionClientConfig {
    /// Base URL of the execution service
    pub base_url: String,
    /// Service API key, sent as `x-api-key`
    pub api_key: Option<String>,
    /// Status code meaning "permanently rejected"
    pub rejected_status: u16,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ExecutionClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3005".to_string(),
            api_key: None,
            rejected_status: 422,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpExecutionClient {
    config: ExecutionClientConfig,
    http_client: reqwest::Client,
}

impl HttpExecutionClient {
    pub fn new(config: ExecutionClientConfig) -> Self {
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

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    async fn read_outcome(&self, response: reqwest::Response) -> Result<ExecutionOutcome, ExecutionError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, self.config.rejected_status, body));
        }

        response
            .json::<ExecutionOutcome>()
            .await
            .map_err(|e| ExecutionError::Transport(format!("Unreadable response: {}", e)))
    }
}

/// Map a non-success status to a permanent or transient error
pub(crate) fn classify_failure(status: StatusCode, rejected_status: u16, body: String) -> ExecutionError {
    if status.as_u16() == rejected_status {
        ExecutionError::Rejected {
            status: status.as_u16(),
            message: body,
        }
    } else {
        ExecutionError::Transport(format!("HTTP {}: {}", status, body))
    }
}

#[async_trait::async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError> {
        debug!(
            subject_id = %request.subject_id,
            amount = %request.amount,
            chain = %request.chain_name,
            "Dispatching execution"
        );

        let mut builder = self.http_client.post(self.endpoint("v1/execute")).json(request);
        if let Some(token) = &request.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = self.with_auth(builder).send().await.map_err(|e| {
            warn!(subject_id = %request.subject_id, error = %e, "Execution request failed");
            ExecutionError::Transport(e.to_string())
        })?;

        self.read_outcome(response).await
    }

    async fn poll_status(&self, provisional_handle: &str) -> Result<Option<String>, ExecutionError> {
        let url = self.endpoint(&format!("v1/operations/{}", provisional_handle));

        let response = self
            .with_auth(self.http_client.get(url))
            .send()
            .await
            .map_err(|e| {
                warn!(handle = %provisional_handle, error = %e, "Status poll failed");
                ExecutionError::Transport(e.to_string())
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(handle = %provisional_handle, "Operation not indexed yet");
            return Ok(None);
        }

        Ok(self.read_outcome(response).await?.final_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutionClientConfig::default();
        assert_eq!(config.rejected_status, 422);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_endpoint_join() {
        let client = HttpExecutionClient::new(ExecutionClientConfig {
            base_url: "https://exec.example/".into(),
            ..Default::default()
        });
        assert_eq!(client.endpoint("v1/execute"), "https://exec.example/v1/execute");
    }

    #[test]
    fn test_classify_failure() {
        let rejected = classify_failure(StatusCode::UNPROCESSABLE_ENTITY, 422, "no funds".into());
        assert!(rejected.is_permanent());

        let transient = classify_failure(StatusCode::BAD_GATEWAY, 422, String::new());
        assert!(!transient.is_permanent());

        let custom = classify_failure(StatusCode::GONE, 410, String::new());
        assert!(custom.is_permanent());
    }
}
