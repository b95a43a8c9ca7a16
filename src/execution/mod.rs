//! Wallet execution service seam
//!
//! The ledger only needs two calls from the execution service: dispatch a
//! token movement, and resolve a provisional operation handle into a
//! transaction hash. Everything else (address resolution, signing, broadcast)
//! lives behind this trait.

mod http;

pub use http::{ExecutionClientConfig, HttpExecutionClient};

use serde::{Deserialize, Serialize};

/// One token movement to dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// User the execution is performed for (payee for rewards, payer for transfers)
    pub subject_id: String,
    /// Explicit destination wallet; the service resolves one when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_wallet: Option<String>,
    /// Decimal-string amount
    pub amount: String,
    /// Bearer token the service signs with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub token_address: String,
    pub chain_name: String,
}

/// What `execute` or `poll_status` came back with
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    #[serde(default, alias = "transactionHash")]
    pub final_handle: Option<String>,
    #[serde(default, alias = "userOpHash")]
    pub provisional_handle: Option<String>,
}

impl ExecutionOutcome {
    pub fn confirmed(hash: impl Into<String>) -> Self {
        Self {
            final_handle: Some(hash.into()),
            provisional_handle: None,
        }
    }

    pub fn provisional(handle: impl Into<String>) -> Self {
        Self {
            final_handle: None,
            provisional_handle: Some(handle.into()),
        }
    }
}

/// Execution failures, split by whether retrying can ever help
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
    /// The service refused the request for good
    #[error("Execution rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network failure, timeout, 5xx, or an unreadable response
    #[error("Execution transport error: {0}")]
    Transport(String),
}

impl ExecutionError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Trait for the execution service (allows mocking in tests)
#[async_trait::async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Dispatch a token movement
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError>;

    /// Resolve a provisional handle; `None` while still unconfirmed
    async fn poll_status(&self, provisional_handle: &str) -> Result<Option<String>, ExecutionError>;
}
