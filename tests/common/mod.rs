//! Shared fixtures for the scenario tests
//!
//! Everything runs against `InMemoryLedgerStore` with scripted execution
//! responses and recording notification sinks.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use reward_ledger::db::schemas::UserProfile;
use reward_ledger::db::InMemoryLedgerStore;
use reward_ledger::execution::{
    ExecutionClient, ExecutionError, ExecutionOutcome, ExecutionRequest,
};
use reward_ledger::ledger::LedgerDriver;
use reward_ledger::notify::{AnalyticsSink, Dispatcher, TrackEvent, WebhookSink};
use reward_ledger::rewards::{RewardService, RewardSettings};
use reward_ledger::{LedgerError, Result};

/// Execution service double answering from scripted queues
///
/// An empty execute queue answers with a transport error, an empty poll
/// queue with "not final yet".
#[derive(Default)]
pub struct MockExecutor {
    execute_responses: Mutex<VecDeque<std::result::Result<ExecutionOutcome, ExecutionError>>>,
    poll_responses: Mutex<VecDeque<std::result::Result<Option<String>, ExecutionError>>>,
    pub executed: Mutex<Vec<ExecutionRequest>>,
    pub polled: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub async fn on_execute(&self, response: std::result::Result<ExecutionOutcome, ExecutionError>) {
        self.execute_responses.lock().await.push_back(response);
    }

    pub async fn on_poll(&self, response: std::result::Result<Option<String>, ExecutionError>) {
        self.poll_responses.lock().await.push_back(response);
    }

    pub async fn execute_count(&self) -> usize {
        self.executed.lock().await.len()
    }

    pub async fn poll_count(&self) -> usize {
        self.polled.lock().await.len()
    }
}

#[async_trait::async_trait]
impl ExecutionClient for MockExecutor {
    async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> std::result::Result<ExecutionOutcome, ExecutionError> {
        self.executed.lock().await.push(request.clone());
        self.execute_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ExecutionError::Transport("no scripted response".into())))
    }

    async fn poll_status(
        &self,
        handle: &str,
    ) -> std::result::Result<Option<String>, ExecutionError> {
        self.polled.lock().await.push(handle.to_string());
        self.poll_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

/// Records every delivery; answers with an error when `fail` is set
#[derive(Default)]
pub struct RecordingWebhook {
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
    pub fail: bool,
}

#[async_trait::async_trait]
impl WebhookSink for RecordingWebhook {
    async fn deliver(&self, event: &str, payload: &serde_json::Value) -> Result<()> {
        self.calls
            .lock()
            .await
            .push((event.to_string(), payload.clone()));
        if self.fail {
            return Err(LedgerError::Http("webhook answered 503".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAnalytics {
    pub events: Mutex<Vec<TrackEvent>>,
    pub fail: bool,
}

#[async_trait::async_trait]
impl AnalyticsSink for RecordingAnalytics {
    async fn track(&self, event: &TrackEvent) -> Result<()> {
        self.events.lock().await.push(event.clone());
        if self.fail {
            return Err(LedgerError::Http("analytics answered 500".into()));
        }
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryLedgerStore>,
    pub executor: Arc<MockExecutor>,
    pub webhook: Arc<RecordingWebhook>,
    pub analytics: Arc<RecordingAnalytics>,
    pub service: RewardService,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Webhook and analytics sinks that record the attempt, then error
    pub fn with_failing_sinks() -> Self {
        Self::build(true)
    }

    fn build(fail_sinks: bool) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let executor = Arc::new(MockExecutor::default());
        let webhook = Arc::new(RecordingWebhook {
            fail: fail_sinks,
            ..Default::default()
        });
        let analytics = Arc::new(RecordingAnalytics {
            fail: fail_sinks,
            ..Default::default()
        });

        let dispatcher = Dispatcher::new(
            Some(webhook.clone() as Arc<dyn WebhookSink>),
            Some(analytics.clone() as Arc<dyn AnalyticsSink>),
        );
        let driver = LedgerDriver::new(store.clone(), executor.clone(), dispatcher);
        let settings = RewardSettings {
            treasury_auth_token: Some("treasury-token".into()),
            token_address: "0xtoken".into(),
            chain_name: "base".into(),
        };
        let service = RewardService::new(store.clone(), store.clone(), driver, settings);

        Self {
            store,
            executor,
            webhook,
            analytics,
            service,
        }
    }

    pub async fn add_user(&self, user_id: &str, wallet: &str) {
        self.store
            .upsert_user(
                UserProfile::new(user_id, Some(wallet.to_string()))
                    .with_display(format!("@{}", user_id), user_id.to_uppercase()),
            )
            .await;
    }

    pub async fn webhook_count(&self) -> usize {
        self.webhook.calls.lock().await.len()
    }
}
