//! NATS client wrapper
//!
//! Connection management with credentials and keep-alive, plus the
//! publish/subscribe calls the intake loop needs.

use async_nats::{Client, ConnectOptions};
use bytes::Bytes;
use std::time::Duration;
use tracing::info;

use crate::config::NatsArgs;
use crate::types::LedgerError;

/// Default ping interval for keep-alive
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct NatsClient {
    client: Client,
    /// Client name for logging
    name: String,
}

impl NatsClient {
    pub async fn new(args: &NatsArgs, name: &str) -> Result<Self, LedgerError> {
        info!("Connecting to NATS at {}", args.nats_url);

        // Fail fast on the first connect; reconnects still happen afterwards
        let mut options = ConnectOptions::new()
            .name(name)
            .ping_interval(DEFAULT_PING_INTERVAL)
            .connection_timeout(Duration::from_secs(5));

        if let (Some(user), Some(pass)) = (&args.nats_user, &args.nats_password) {
            options = options.user_and_password(user.clone(), pass.clone());
        }

        let client = options
            .connect(&args.nats_url)
            .await
            .map_err(|e| LedgerError::Nats(format!("Failed to connect: {}", e)))?;

        info!("Connected to NATS at {}", args.nats_url);

        Ok(Self {
            client,
            name: name.to_string(),
        })
    }

    /// Publish a message to a subject
    pub async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), LedgerError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| LedgerError::Nats(format!("Publish failed: {}", e)))
    }

    /// Subscribe to a subject
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, LedgerError> {
        self.client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| LedgerError::Nats(format!("Subscribe failed: {}", e)))
    }

    /// Flush pending messages
    pub async fn flush(&self) -> Result<(), LedgerError> {
        self.client
            .flush()
            .await
            .map_err(|e| LedgerError::Nats(format!("Flush failed: {}", e)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
