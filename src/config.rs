//! Configuration for the reward ledger
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Args as ClapArgs, Parser};
use std::time::Duration;

use crate::execution::ExecutionClientConfig;
use crate::notify::{AnalyticsConfig, WebhookConfig};
use crate::rewards::RewardSettings;

/// Reward ledger - drives token rewards and transfers to exactly one execution
#[derive(Parser, Debug, Clone)]
#[command(name = "reward-ledger")]
#[command(about = "Idempotent executor for token rewards and peer transfers")]
pub struct Args {
    /// Enable development mode (in-memory store when MongoDB is down, relaxed checks)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "reward_ledger")]
    pub mongodb_db: String,

    /// Log level for this crate (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format: "text" or "json"
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Seconds a provisional execution may stay unresolved before it fails
    #[arg(long, env = "PENDING_HASH_TIMEOUT_SECS", default_value = "600")]
    pub pending_hash_timeout_secs: u64,

    /// NATS configuration
    #[command(flatten)]
    pub nats: NatsArgs,

    /// Execution service configuration
    #[command(flatten)]
    pub execution: ExecutionArgs,

    /// Treasury payout settings
    #[command(flatten)]
    pub reward: RewardArgs,

    /// Webhook and analytics sinks
    #[command(flatten)]
    pub notify: NotifyArgs,
}

/// NATS connection and subject layout
#[derive(ClapArgs, Debug, Clone)]
pub struct NatsArgs {
    /// NATS server URL
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// NATS username (optional)
    #[arg(long, env = "NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password (optional)
    #[arg(long, env = "NATS_PASSWORD")]
    pub nats_password: Option<String>,

    /// Prefix for every subject this service listens on
    #[arg(long, env = "SUBJECT_PREFIX", default_value = "ledger")]
    pub subject_prefix: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExecutionArgs {
    /// Wallet execution service base URL
    #[arg(long, env = "EXECUTION_URL", default_value = "http://localhost:3005")]
    pub execution_url: String,

    /// API key for the execution service
    #[arg(long, env = "EXECUTION_API_KEY")]
    pub execution_api_key: Option<String>,

    /// HTTP status the execution service uses for permanent rejection
    #[arg(long, env = "EXECUTION_REJECTED_STATUS", default_value = "422")]
    pub execution_rejected_status: u16,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "EXECUTION_TIMEOUT_MS", default_value = "30000")]
    pub execution_timeout_ms: u64,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RewardArgs {
    /// Credential used for treasury payouts
    #[arg(long, env = "TREASURY_AUTH_TOKEN")]
    pub treasury_auth_token: Option<String>,

    /// Token contract paid out by rewards
    #[arg(long, env = "TOKEN_ADDRESS")]
    pub token_address: Option<String>,

    /// Chain rewards are paid on
    #[arg(long, env = "CHAIN_NAME", default_value = "base")]
    pub chain_name: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct NotifyArgs {
    /// Success webhook URL (disabled when unset)
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Bearer secret for the webhook
    #[arg(long, env = "WEBHOOK_SECRET")]
    pub webhook_secret: Option<String>,

    /// Analytics base URL (disabled when unset)
    #[arg(long, env = "ANALYTICS_URL")]
    pub analytics_url: Option<String>,

    /// Analytics write key
    #[arg(long, env = "ANALYTICS_WRITE_KEY")]
    pub analytics_write_key: Option<String>,

    /// Timeout for webhook and analytics calls in milliseconds
    #[arg(long, env = "NOTIFY_TIMEOUT_MS", default_value = "5000")]
    pub notify_timeout_ms: u64,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.reward.token_address.is_none() {
                return Err("TOKEN_ADDRESS is required in production mode".to_string());
            }
            if self.reward.treasury_auth_token.is_none() {
                return Err("TREASURY_AUTH_TOKEN is required in production mode".to_string());
            }
        }

        if self.notify.analytics_url.is_some() && self.notify.analytics_write_key.is_none() {
            return Err("ANALYTICS_WRITE_KEY is required when ANALYTICS_URL is set".to_string());
        }

        if self.pending_hash_timeout_secs == 0 {
            return Err("PENDING_HASH_TIMEOUT_SECS must be positive".to_string());
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(format!("Unknown LOG_FORMAT '{}'", self.log_format));
        }

        Ok(())
    }

    pub fn pending_hash_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.pending_hash_timeout_secs as i64)
    }

    pub fn execution_config(&self) -> ExecutionClientConfig {
        ExecutionClientConfig {
            base_url: self.execution.execution_url.clone(),
            api_key: self.execution.execution_api_key.clone(),
            rejected_status: self.execution.execution_rejected_status,
            request_timeout: Duration::from_millis(self.execution.execution_timeout_ms),
        }
    }

    pub fn reward_settings(&self) -> RewardSettings {
        RewardSettings {
            treasury_auth_token: self.reward.treasury_auth_token.clone(),
            token_address: self.reward.token_address.clone().unwrap_or_default(),
            chain_name: self.reward.chain_name.clone(),
        }
    }

    /// Webhook sink settings, `None` when no URL is configured
    pub fn webhook_config(&self) -> Option<WebhookConfig> {
        self.notify.webhook_url.as_ref().map(|url| WebhookConfig {
            url: url.clone(),
            secret: self.notify.webhook_secret.clone(),
            request_timeout: Duration::from_millis(self.notify.notify_timeout_ms),
        })
    }

    /// Analytics sink settings, `None` when no URL is configured
    pub fn analytics_config(&self) -> Option<AnalyticsConfig> {
        let url = self.notify.analytics_url.as_ref()?;
        Some(AnalyticsConfig {
            url: url.clone(),
            write_key: self.notify.analytics_write_key.clone().unwrap_or_default(),
            request_timeout: Duration::from_millis(self.notify.notify_timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Production-shaped arguments built without touching the environment
    fn base_args() -> Args {
        Args {
            dev_mode: false,
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_db: "reward_ledger".into(),
            log_level: "info".into(),
            log_format: "text".into(),
            pending_hash_timeout_secs: 600,
            nats: NatsArgs {
                nats_url: "nats://127.0.0.1:4222".into(),
                nats_user: None,
                nats_password: None,
                subject_prefix: "ledger".into(),
            },
            execution: ExecutionArgs {
                execution_url: "http://localhost:3005".into(),
                execution_api_key: None,
                execution_rejected_status: 422,
                execution_timeout_ms: 30_000,
            },
            reward: RewardArgs {
                treasury_auth_token: Some("t".into()),
                token_address: Some("0xtoken".into()),
                chain_name: "base".into(),
            },
            notify: NotifyArgs {
                webhook_url: None,
                webhook_secret: None,
                analytics_url: None,
                analytics_write_key: None,
                notify_timeout_ms: 5000,
            },
        }
    }

    #[test]
    fn test_production_requires_token_address() {
        let mut args = base_args();
        assert!(args.validate().is_ok());

        args.reward.token_address = None;
        assert!(args.validate().unwrap_err().contains("TOKEN_ADDRESS"));

        args.dev_mode = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_treasury_token() {
        let mut args = base_args();
        args.reward.treasury_auth_token = None;
        assert!(args.validate().unwrap_err().contains("TREASURY_AUTH_TOKEN"));
    }

    #[test]
    fn test_rejects_bad_timeout_and_log_format() {
        let mut args = base_args();
        args.pending_hash_timeout_secs = 0;
        assert!(args.validate().is_err());

        let mut args = base_args();
        args.log_format = "xml".into();
        assert!(args.validate().unwrap_err().contains("LOG_FORMAT"));
    }

    #[test]
    fn test_pending_hash_timeout() {
        assert_eq!(base_args().pending_hash_timeout(), chrono::Duration::minutes(10));
    }

    #[test]
    fn test_analytics_needs_write_key() {
        let mut args = base_args();
        args.notify.analytics_url = Some("https://api.segment.io".into());
        assert!(args.validate().unwrap_err().contains("ANALYTICS_WRITE_KEY"));

        args.notify.analytics_write_key = Some("wk".into());
        assert!(args.validate().is_ok());
        assert_eq!(args.analytics_config().unwrap().write_key, "wk");
    }

    #[test]
    fn test_cli_flags_parse() {
        let args = Args::parse_from([
            "reward-ledger",
            "--execution-url",
            "http://wallet:9000",
            "--execution-rejected-status",
            "409",
            "--execution-timeout-ms",
            "1500",
        ]);
        let config = args.execution_config();
        assert_eq!(config.base_url, "http://wallet:9000");
        assert_eq!(config.rejected_status, 409);
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_sinks_disabled_without_urls() {
        let mut args = base_args();
        assert!(args.webhook_config().is_none());
        assert!(args.analytics_config().is_none());

        args.notify.webhook_url = Some("https://hooks.example/ledger".into());
        args.notify.webhook_secret = Some("s".into());
        let webhook = args.webhook_config().unwrap();
        assert_eq!(webhook.url, "https://hooks.example/ledger");
        assert_eq!(webhook.secret.as_deref(), Some("s"));
        assert_eq!(webhook.request_timeout, Duration::from_millis(5000));
    }
}
