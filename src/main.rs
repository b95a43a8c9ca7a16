//! Reward ledger service binary

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reward_ledger::{
    config::Args,
    db::{
        InMemoryLedgerStore, MongoClient, MongoLedgerStore, MongoUserDirectory, SharedDirectory,
        SharedStore,
    },
    execution::HttpExecutionClient,
    ledger::LedgerDriver,
    nats::{run_intake, NatsClient},
    notify::{AnalyticsSink, Dispatcher, HttpAnalyticsSink, HttpWebhookSink, WebhookSink},
    RewardService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_tracing(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Reward Ledger");
    info!("======================================");
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("NATS: {} (prefix {})", args.nats.nats_url, args.nats.subject_prefix);
    info!("MongoDB: {}/{}", args.mongodb_uri, args.mongodb_db);
    info!("Execution service: {}", args.execution.execution_url);
    info!("Chain: {}", args.reward.chain_name);
    info!("Pending hash timeout: {}s", args.pending_hash_timeout_secs);
    info!("Webhook: {}", args.notify.webhook_url.as_deref().unwrap_or("disabled"));
    info!("Analytics: {}", args.notify.analytics_url.as_deref().unwrap_or("disabled"));
    info!("======================================");

    let (store, users) = open_store(&args).await?;

    let executor = Arc::new(HttpExecutionClient::new(args.execution_config()));

    let webhook = args
        .webhook_config()
        .map(|config| Arc::new(HttpWebhookSink::new(config)) as Arc<dyn WebhookSink>);
    let analytics = args
        .analytics_config()
        .map(|config| Arc::new(HttpAnalyticsSink::new(config)) as Arc<dyn AnalyticsSink>);
    let dispatcher = Dispatcher::new(webhook, analytics);

    let driver = LedgerDriver::new(store.clone(), executor, dispatcher)
        .with_pending_hash_timeout(args.pending_hash_timeout());

    let service = Arc::new(RewardService::new(
        store,
        users,
        driver,
        args.reward_settings(),
    ));

    let nats = match NatsClient::new(&args.nats, "reward-ledger").await {
        Ok(client) => client,
        Err(e) => {
            error!("NATS connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let intake = run_intake(nats.clone(), service, args.nats.subject_prefix.clone());

    tokio::select! {
        result = intake => {
            if let Err(e) = result {
                error!("Intake stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = nats.flush().await {
        warn!("Failed to flush NATS on shutdown: {}", e);
    }

    info!("Reward ledger stopped");
    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("reward_ledger={},info", args.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if args.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// MongoDB store, or the in-memory store in dev mode when MongoDB is unreachable
async fn open_store(args: &Args) -> anyhow::Result<(SharedStore, SharedDirectory)> {
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected, database '{}'", client.db_name());
            client
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                let memory = Arc::new(InMemoryLedgerStore::new());
                let store: SharedStore = memory.clone();
                let users: SharedDirectory = memory;
                return Ok((store, users));
            }
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let store: SharedStore = Arc::new(MongoLedgerStore::new(&mongo).await?);
    let users: SharedDirectory = Arc::new(MongoUserDirectory::new(&mongo).await?);
    Ok((store, users))
}
