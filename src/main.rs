//! # Share Ledger
//!
//! Main entry point for the share ledger service.
//!
//! Connects to PostgreSQL and Redis, subscribes to the settlement and card
//! verdict topics and runs the stale pending monitor until Ctrl-C.

use anyhow::Context;
use share_ledger::application::services::StoreAccountGate;
use share_ledger::application::use_cases::{
    AccountService, SettlementOrchestrator, StalePendingMonitor,
};
use share_ledger::config::{AppConfig, LogConfig, LogFormat};
use share_ledger::infrastructure::messaging::{
    BusPublisher, MessageBus, RedisStreamsBus, subscribe_all,
};
use share_ledger::infrastructure::persistence::{LedgerStore, PgLedgerStore, ensure_schema};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    config.validate().context("validating configuration")?;
    init_tracing(&config.log);

    info!(
        service = %config.service_name,
        environment = %config.environment,
        version = env!("CARGO_PKG_VERSION"),
        "starting share ledger"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("connecting to postgres")?;
    ensure_schema(&pool).await.context("applying schema")?;
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));

    let bus: Arc<dyn MessageBus> = Arc::new(
        RedisStreamsBus::connect(config.broker.clone())
            .await
            .context("connecting to redis")?,
    );
    let publisher = Arc::new(BusPublisher::new(Arc::clone(&bus)));

    let orchestrator = Arc::new(SettlementOrchestrator::new(
        Arc::clone(&store),
        Arc::new(StoreAccountGate::new(Arc::clone(&store))),
        publisher.clone(),
    ));
    let accounts = Arc::new(AccountService::new(Arc::clone(&store), publisher));

    subscribe_all(bus.as_ref(), orchestrator, accounts)
        .await
        .context("subscribing to verdict topics")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = StalePendingMonitor::new(
        Arc::clone(&store),
        config.trading.pending_warning_age(),
        config.trading.monitor_interval(),
    );
    let monitor_task = tokio::spawn(async move { monitor.run(shutdown_rx).await });

    info!("share ledger started");

    tokio::signal::ctrl_c().await?;
    info!("shutting down share ledger");

    if shutdown_tx.send(true).is_err() {
        error!("stale pending monitor already stopped");
    }
    if let Err(e) = monitor_task.await {
        error!(error = %e, "stale pending monitor panicked");
    }
    if let Err(e) = bus.close().await {
        error!(error = %e, "failed to close message bus");
    }
    pool.close().await;

    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(log.include_target);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}
