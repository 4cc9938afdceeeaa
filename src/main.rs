//! eventbank - event-sourced bank account runtime
//!
//! Wires the Postgres event store, the in-process event bus, the read-model
//! repository and the projection worker pool, then runs until SIGINT/SIGTERM.
//! The HTTP facade lives in a separate service and talks to the command and
//! query handlers this crate exposes.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventbank::config::Config;
use eventbank::domain::{BankAccountSerializer, BankAccountStore};
use eventbank::es::{InMemoryEventBus, PgEventStore};
use eventbank::projection::{BankAccountProjection, ProjectionWorkerPool};
use eventbank::db;
use eventbank::repository::PgAccountRepository;

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventbank=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;

    tracing::info!("Starting eventbank runtime");
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }
    tracing::info!("Database connected successfully");

    // Bus, event store and the aggregate store facade on top of them.
    let bus = Arc::new(InMemoryEventBus::new(
        &config.topic_prefix,
        config.bus_partitions,
    ));
    let event_store = Arc::new(PgEventStore::new(pool.clone(), bus.clone()));
    let store: BankAccountStore = BankAccountStore::new(
        event_store.clone(),
        BankAccountSerializer,
        config.snapshot_frequency,
    );

    // Projection pipeline: read-model repository + one worker per partition.
    let repository = Arc::new(PgAccountRepository::new(pool.clone()));
    let projection = Arc::new(BankAccountProjection::new(repository, store.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = ProjectionWorkerPool::new(bus.clone(), projection).start(shutdown_rx);

    tracing::info!(
        partitions = config.bus_partitions,
        snapshot_frequency = config.snapshot_frequency,
        "Runtime started"
    );

    shutdown_signal().await;

    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }

    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Wait for an interrupt or terminate signal and report which one fired.
async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    let signal = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.expect("failed to install interrupt handler");
            "interrupt"
        }
        _ = sigterm => "SIGTERM",
    };

    tracing::info!(signal, "shutdown signal received, draining projection workers");
}
