//! stockwatch engine
//!
//! Watches the dedicated server inventory for subscribed plans, notifies
//! subscribers once a plan comes into stock, and serves the subscription
//! API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use stockwatch_engine::{
    api,
    config::Config,
    db::Database,
    notify::{Notifier, TelegramNotifier},
    scheduler::{SchedulerWorker, SubscriptionChecker},
    service::WatchService,
    state::AppState,
};
use stockwatch_inventory::{EndpointRegistry, ResponseCache};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Prefer RUST_LOG, fall back to STOCKWATCH_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting stockwatch engine");
    info!(
        listen_addr = %config.listen_addr,
        regions = config.regions.len(),
        "Configuration loaded"
    );

    let db = match Database::connect(&config.database).await {
        Ok(db) => {
            info!("Database connection established");
            db
        }
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            return Err(e.into());
        }
    };

    if let Err(e) = db.run_migrations().await {
        error!(error = %e, "Failed to run migrations");
        return Err(e.into());
    }

    let cache = Arc::new(ResponseCache::new(config.cache.clone()));
    let registry = Arc::new(EndpointRegistry::new(
        config.regions.clone(),
        cache.clone(),
        &config.client,
    )?);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(&config.telegram)?);
    let store = db.subscription_store();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper_handle = tokio::spawn({
        let cache = cache.clone();
        let shutdown_rx = shutdown_rx.clone();
        async move {
            cache.run_sweeper(shutdown_rx).await;
        }
    });

    let checker = SubscriptionChecker::new(
        store.clone(),
        registry.clone(),
        notifier,
        config.scheduler.page_size,
    );
    let scheduler_worker = SchedulerWorker::new(checker, store.clone(), config.scheduler.clone());
    let scheduler_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            scheduler_worker.run(shutdown_rx).await;
        }
    });

    let service = WatchService::new(registry, store);
    let state = AppState::new(db, service);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(true);

    info!("Waiting for workers to shut down...");
    let shutdown_timeout = Duration::from_secs(10);

    if let Err(e) = tokio::time::timeout(shutdown_timeout, scheduler_handle).await {
        warn!(error = %e, "Scheduler worker did not shut down in time");
    }

    if let Err(e) = tokio::time::timeout(shutdown_timeout, sweeper_handle).await {
        warn!(error = %e, "Cache sweeper did not shut down in time");
    }

    info!("Engine shutdown complete");
    Ok(())
}
