use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use domain::services::CoreServices;
use equipment_tracker_api::app::{create_app, AppState};
use equipment_tracker_api::config::Config;
use equipment_tracker_api::jobs::{DetectionFeed, JobScheduler, PendingRequestsJob, PoolMetricsJob};
use equipment_tracker_api::middleware::{init_metrics, logging::init_logging};
use persistence::{EquipmentRepository, LocationChangeRepository, RoomRepository};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_logging(&config.logging)?;
    init_metrics().context("failed to install Prometheus recorder")?;

    info!("Starting Equipment Tracker API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::connect(&config.database.pool_config())
        .await
        .context("failed to connect to the database")?;
    persistence::db::run_migrations(&pool).await?;

    let services = CoreServices::new(
        Arc::new(RoomRepository::new(pool.clone())),
        Arc::new(EquipmentRepository::new(pool.clone())),
        Arc::new(LocationChangeRepository::new(pool.clone())),
        config.detection.ingestion_settings(),
    );

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.register(PendingRequestsJob::new(services.workflow.clone()));
    scheduler.start();

    let (feed, feed_handle) = DetectionFeed::spawn(
        services.ingestion.clone(),
        &config.detection,
        scheduler.subscribe(),
    );
    scheduler.track("detection_feed", feed_handle);

    let addr = config.socket_addr()?;
    let shutdown_timeout = config.shutdown_timeout();
    let state = AppState::new(config, services)
        .with_pool(pool.clone())
        .with_detection_feed(feed);
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(shutdown_timeout).await;
    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
