//! # Planboard Worker
//!
//! Background maintenance for Planboard:
//! - Reminds project participants when a project is due soon
//! - Sweeps read notifications past the retention period
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo run -p planboard-worker
//! ```

use planboard_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use planboard_shared::services::chat::LoggingChatNotifier;
use planboard_shared::services::effects::EffectMode;
use planboard_shared::services::Planboard;
use planboard_shared::store::PgStore;
use planboard_worker::config::WorkerConfig;
use planboard_worker::scheduler::MaintenanceScheduler;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planboard_worker=debug,planboard_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Planboard Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: config.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    // Reminders are the whole job here, so they are awaited rather than spawned
    let board = Planboard::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(LoggingChatNotifier),
        EffectMode::Inline,
    );

    let scheduler = MaintenanceScheduler::new(board, config.schedule);
    let shutdown = scheduler.shutdown_token();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received, finishing current pass..."),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
        shutdown.cancel();
    });

    scheduler.run().await;
    close_pool(pool).await;

    Ok(())
}
