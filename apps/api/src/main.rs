//! # Harvest Ledger API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Browser / frontend ──► axum (8080) ──► harvest-db ledger ──► SQLite   │
//! │                                                                         │
//! │  startup:   tracing → ApiConfig::load → Database::new (migrations)      │
//! │  shutdown:  Ctrl+C / SIGTERM → drain requests → close pool              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use harvest_api::{router, ApiConfig, AppState};
use harvest_db::Database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Harvest Ledger API server...");

    let config = ApiConfig::load(None)?;
    info!(
        addr = %config.server.bind_address(),
        db_path = %config.database.path.display(),
        low_stock_threshold = config.ledger.low_stock_threshold,
        "Configuration loaded"
    );

    let db = Database::new(config.db_config())
        .await?
        .with_ledger(config.ledger.clone());
    info!("Database ready");

    let app = router(AppState::new(db.clone()));

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    info!(addr = %config.server.bind_address(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=harvest=trace` - Show trace for harvest crates only
/// - Default: `info,harvest=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,harvest=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
