use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use footfall::api;
use footfall::config::Config;
use footfall::ledger;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize ledger
    let ledger = ledger::connect(config.database.as_ref())?;
    match config.database.as_ref() {
        Some(db) => info!(
            "Using {} ledger (tls: {}, pool: {}, timeout: {}ms)",
            ledger.backend(),
            db.require_tls,
            db.max_connections,
            db.timeout_ms
        ),
        None => info!("DATABASE_URL not set, using in-memory ledger (counts reset on restart)"),
    }

    // Schema problems are not fatal: requests fail until the store recovers
    info!("Initializing ledger...");
    match ledger.init().await {
        Ok(()) => info!("Ledger initialized successfully"),
        Err(e) => error!("Failed to initialize ledger, continuing without schema: {e:#}"),
    }

    if config.cors.allowed_origins.is_empty() {
        info!("🌐 No CORS origins allow-listed");
    } else {
        info!("🌐 CORS origins: {}", config.cors.allowed_origins.join(", "));
    }
    info!("🎨 Serving static site from directory: {}", config.frontend.static_dir);

    let router = api::create_router(ledger, &config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - POST http://{}/api/visit", addr);
    info!("   - GET  http://{}/api/stats", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {e}");
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
}
