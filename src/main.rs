//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes logging and the database
//! - Starts the HTTP server with graceful shutdown support

use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clipsnip::config::Settings;
use clipsnip::database::{init_db, AppState};
use clipsnip::route::create_app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let settings = Settings::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let db = init_db(&settings.database_path)?;

    let addr = format!("0.0.0.0:{}", settings.port);
    info!(database = %settings.database_path, public_url = %settings.public_url, "starting clipsnip");

    let app = create_app(AppState::new(db, settings)).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    // Runs until SIGTERM or SIGINT; in-flight requests finish first
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves once Ctrl+C (SIGINT) or, on Unix, SIGTERM is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
