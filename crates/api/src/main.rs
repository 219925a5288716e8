//! Asfalis emergency alert API server.

use alert_engine::{AlertEngine, DangerClassifier};
use api::{AppState, Config};
use database::Database;
use notifier::{Notifier, NotifierConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(addr = %config.addr, "Starting alert API server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Outbound channels and the danger model degrade to logging / no model
    let notifier = Notifier::from_config(NotifierConfig::from_env());
    let classifier = DangerClassifier::from_path(config.danger_model_path.as_deref());

    let engine = AlertEngine::new(db.clone(), notifier, classifier, config.engine_config());
    let app = api::app(AppState::new(engine));

    // Start server
    info!(addr = %config.addr, "Alert API server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Alert API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Keep serving without graceful shutdown
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
