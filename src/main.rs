use std::sync::Arc;

use log::{error, info};
use survey_vote::config::Config;
use survey_vote::db::Database;
use survey_vote::handlers::{self, AppState};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() {
    // Load .env and initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Read settings from the environment
    let config = Config::from_env()?;

    // Connect to the database (creates it and the schema if needed)
    let database = Database::new(&config).await?;
    info!("Connected to {}", config.database_url);

    // Build the router with shared state
    let app = handlers::router(Arc::new(AppState { database }));

    // Bind the listener
    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {}", address);

    // Serve until Ctrl+C or SIGTERM
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    // No SIGTERM outside unix
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
