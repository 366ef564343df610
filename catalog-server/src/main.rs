//! catalog-server: accepts catalog uploads and runs imports in the background

use catalog_server::utils::init_logger;
use catalog_server::{Config, ServerState, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!("Starting catalog-server (env: {})", config.environment);

    let http_port = config.http_port;
    let state = ServerState::initialize(config).await?;
    let jobs = state.jobs.clone();
    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("catalog-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
                return;
            }
            tracing::info!(running = jobs.len(), "Shutdown requested, cancelling imports");
            jobs.cancel_all();
        })
        .await?;

    Ok(())
}
