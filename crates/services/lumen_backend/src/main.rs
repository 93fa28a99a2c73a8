// --- File: services/lumen_backend/src/main.rs ---
use std::path::Path;
use std::sync::Arc;

use lumen_common::logging;
use lumen_config::load_config;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod app_state;
use app_state::AppRuntime;

#[tokio::main]
async fn main() {
    // Config comes first: it decides where the logs go.
    let config = Arc::new(load_config().expect("Failed to load config"));

    let log_dir = config.logging.directory.as_deref().map(Path::new);
    logging::init_server("lumen", log_dir).expect("Failed to initialize logging");

    info!("Starting lumen control plane");
    info!("✅ Configuration loaded.");

    let AppRuntime {
        config,
        api,
        processor,
        kill,
    } = AppRuntime::new(config)
        .await
        .expect("Failed to initialize application state");

    // The processor is the only task allowed to touch the connection pool.
    let processor_handle = tokio::spawn(processor.run());

    let app = lumen_api::routes(api);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    info!("Starting server at http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Drain the pool before exiting so every device sees a clean close.
    info!("HTTP server stopped, draining device control processor");
    if kill.send(()).await.is_err() {
        warn!("device control processor already terminated");
    }
    processor_handle
        .await
        .expect("Device control processor task failed");

    info!("Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!("failed to install ctrl-c handler: {}", error);
    }
}
