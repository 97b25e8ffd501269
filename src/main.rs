use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use glamo_gateway::{
    client::{AnalysisBackend, AnalysisClient, DemoBackend},
    config::Config,
    routes::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();

    let backend: Arc<dyn AnalysisBackend> = match &config.analysis_url {
        Some(url) => {
            tracing::info!("Using analysis service at {}", url);
            Arc::new(AnalysisClient::new(url.clone()))
        }
        None => {
            tracing::warn!("GLAMO_ANALYSIS_URL not set, running in demo mode");
            Arc::new(DemoBackend)
        }
    };
    tracing::info!(
        max_dimension = config.preprocess.max_dimension,
        quality = config.preprocess.quality,
        "Image pre-processing configured"
    );

    let app = router(AppState::new(backend, config.preprocess));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "Starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("server error")?;
    Ok(())
}
