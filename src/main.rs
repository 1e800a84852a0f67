use anyhow::Context;
use std::{sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use movie_recs::{
    cache::Cache,
    config::Config,
    routes::{create_router, AppState},
    services::{providers::TmdbProvider, RecommendationEngine},
    store::artifacts,
};

/// How often expired in-process cache entries are swept
const CACHE_EVICTION_PERIOD: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("movie_recs=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Catalogs and similarity structures are immutable for the process lifetime
    let content = artifacts::load_content(&config.data_dir)?;
    let collaborative = artifacts::load_collaborative(&config.data_dir)?;
    let engine = Arc::new(RecommendationEngine::new(content, collaborative));

    let (cache, cache_writer) = Cache::from_url(config.redis_url.as_deref())?;
    cache.spawn_eviction(CACHE_EVICTION_PERIOD);
    let provider = TmdbProvider::new(&config, cache).context("Failed to build TMDb client")?;

    let state = Arc::new(AppState {
        engine,
        metadata: Arc::new(provider),
        metadata_concurrency: config.metadata_concurrency,
    });

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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

    tracing::info!("Shutdown signal received");
}
