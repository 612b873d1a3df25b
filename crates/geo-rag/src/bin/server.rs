//! Geo RAG API server
//!
//! Run with: cargo run -p geo-rag --bin geo-rag-server

use geo_rag::{config_path_from_env, init_tracing, server::GeoRagServer, GeoRagConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    init_tracing();

    let config_path = config_path_from_env();
    let config = GeoRagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Queue: {:?} ({})", config.queue.backend, config.queue.name);
    tracing::info!("  - Cache: {:?}", config.cache.backend);
    tracing::info!("  - Embeddings: {:?} {}", config.embeddings.backend, config.embeddings.model);
    tracing::info!("  - Summarizer: {:?} {}", config.summarizer.backend, config.summarizer.model);

    let embedded_workers = config.worker.embedded;
    let slots = config.worker.slots;
    let server = GeoRagServer::new(config).await?;

    let shutdown = CancellationToken::new();
    let mut workers = Vec::new();
    let mut pool_token = None;
    if embedded_workers {
        let pool = server.state().worker_pool();
        pool_token = Some(pool.shutdown_token());
        workers = pool.spawn(slots);
    } else {
        tracing::info!("Embedded workers disabled; run geo-rag-worker against the shared queue");
    }

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        signal_token.cancel();
    });

    tracing::info!("Listening on http://{}", server.address());
    server.start(shutdown).await?;

    if let Some(token) = pool_token {
        token.cancel();
    }
    futures::future::join_all(workers).await;

    Ok(())
}
