//! Standalone worker consuming the shared task queue
//!
//! Run with: cargo run -p geo-rag --features redis --bin geo-rag-worker

use std::sync::Arc;

use geo_rag::{
    config::QueueBackend, config_path_from_env, init_tracing, providers::ProviderSet,
    GeoRagConfig, WorkerPool,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config_path = config_path_from_env();
    let config = GeoRagConfig::load(config_path.as_deref())?;

    if config.queue.backend == QueueBackend::Memory {
        anyhow::bail!(
            "queue.backend = \"memory\" only reaches workers inside the server process; \
             configure the redis queue to run standalone workers"
        );
    }

    let providers = ProviderSet::from_config(&config).await?;
    let pipeline = Arc::new(providers.pipeline(&config));
    let pool = WorkerPool::new(pipeline, providers.queue.clone());
    let shutdown = pool.shutdown_token();
    let workers = pool.spawn(config.worker.slots);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, waiting for in-flight tasks");
    shutdown.cancel();

    futures::future::join_all(workers).await;

    Ok(())
}
