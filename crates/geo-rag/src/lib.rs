//! geo-rag: asynchronous geospatial file summarization
//!
//! An upload is stored in a blob store and queued; a worker fetches it,
//! embeds a textual description, indexes the vector, retrieves similar
//! tasks and summarizes them. Clients poll for the result by task id.
//! Every external system sits behind a provider trait, so the pipeline
//! runs against local, hosted or in-process backends alike.

pub mod config;
pub mod error;
pub mod generation;
pub mod processing;
pub mod providers;
pub mod query;
pub mod server;
pub mod store;
pub mod types;

pub use config::GeoRagConfig;
pub use error::{Error, Result};
pub use processing::{TaskDispatcher, TaskOutcome, TaskPipeline, WorkerPool};
pub use query::StatusQueryService;
pub use types::{TaskId, TaskMessage, TaskState, TaskStatus};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber used by the binaries
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geo_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Configuration file named by `GEO_RAG_CONFIG`, if any
pub fn config_path_from_env() -> Option<std::path::PathBuf> {
    std::env::var_os("GEO_RAG_CONFIG").map(std::path::PathBuf::from)
}
