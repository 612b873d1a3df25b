//! Application state shared by the HTTP handlers

use std::sync::Arc;

use crate::config::GeoRagConfig;
use crate::error::Result;
use crate::processing::{TaskDispatcher, TaskPipeline, WorkerPool};
use crate::providers::{ComponentHealth, ProviderSet};
use crate::query::StatusQueryService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: GeoRagConfig,
    /// Collaborator handles
    providers: ProviderSet,
    /// Submission side
    dispatcher: TaskDispatcher,
    /// Read side
    query: StatusQueryService,
    /// Processing pipeline, shared by embedded workers
    pipeline: Arc<TaskPipeline>,
}

impl AppState {
    /// Build state with the collaborators selected in `config`
    pub async fn from_config(config: GeoRagConfig) -> Result<Self> {
        let providers = ProviderSet::from_config(&config).await?;
        Ok(Self::new(config, providers))
    }

    /// Build state around already constructed collaborators
    pub fn new(config: GeoRagConfig, providers: ProviderSet) -> Self {
        let dispatcher = providers.dispatcher(config.server.allowed_content_types.clone());
        let query = providers.query_service();
        let pipeline = Arc::new(providers.pipeline(&config));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                providers,
                dispatcher,
                query,
                pipeline,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &GeoRagConfig {
        &self.inner.config
    }

    /// Get the task dispatcher
    pub fn dispatcher(&self) -> &TaskDispatcher {
        &self.inner.dispatcher
    }

    /// Get the status query service
    pub fn query(&self) -> &StatusQueryService {
        &self.inner.query
    }

    /// Worker pool consuming this state's queue with its pipeline
    pub fn worker_pool(&self) -> WorkerPool {
        WorkerPool::new(self.inner.pipeline.clone(), self.inner.providers.queue.clone())
    }

    /// Health of every collaborator
    pub async fn health(&self) -> Vec<ComponentHealth> {
        self.inner.providers.health().await
    }
}
