//! Shared fixtures for the HTTP integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use geo_rag::config::{BlobBackend, GeoRagConfig};
use geo_rag::error::{Error, Result};
use geo_rag::providers::local::{HashingEmbedder, LocalVectorIndex};
use geo_rag::providers::memory::{ChannelQueue, MemoryBlobStore, MemoryCache};
use geo_rag::providers::{BlobStoreProvider, ProviderSet, QueueProvider, SummarizerProvider};
use geo_rag::server::{build_router, state::AppState};
use geo_rag::{TaskOutcome, TaskPipeline};

pub const BOUNDARY: &str = "----GeoRagTestBoundary7MA4YWxk";

/// Summarizer double: fails for any context mentioning `fail_marker`
pub struct ScriptedSummarizer {
    fail_marker: Option<String>,
}

impl ScriptedSummarizer {
    pub fn ok() -> Self {
        Self { fail_marker: None }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
        }
    }
}

#[async_trait]
impl SummarizerProvider for ScriptedSummarizer {
    async fn summarize(&self, context: &str) -> Result<String> {
        if let Some(marker) = &self.fail_marker {
            if context.contains(marker.as_str()) {
                return Err(Error::summarizer("model unavailable"));
            }
        }
        let lines = context.split("\n\n").count();
        Ok(format!("Geospatial summary over {} context sections.", lines))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Blob store double whose writes always fail
pub struct UnavailableBlobStore;

#[async_trait]
impl BlobStoreProvider for UnavailableBlobStore {
    async fn put(&self, _path: &str, _data: &[u8], _content_type: &str) -> Result<()> {
        Err(Error::storage("container unavailable"))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        Err(Error::storage(format!("Object not found: {}", path)))
    }

    async fn exists(&self, _path: &str) -> Result<bool> {
        Ok(false)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "unavailable-blob"
    }
}

/// In-process deployment with handles on every collaborator
pub struct Harness {
    pub config: GeoRagConfig,
    pub state: AppState,
    pub providers: ProviderSet,
    pub blobs: Arc<MemoryBlobStore>,
    pub queue: Arc<ChannelQueue>,
    pub cache: Arc<MemoryCache>,
}

impl Harness {
    pub fn new(summarizer: ScriptedSummarizer) -> Self {
        Self::with_config(summarizer, |_| {})
    }

    /// Like `new`, with `configure` applied on top of the test defaults
    pub fn with_config(
        summarizer: ScriptedSummarizer,
        configure: impl FnOnce(&mut GeoRagConfig),
    ) -> Self {
        let mut config = GeoRagConfig::default();
        config.storage.backend = BlobBackend::Memory;
        config.worker.slots = 2;
        configure(&mut config);

        let blobs = Arc::new(MemoryBlobStore::new());
        let queue = Arc::new(ChannelQueue::new(64));
        let cache = Arc::new(MemoryCache::new());

        let providers = ProviderSet {
            blob_store: blobs.clone(),
            queue: queue.clone(),
            cache: cache.clone(),
            embedder: Arc::new(HashingEmbedder::new(64)),
            vector_index: Arc::new(LocalVectorIndex::new()),
            summarizer: Arc::new(summarizer),
        };
        let state = AppState::new(config.clone(), providers.clone());

        Self {
            config,
            state,
            providers,
            blobs,
            queue,
            cache,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn pipeline(&self) -> TaskPipeline {
        self.providers.pipeline(&self.config)
    }

    /// Run the pipeline on the next queued message
    pub async fn process_next(&self) -> TaskOutcome {
        let message = self
            .queue
            .receive()
            .await
            .expect("queue receive")
            .expect("a queued message");
        self.pipeline().process(&message).await
    }

    pub async fn submit(&self, filename: &str, content_type: &str, data: &[u8]) -> Response<Body> {
        self.router()
            .oneshot(multipart_request(filename, content_type, data))
            .await
            .expect("submit handler should respond")
    }

    pub async fn get_summary(&self, task_id: &str) -> Response<Body> {
        self.router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/get_summary/{}", task_id))
                    .body(Body::empty())
                    .expect("request builder should not fail"),
            )
            .await
            .expect("summary handler should respond")
    }
}

/// POST /submit_data with one file part
pub fn multipart_request(filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\
             \r\n",
            boundary = BOUNDARY,
            filename = filename,
            content_type = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/submit_data")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("request builder should not fail")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body must be readable")
        .to_bytes();
    serde_json::from_slice(bytes.as_ref()).expect("response must be valid JSON")
}

/// Task id from a 202 submit response
pub async fn task_id_of(response: Response<Body>) -> String {
    let value = json_body(response).await;
    value["data"]["task_id"]
        .as_str()
        .expect("submit response should carry data.task_id")
        .to_string()
}
