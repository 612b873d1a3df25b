//! Pinecone vector index over the REST data plane

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};

use super::retry::retry_request;
use super::vector_index::{VectorIndexProvider, VectorMatch};

/// Pinecone index client bound to one index host
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
    index_name: String,
    namespace: Option<String>,
    max_retries: u32,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

impl PineconeIndex {
    /// Create a client from the vector index configuration
    pub fn new(config: &VectorIndexConfig, timeout_secs: u64, max_retries: u32) -> Result<Self> {
        let host = config
            .host
            .clone()
            .ok_or_else(|| Error::Config("PINECONE_INDEX_HOST is not set".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("PINECONE_API_KEY is not set".to_string()))?;

        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            api_key,
            index_name: config.index_name.clone(),
            namespace: config.namespace.clone(),
            max_retries,
        })
    }

    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::vector_index(format!("Request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::vector_index(format!(
                "{} {} failed: HTTP {} - {}",
                self.index_name, path, status, text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl VectorIndexProvider for PineconeIndex {
    async fn upsert(&self, id: &str, vector: &[f32]) -> Result<()> {
        let request = UpsertRequest {
            vectors: vec![UpsertVector { id, values: vector }],
            namespace: self.namespace.as_deref(),
        };

        retry_request(self.max_retries, "Pinecone upsert", || async {
            self.post_json("/vectors/upsert", &request).await.map(|_| ())
        })
        .await
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_values: false,
            include_metadata: false,
            namespace: self.namespace.as_deref(),
        };

        retry_request(self.max_retries, "Pinecone query", || async {
            let response = self.post_json("/query", &request).await?;
            let parsed: QueryResponse = response.json().await.map_err(|e| {
                Error::vector_index(format!("Failed to parse query response: {}", e))
            })?;
            Ok(parsed.matches)
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/describe_index_stats", self.host);
        match self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&serde_json::json!({}))
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
