//! Summarizer provider trait

use async_trait::async_trait;
use crate::error::Result;

/// Trait for turning retrieved context into a summary
///
/// Implementations:
/// - `OllamaSummarizer`: Local Ollama server
/// - `OpenAiSummarizer`: OpenAI chat completions (gpt-4)
#[async_trait]
pub trait SummarizerProvider: Send + Sync {
    /// Summarize the retrieval context
    async fn summarize(&self, context: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
