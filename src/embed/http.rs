use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use super::{Embedder, QueryEmbeddingCache};
use crate::config::EmbeddingsConfig;
use crate::error::{DocragError, Result};

/// Hard cap on texts per request, matching common provider limits.
const MAX_BATCH: usize = 2048;

/// Request structure for the embeddings API
#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// Response structure from the embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings endpoint.
///
/// Works against any server speaking the `/v1/embeddings` shape — a hosted
/// provider or a local inference server fronting the configured model.
/// Splits large inputs into batches, paces between batches, retries
/// transient failures with exponential backoff, and enforces the
/// configured output dimension on every returned vector.
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    batch_size: usize,
    dimensions: usize,
    cache: Option<Arc<QueryEmbeddingCache>>,
}

impl HttpEmbedder {
    /// Create a new embedder client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation).
    pub fn new(
        endpoint: String,
        api_key: String,
        model: String,
        batch_size: usize,
        dimensions: usize,
    ) -> Self {
        let batch_size = batch_size.min(MAX_BATCH);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint,
            api_key,
            model,
            batch_size,
            dimensions,
            cache: None,
        }
    }

    /// Build from configuration, reading the API key from the configured
    /// environment variable. A missing credential is fatal.
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            DocragError::Config(format!(
                "Environment variable {} not set",
                config.api_key_env
            ))
        })?;

        Ok(Self::new(
            config.endpoint.clone(),
            api_key,
            config.model.clone(),
            config.batch_size,
            config.dimensions,
        ))
    }

    /// Attach a query-embedding cache.
    pub fn with_cache(mut self, cache: Arc<QueryEmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// One API request for one batch.
    async fn request_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DocragError::Embedding(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(DocragError::Embedding(format!(
                "Embeddings API error {}: {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DocragError::Embedding(format!("Failed to parse response: {}", e)))?;

        if result.data.len() != expected {
            return Err(DocragError::Embedding(format!(
                "Embeddings API returned {} vectors for {} inputs",
                result.data.len(),
                expected
            )));
        }

        let embeddings: Vec<Vec<f32>> = result.data.into_iter().map(|d| d.embedding).collect();

        // The model's output width must match the configured dimension
        // exactly; anything else corrupts the store.
        for embedding in &embeddings {
            if embedding.len() != self.dimensions {
                return Err(DocragError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    /// Embed a single text with retry on transient API failures
    /// (429 rate limit, 5xx) using exponential backoff.
    async fn embed_with_retry(&self, text: &str, max_retries: usize) -> Result<Vec<f32>> {
        let mut attempt = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            match self.request_batch(vec![text.to_string()]).await {
                Ok(mut embeddings) => {
                    if embeddings.is_empty() {
                        return Err(DocragError::Embedding(
                            "Empty response from embeddings API".to_string(),
                        ));
                    }
                    return Ok(embeddings.remove(0));
                }
                Err(e) if attempt < max_retries => {
                    let msg = e.to_string();
                    let should_retry = msg.contains("429")
                        || msg.contains("500")
                        || msg.contains("502")
                        || msg.contains("503")
                        || msg.contains("504");

                    if should_retry {
                        log::warn!("Retry {}/{} after error: {}", attempt + 1, max_retries, e);
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let embeddings = self.request_batch(chunk.to_vec()).await?;
            all_embeddings.extend(embeddings);

            // Pace full batches to stay under provider rate limits
            if chunk.len() == self.batch_size {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text) {
                log::debug!("Embedding cache hit for query: {}", text);
                return Ok(cached);
            }
        }

        let embedding = self.embed_with_retry(text, 3).await?;

        if let Some(cache) = &self.cache {
            cache.put(text.to_string(), embedding.clone());
        }

        Ok(embedding)
    }
}
