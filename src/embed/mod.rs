pub mod http;
pub mod noop;
pub mod cache;

use async_trait::async_trait;
use crate::error::{DocragError, Result};

pub use http::HttpEmbedder;
pub use noop::NoopEmbedder;
pub use cache::QueryEmbeddingCache;

/// Trait for embedding models.
///
/// One embedder instance is constructed by the orchestrator and handed to
/// both the indexing and query stages, so the model used at query time is
/// the model used at index time by construction.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier
    fn model_name(&self) -> &str;

    /// Output vector dimension
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts; one vector per input, in input order.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(vec![text.to_string()]).await?;
        if out.is_empty() {
            return Err(DocragError::Embedding("empty embedding result".to_string()));
        }
        Ok(out.remove(0))
    }
}
