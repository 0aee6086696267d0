use async_trait::async_trait;
use sha2::{Digest, Sha256};
use super::Embedder;
use crate::error::Result;

/// Deterministic offline embedder.
///
/// Produces hash-seeded pseudo-vectors: equal text always yields the same
/// vector, distinct texts yield (practically always) distinct vectors. No
/// semantic meaning — useful for pipeline tests and offline smoke runs
/// where the real model is unavailable.
pub struct NoopEmbedder {
    dimensions: usize,
}

impl NoopEmbedder {
    /// Create a no-op embedder with the default dimension (384).
    pub fn new() -> Self {
        Self { dimensions: 384 }
    }

    /// Create a no-op embedder with a custom dimension.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn pseudo_vector(&self, text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dimensions);
        let mut block: u32 = 0;

        while out.len() < self.dimensions {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(block.to_le_bytes());
            let digest = hasher.finalize();

            for chunk in digest.chunks(4) {
                if out.len() == self.dimensions {
                    break;
                }
                let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                // Map to [-1, 1]
                out.push((word as f32 / u32::MAX as f32) * 2.0 - 1.0);
            }
            block += 1;
        }

        out
    }
}

impl Default for NoopEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for NoopEmbedder {
    fn model_name(&self) -> &str {
        "noop"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.pseudo_vector(t)).collect())
    }
}
