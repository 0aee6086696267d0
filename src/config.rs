use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub embeddings: EmbeddingsConfig,
    pub chunking: ChunkingConfig,
    pub query: QueryConfig,
}

/// Pipeline paths and logging
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Source documents to convert and index.
    pub input_docs: Vec<PathBuf>,
    /// Directory for the intermediate converted JSON documents.
    pub converted_dir: PathBuf,
    /// SQLite database file backing the vector store.
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Embeddings provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    /// OpenAI-compatible embeddings endpoint URL.
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub batch_size: usize,
    /// Expected output dimension. Must match the model and the stored
    /// vectors exactly; a mismatch anywhere is a hard failure.
    pub dimensions: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Chunking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

/// Query configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    pub top_k: usize,
    pub min_score: f32,
    /// Demonstration query issued at the end of a pipeline run.
    pub demo_text: String,
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in DOCRAG_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("DOCRAG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.pipeline.input_docs.is_empty() {
            anyhow::bail!("pipeline.input_docs must list at least one document");
        }

        // Required credential: absence is a fatal startup condition.
        // Checked against the environment and any .env already loaded above.
        std::env::var(&self.embeddings.api_key_env)
            .with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable with your embeddings API key.",
                    self.embeddings.api_key_env
                )
            })?;

        if self.embeddings.dimensions == 0 {
            anyhow::bail!("embeddings.dimensions must be greater than 0");
        }

        if self.embeddings.batch_size == 0 {
            anyhow::bail!("embeddings.batch_size must be greater than 0");
        }

        if self.query.top_k == 0 {
            anyhow::bail!("query.top_k must be greater than 0");
        }

        if self.query.min_score < 0.0 || self.query.min_score > 1.0 {
            anyhow::bail!("query.min_score must be between 0.0 and 1.0");
        }

        if self.chunking.max_tokens == 0 {
            anyhow::bail!("chunking.max_tokens must be greater than 0");
        }

        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            anyhow::bail!("chunking.overlap_tokens must be less than max_tokens");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.pipeline.db_path
    }

    /// Get the converted-documents directory
    pub fn converted_dir(&self) -> &Path {
        &self.pipeline.converted_dir
    }
}
