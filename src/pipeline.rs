use std::sync::Arc;
use crate::config::Config;
use crate::convert::{convert_documents, ConverterRegistry};
use crate::db::{vectors_exist, Db};
use crate::embed::{Embedder, HttpEmbedder, QueryEmbeddingCache};
use crate::error::Result;
use crate::index::{create_index, load_index};
use crate::query::QueryEngine;

/// Run the full pipeline with the configured HTTP embedder and return the
/// demonstration query's answer.
pub async fn run(config: &Config, force_rebuild: bool) -> Result<String> {
    let cache = Arc::new(QueryEmbeddingCache::new(config.embeddings.cache_capacity));
    let embedder = HttpEmbedder::from_config(&config.embeddings)?.with_cache(cache);
    run_with_embedder(config, Arc::new(embedder), force_rebuild).await
}

/// Pipeline orchestration with an explicit embedder handle.
///
/// The same handle is threaded into both the indexing and query stages;
/// there is no ambient model state that could drift between them.
///
/// Sequence: validate connectivity (fatal if unreachable), probe for an
/// existing index, then either convert + build (full rebuild path) or
/// bind to the existing table (fast path), and finally answer the
/// demonstration query.
pub async fn run_with_embedder(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    force_rebuild: bool,
) -> Result<String> {
    let db = Db::new(config.db_path());
    db.ping().await?;
    log::info!("Database connection validated");

    let check = vectors_exist(&db).await;
    log::debug!("Existence probe: {:?}", check);

    let handle = if force_rebuild || !check.assume_built() {
        log::info!("Converting documents and creating index...");
        let registry = ConverterRegistry::new();
        let counts = convert_documents(
            &registry,
            &config.pipeline.input_docs,
            config.converted_dir(),
        )?;
        log::info!(
            "Converted {} document(s), {} partial",
            counts.success, counts.partial
        );

        create_index(
            &db,
            embedder.as_ref(),
            config.converted_dir(),
            &config.chunking,
            config.embeddings.batch_size,
            force_rebuild,
        )
        .await?
    } else {
        log::info!("Using existing vector index");
        load_index(&db, embedder.dimensions())
    };

    let engine = QueryEngine::new(
        handle,
        Arc::clone(&embedder),
        config.query.top_k,
        config.query.min_score,
    );
    engine.query(&config.query.demo_text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use crate::config::{ChunkingConfig, EmbeddingsConfig, PipelineConfig, QueryConfig};
    use crate::db::VectorsCheck;
    use crate::embed::NoopEmbedder;

    fn test_config(temp_dir: &TempDir) -> (Config, PathBuf) {
        let doc = temp_dir.path().join("dictionary.md");
        fs::write(
            &doc,
            "# Album\n\nThe album table stores album titles and artist references.\n",
        )
        .unwrap();

        let config = Config {
            pipeline: PipelineConfig {
                input_docs: vec![doc.clone()],
                converted_dir: temp_dir.path().join("converted"),
                db_path: temp_dir.path().join("vectors.db"),
                log_level: "info".to_string(),
            },
            embeddings: EmbeddingsConfig {
                endpoint: "http://localhost:8080/v1/embeddings".to_string(),
                model: "noop".to_string(),
                api_key_env: "EMBEDDINGS_API_KEY".to_string(),
                batch_size: 16,
                dimensions: 384,
                cache_capacity: 8,
            },
            chunking: ChunkingConfig {
                max_tokens: 300,
                overlap_tokens: 50,
            },
            query: QueryConfig {
                top_k: 3,
                min_score: 0.0,
                // Exactly the indexed sentence: under the deterministic
                // test embedder this scores 1.0, so a ranked answer is
                // guaranteed whenever the index is intact.
                demo_text: "The album table stores album titles and artist references."
                    .to_string(),
            },
        };
        (config, doc)
    }

    fn noop() -> Arc<dyn Embedder> {
        Arc::new(NoopEmbedder::new())
    }

    #[tokio::test]
    async fn test_full_path_when_no_vectors() {
        let temp_dir = TempDir::new().unwrap();
        let (config, _doc) = test_config(&temp_dir);

        let db = Db::new(config.db_path());
        assert!(!vectors_exist(&db).await.assume_built());

        let answer = run_with_embedder(&config, noop(), false).await.unwrap();

        // Conversion wrote the intermediate JSON, indexing built the table
        assert!(config.converted_dir().join("dictionary.json").exists());
        assert_eq!(vectors_exist(&db).await, VectorsCheck::Exists);
        assert!(answer.contains("[1]"), "expected ranked answer, got: {}", answer);
    }

    #[tokio::test]
    async fn test_fast_path_when_vectors_present() {
        let temp_dir = TempDir::new().unwrap();
        let (config, doc) = test_config(&temp_dir);

        run_with_embedder(&config, noop(), false).await.unwrap();

        // Remove the source and the intermediate output: a second run
        // must not touch either when the table already exists.
        fs::remove_file(&doc).unwrap();
        fs::remove_dir_all(config.converted_dir()).unwrap();

        let answer = run_with_embedder(&config, noop(), false).await.unwrap();
        assert!(answer.contains("[1]"));
        assert!(!config.converted_dir().exists(), "fast path must not convert");
    }

    #[tokio::test]
    async fn test_force_rebuild_reconverts() {
        let temp_dir = TempDir::new().unwrap();
        let (config, _doc) = test_config(&temp_dir);

        run_with_embedder(&config, noop(), false).await.unwrap();
        fs::remove_dir_all(config.converted_dir()).unwrap();

        run_with_embedder(&config, noop(), true).await.unwrap();
        assert!(
            config.converted_dir().join("dictionary.json").exists(),
            "force rebuild must run conversion again"
        );
    }

    #[tokio::test]
    async fn test_unreachable_database_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let (mut config, _doc) = test_config(&temp_dir);
        // A directory cannot be opened as a database file
        config.pipeline.db_path = temp_dir.path().to_path_buf();

        let result = run_with_embedder(&config, noop(), false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_conversion_failure_aborts_run() {
        let temp_dir = TempDir::new().unwrap();
        let (mut config, _doc) = test_config(&temp_dir);
        config
            .pipeline
            .input_docs
            .push(temp_dir.path().join("missing.md"));

        let result = run_with_embedder(&config, noop(), false).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("1 of 2"), "got: {}", err);

        // No index was built from the partial corpus
        let db = Db::new(config.db_path());
        assert!(!vectors_exist(&db).await.assume_built());
    }
}
