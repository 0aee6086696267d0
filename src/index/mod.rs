pub mod chunker;
pub mod store;

use std::path::Path;
use walkdir::WalkDir;
use crate::config::ChunkingConfig;
use crate::convert::ConvertedDocument;
use crate::db::claim::RebuildClaim;
use crate::db::{vectors_exist, Db};
use crate::embed::Embedder;
use crate::error::Result;

pub use chunker::{chunk_document, Node};
pub use store::{NodeMetadata, ScoredNode};

/// Logical binding to the vector store table.
///
/// Stateless beyond the database handle and the expected vector
/// dimension; recreated per process invocation. The table itself is the
/// durable source of truth.
pub struct IndexHandle {
    db: Db,
    dimensions: usize,
}

impl IndexHandle {
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Nearest-neighbor search over the bound table.
    pub async fn top_k(&self, query_vec: &[f32], k: usize, min_score: f32) -> Result<Vec<ScoredNode>> {
        store::top_k(&self.db, self.dimensions, query_vec, k, min_score).await
    }
}

/// Bind a handle to the existing vector table without reading or
/// re-embedding anything. Valid immediately after the Existence Prober
/// reports the table, including across process restarts.
pub fn load_index(db: &Db, dimensions: usize) -> IndexHandle {
    log::info!("Loading existing vectors from database...");
    IndexHandle {
        db: db.clone(),
        dimensions,
    }
}

/// Create the vector index, or reuse the existing one.
///
/// When the table already exists and `force_rebuild` is false this is
/// exactly `load_index`: zero document reads, zero embedding calls.
/// Otherwise every file under `docs_dir` is read as a converted JSON
/// document, chunked, embedded (with progress logging) and persisted,
/// creating the table on first write. The rebuild claim is held for the
/// duration of the build so two processes cannot build concurrently.
pub async fn create_index(
    db: &Db,
    embedder: &dyn Embedder,
    docs_dir: &Path,
    chunking: &ChunkingConfig,
    batch_size: usize,
    force_rebuild: bool,
) -> Result<IndexHandle> {
    if vectors_exist(db).await.assume_built() && !force_rebuild {
        return Ok(load_index(db, embedder.dimensions()));
    }

    log::info!("Creating new vector store...");
    let claim = RebuildClaim::acquire(db).await?;

    let result = build_index(db, embedder, docs_dir, chunking, batch_size).await;
    match result {
        Ok(handle) => {
            claim.release().await?;
            Ok(handle)
        }
        Err(e) => {
            // Build failures are fatal, but the claim must not outlive us
            if let Err(release_err) = claim.release().await {
                log::warn!("Failed to release rebuild claim: {}", release_err);
            }
            Err(e)
        }
    }
}

async fn build_index(
    db: &Db,
    embedder: &dyn Embedder,
    docs_dir: &Path,
    chunking: &ChunkingConfig,
    batch_size: usize,
) -> Result<IndexHandle> {
    // Generic directory read: every file is treated as a converted JSON
    // document, whatever its extension.
    let mut documents = Vec::new();
    for entry in WalkDir::new(docs_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.path().is_file() {
            continue;
        }
        documents.push(ConvertedDocument::read_json(entry.path())?);
    }
    log::info!("Read {} converted documents from {}", documents.len(), docs_dir.display());

    let mut nodes: Vec<Node> = Vec::new();
    for doc in &documents {
        nodes.extend(chunk_document(doc, chunking));
    }

    store::ensure_table(db).await?;

    if nodes.is_empty() {
        log::warn!("No retrieval nodes produced from {}", docs_dir.display());
        return Ok(IndexHandle {
            db: db.clone(),
            dimensions: embedder.dimensions(),
        });
    }

    // Bulk embedding is the long pole of a rebuild; progress is reported
    // as each batch lands.
    let total = nodes.len();
    let batch_size = batch_size.max(1);
    let mut embedded = 0usize;
    let mut entries: Vec<(Node, Vec<f32>)> = Vec::with_capacity(total);

    for batch in nodes.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|n| n.text.clone()).collect();
        let vectors = embedder.embed_batch(texts).await?;
        if vectors.len() != batch.len() {
            return Err(crate::error::DocragError::Embedding(format!(
                "Embedder returned {} vectors for {} nodes",
                vectors.len(),
                batch.len()
            )));
        }

        entries.extend(batch.iter().cloned().zip(vectors));
        embedded += batch.len();
        let percentage = (embedded as f64 / total as f64) * 100.0;
        log::info!("Embedding progress: {}/{} nodes ({:.1}%)", embedded, total, percentage);
    }

    let inserted = store::insert_nodes(db, embedder.dimensions(), entries).await?;
    log::info!("Indexed {} nodes from {} documents", inserted, documents.len());

    Ok(IndexHandle {
        db: db.clone(),
        dimensions: embedder.dimensions(),
    })
}
