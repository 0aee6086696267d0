use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::db::Db;
use crate::db::probe::VECTOR_TABLE;
use crate::error::{DocragError, Result};
use super::chunker::Node;

/// Back-reference metadata stored alongside each vector, JSON-encoded in
/// the metadata column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeMetadata {
    pub doc_name: String,
    pub origin: String,
    pub position: usize,
    pub heading: Option<String>,
}

/// One similarity-search match.
#[derive(Debug, Clone)]
pub struct ScoredNode {
    pub node_id: String,
    pub text: String,
    pub score: f32,
    pub rank: usize,
    pub metadata: NodeMetadata,
}

/// Node id: SHA-256 over origin and position. Stable across rebuilds of
/// the same corpus, so a re-run upserts instead of duplicating.
pub fn node_id(origin: &str, position: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(origin.as_bytes());
    hasher.update(b"::");
    hasher.update(position.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create the vector table if absent. Called from the first indexing
/// write; the table is never dropped by this system.
pub async fn ensure_table(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    node_id TEXT PRIMARY KEY,
                    text TEXT NOT NULL,
                    embedding BLOB NOT NULL,
                    metadata TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )",
                VECTOR_TABLE
            ),
            [],
        )?;
        Ok(())
    })
    .await
}

/// Insert (node, vector) tuples transactionally.
///
/// Every vector is dimension-checked before anything is written; a single
/// mismatch fails the whole call.
pub async fn insert_nodes(
    db: &Db,
    dimensions: usize,
    entries: Vec<(Node, Vec<f32>)>,
) -> Result<usize> {
    if entries.is_empty() {
        return Ok(0);
    }

    for (node, embedding) in &entries {
        if embedding.len() != dimensions {
            log::error!(
                "Refusing to store node {} of {}: wrong embedding width",
                node.position,
                node.doc_name
            );
            return Err(DocragError::DimensionMismatch {
                expected: dimensions,
                actual: embedding.len(),
            });
        }
    }

    let count = db
        .with_connection(move |conn| {
            let tx = conn.transaction()?;
            let mut count = 0;
            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT OR REPLACE INTO {} (node_id, text, embedding, metadata, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    VECTOR_TABLE
                ))?;

                for (node, embedding) in &entries {
                    let metadata = NodeMetadata {
                        doc_name: node.doc_name.clone(),
                        origin: node.origin.clone(),
                        position: node.position,
                        heading: node.heading.clone(),
                    };
                    let metadata_json = serde_json::to_string(&metadata)
                        .map_err(|e| DocragError::Store(format!("Failed to encode metadata: {}", e)))?;

                    stmt.execute(params![
                        node_id(&node.origin, node.position),
                        node.text,
                        encode_embedding(embedding),
                        metadata_json,
                        Utc::now().to_rfc3339(),
                    ])?;
                    count += 1;
                }
            }
            tx.commit()?;
            Ok::<usize, DocragError>(count)
        })
        .await?;

    Ok(count)
}

/// Number of stored nodes.
pub async fn count_nodes(db: &Db) -> Result<usize> {
    db.with_connection(|conn| {
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", VECTOR_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    })
    .await
}

/// Nearest-neighbor search: cosine similarity over every stored vector,
/// sorted descending, truncated to `k`, filtered by `min_score`.
///
/// A stored vector whose width disagrees with `dimensions` is a hard
/// error — it means the table was written by a different model
/// configuration and every score against it would be garbage.
pub async fn top_k(
    db: &Db,
    dimensions: usize,
    query_vec: &[f32],
    k: usize,
    min_score: f32,
) -> Result<Vec<ScoredNode>> {
    if query_vec.len() != dimensions {
        return Err(DocragError::DimensionMismatch {
            expected: dimensions,
            actual: query_vec.len(),
        });
    }

    let rows = db
        .with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT node_id, text, embedding, metadata FROM {}",
                VECTOR_TABLE
            ))?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                ));
            }
            Ok::<Vec<_>, DocragError>(out)
        })
        .await?;

    let mut scored: Vec<(f32, ScoredNode)> = Vec::new();
    for (node_id, text, blob, metadata_json) in rows {
        let embedding = decode_embedding(&blob).ok_or_else(|| {
            DocragError::Store(format!("Corrupt embedding BLOB for node {}", node_id))
        })?;
        if embedding.len() != dimensions {
            return Err(DocragError::DimensionMismatch {
                expected: dimensions,
                actual: embedding.len(),
            });
        }

        let metadata: NodeMetadata = serde_json::from_str(&metadata_json)
            .map_err(|e| DocragError::Store(format!("Corrupt metadata for node {}: {}", node_id, e)))?;

        let score = cosine_similarity(query_vec, &embedding);
        if score < min_score {
            continue;
        }

        scored.push((
            score,
            ScoredNode {
                node_id,
                text,
                score,
                rank: 0,
                metadata,
            },
        ));
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    Ok(scored
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(idx, (_, mut node))| {
            node.rank = idx + 1;
            node
        })
        .collect())
}

/// Encode an embedding as a little-endian f32 BLOB
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 BLOB; None when the length is not a
/// multiple of four bytes.
fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
