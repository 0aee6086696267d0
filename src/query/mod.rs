use std::sync::Arc;
use crate::embed::Embedder;
use crate::error::{DocragError, Result};
use crate::index::{IndexHandle, ScoredNode};

/// Query engine bound to one index handle and one embedder.
///
/// The embedder is the same handle the orchestrator passed to the
/// indexing stage, so query-time and index-time vectors always come from
/// the same model.
pub struct QueryEngine {
    handle: IndexHandle,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    min_score: f32,
}

impl QueryEngine {
    pub fn new(handle: IndexHandle, embedder: Arc<dyn Embedder>, top_k: usize, min_score: f32) -> Self {
        Self {
            handle,
            embedder,
            top_k,
            min_score,
        }
    }

    /// Answer a free-text query from the most similar stored passages.
    pub async fn query(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(DocragError::InvalidInput("Query text is empty".to_string()));
        }

        let query_vec = self.embedder.embed_query(text).await?;
        let matches = self
            .handle
            .top_k(&query_vec, self.top_k, self.min_score)
            .await?;

        log::debug!("Query \"{}\" matched {} passages", text, matches.len());
        Ok(synthesize_answer(text, &matches))
    }
}

/// Render the top matches as a readable answer context.
fn synthesize_answer(query: &str, matches: &[ScoredNode]) -> String {
    if matches.is_empty() {
        return format!("No relevant passages found for: \"{}\"", query);
    }

    let mut out = String::new();
    out.push_str(&format!("Top passages for: \"{}\"\n", query));

    for m in matches {
        out.push('\n');
        match &m.metadata.heading {
            Some(heading) => out.push_str(&format!(
                "[{}] {} / {} (score {:.3})\n",
                m.rank, m.metadata.doc_name, heading, m.score
            )),
            None => out.push_str(&format!(
                "[{}] {} (score {:.3})\n",
                m.rank, m.metadata.doc_name, m.score
            )),
        }
        out.push_str(&m.text);
        out.push('\n');
    }

    out
}
