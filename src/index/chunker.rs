use crate::config::ChunkingConfig;
use crate::convert::{Block, ConvertedDocument};

/// A retrieval unit: one bounded span of text with back-references to the
/// converted document it came from. Immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub text: String,
    pub doc_name: String,
    pub origin: String,
    /// Document-wide node position, part of the node id.
    pub position: usize,
    pub heading: Option<String>,
}

/// Split a converted document into retrieval nodes.
///
/// Structure-aware: section blocks chunk within their heading scope, a
/// table flattens to a single node, and loose text chunks on its own —
/// a chunk never spans block boundaries.
pub fn chunk_document(doc: &ConvertedDocument, config: &ChunkingConfig) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut position = 0;

    let mut push = |text: String, heading: Option<String>, nodes: &mut Vec<Node>| {
        nodes.push(Node {
            text,
            doc_name: doc.name.clone(),
            origin: doc.origin.clone(),
            position,
            heading,
        });
        position += 1;
    };

    for block in &doc.blocks {
        match block {
            Block::Section { heading, text, .. } => {
                for chunk in chunk_text(text, config.max_tokens, config.overlap_tokens) {
                    push(chunk, Some(heading.clone()), &mut nodes);
                }
            }
            Block::Text { text } => {
                for chunk in chunk_text(text, config.max_tokens, config.overlap_tokens) {
                    push(chunk, None, &mut nodes);
                }
            }
            Block::Table { caption, rows } => {
                let flat = flatten_table(caption.as_deref(), rows);
                if !flat.is_empty() {
                    push(flat, caption.clone(), &mut nodes);
                }
            }
        }
    }

    nodes
}

/// Flatten a table to one pipe-joined line per row, caption first.
fn flatten_table(caption: Option<&str>, rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut lines = Vec::with_capacity(rows.len() + 1);
    if let Some(caption) = caption {
        lines.push(caption.to_string());
    }
    for row in rows {
        lines.push(row.join(" | "));
    }
    lines.join("\n")
}

/// Chunk text into windows with overlap.
///
/// Token sizes are approximated at ~4 characters per token. Windowing is
/// done over chars, so multi-byte text never splits inside a character;
/// when a window would cut mid-word, the break backs off to the nearest
/// whitespace in the final fifth of the window.
fn chunk_text(text: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let window = max_tokens.max(1) * 4;
    let overlap = overlap_tokens * 4;

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= window {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut end = (start + window).min(chars.len());

        if end < chars.len() {
            let floor = end.saturating_sub(window / 5).max(start + 1);
            if let Some(ws) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
                end = ws + 1;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }

        if end >= chars.len() {
            break;
        }

        // Step back for overlap, but always make forward progress
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Block;

    fn test_config() -> ChunkingConfig {
        ChunkingConfig {
            max_tokens: 300,
            overlap_tokens: 50,
        }
    }

    fn doc_with_blocks(blocks: Vec<Block>) -> ConvertedDocument {
        let mut doc = ConvertedDocument::new("manual", "docs/manual.md", "markdown");
        doc.blocks = blocks;
        doc
    }

    #[test]
    fn test_short_section_is_one_node() {
        let doc = doc_with_blocks(vec![Block::Section {
            heading: "Album".to_string(),
            level: 1,
            text: "Stores albums.".to_string(),
        }]);

        let nodes = chunk_document(&doc, &test_config());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text, "Stores albums.");
        assert_eq!(nodes[0].heading.as_deref(), Some("Album"));
        assert_eq!(nodes[0].doc_name, "manual");
        assert_eq!(nodes[0].position, 0);
    }

    #[test]
    fn test_long_section_splits_with_overlap() {
        let long = "word ".repeat(1000); // ~5000 chars, window is 1200
        let doc = doc_with_blocks(vec![Block::Section {
            heading: "Long".to_string(),
            level: 1,
            text: long,
        }]);

        let nodes = chunk_document(&doc, &test_config());
        assert!(nodes.len() >= 4);
        // All nodes stay inside the heading scope
        assert!(nodes.iter().all(|n| n.heading.as_deref() == Some("Long")));
        // Positions are sequential
        for (i, node) in nodes.iter().enumerate() {
            assert_eq!(node.position, i);
        }
        // No chunk dramatically exceeds the window
        assert!(nodes.iter().all(|n| n.text.chars().count() <= 300 * 4 + 1));
    }

    #[test]
    fn test_chunks_do_not_span_blocks() {
        let doc = doc_with_blocks(vec![
            Block::Section {
                heading: "First".to_string(),
                level: 1,
                text: "alpha".to_string(),
            },
            Block::Section {
                heading: "Second".to_string(),
                level: 1,
                text: "beta".to_string(),
            },
        ]);

        let nodes = chunk_document(&doc, &test_config());
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].text, "alpha");
        assert_eq!(nodes[1].text, "beta");
        assert_ne!(nodes[0].heading, nodes[1].heading);
    }

    #[test]
    fn test_table_flattens_to_single_node() {
        let doc = doc_with_blocks(vec![Block::Table {
            caption: Some("Columns".to_string()),
            rows: vec![
                vec!["name".to_string(), "type".to_string()],
                vec!["album_id".to_string(), "integer".to_string()],
            ],
        }]);

        let nodes = chunk_document(&doc, &test_config());
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].text.contains("Columns"));
        assert!(nodes[0].text.contains("album_id | integer"));
        assert_eq!(nodes[0].heading.as_deref(), Some("Columns"));
    }

    #[test]
    fn test_multibyte_text_survives_chunking() {
        let long = "héllo wörld ".repeat(500);
        let nodes = chunk_text(&long, 100, 20);
        assert!(nodes.len() > 1);
        // Reassembled chunks contain only whole characters
        for chunk in &nodes {
            assert!(chunk.chars().all(|c| c != '\u{FFFD}'));
        }
    }

    #[test]
    fn test_empty_document_yields_no_nodes() {
        let doc = doc_with_blocks(vec![Block::Text {
            text: "   ".to_string(),
        }]);
        assert!(chunk_document(&doc, &test_config()).is_empty());
    }
}
