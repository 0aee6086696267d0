use std::path::Path;
use super::{stem_of, DocumentConverter};
use super::document::{Block, ConvertedDocument};
use crate::error::Result;

/// Plain text fallback converter
///
/// Emits the whole file as a single text block. Used for extensions no
/// structured converter claims, and as the fallback when a structured
/// converter fails on malformed input (the partial-success path).
pub struct PlainTextConverter;

impl DocumentConverter for PlainTextConverter {
    fn format(&self) -> &'static str {
        "plaintext"
    }

    fn can_convert(&self, _extension: &str) -> bool {
        // Wildcard: handles any extension as a last resort
        true
    }

    fn convert(&self, content: &str, path: &Path) -> Result<ConvertedDocument> {
        let mut doc = ConvertedDocument::new(stem_of(path), path.to_string_lossy(), self.format());
        if !content.trim().is_empty() {
            doc.blocks.push(Block::Text {
                text: content.to_string(),
            });
        }
        Ok(doc)
    }
}
