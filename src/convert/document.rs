use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{DocragError, Result};

/// Normalized representation of a converted source document.
///
/// A flat ordered tree of blocks: headed sections, tables, and loose text.
/// Serialized to `<converted_dir>/<name>.json` by the conversion stage and
/// read back by the indexing stage; the JSON file is the only interface
/// between the two stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConvertedDocument {
    /// Source file stem, also the output file name.
    pub name: String,
    /// Original source path, carried into node metadata.
    pub origin: String,
    /// Converter that produced the tree (e.g. "markdown").
    pub format: String,
    pub blocks: Vec<Block>,
}

/// One logical block of a converted document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// A headed span of text (markdown heading, XML element, config key).
    Section {
        heading: String,
        level: u8,
        text: String,
    },
    /// A table, kept row-structured so chunking can flatten it as a unit.
    Table {
        caption: Option<String>,
        rows: Vec<Vec<String>>,
    },
    /// Text outside any section.
    Text { text: String },
}

impl ConvertedDocument {
    pub fn new(name: impl Into<String>, origin: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            format: format.into(),
            blocks: Vec::new(),
        }
    }

    /// Serialize to `<dir>/<name>.json`, overwriting any previous file.
    /// Conversion is idempotent and re-runnable.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.json", self.name));
        let json = serde_json::to_string(self)
            .map_err(|e| DocragError::Conversion(format!("Failed to serialize {}: {}", self.name, e)))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Deserialize a converted document from a JSON file.
    pub fn read_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            DocragError::Conversion(format!(
                "Failed to parse converted document {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// True when no block carries any text.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| match b {
            Block::Section { text, heading, .. } => text.trim().is_empty() && heading.trim().is_empty(),
            Block::Table { rows, .. } => rows.is_empty(),
            Block::Text { text } => text.trim().is_empty(),
        })
    }
}
