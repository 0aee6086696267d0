use std::path::Path;
use serde_yaml_ng::Value as YamlValue;
use super::{stem_of, DocumentConverter};
use super::document::{Block, ConvertedDocument};
use crate::error::{DocragError, Result};

/// YAML converter
///
/// Mirrors the JSON converter: top-level mapping keys become section
/// blocks; malformed YAML is a conversion error (plaintext fallback).
pub struct YamlConverter;

impl DocumentConverter for YamlConverter {
    fn format(&self) -> &'static str {
        "yaml"
    }

    fn can_convert(&self, extension: &str) -> bool {
        extension == "yaml" || extension == "yml"
    }

    fn convert(&self, content: &str, path: &Path) -> Result<ConvertedDocument> {
        let value: YamlValue = serde_yaml_ng::from_str(content)
            .map_err(|e| DocragError::Conversion(format!("YAML parse error in {}: {}", path.display(), e)))?;

        let mut doc = ConvertedDocument::new(stem_of(path), path.to_string_lossy(), self.format());

        match &value {
            YamlValue::Mapping(map) => {
                for (key, val) in map {
                    let heading = scalar_to_text(key);
                    doc.blocks.push(Block::Section {
                        heading,
                        level: 1,
                        text: render_value(val),
                    });
                }
            }
            YamlValue::Null => {}
            other => {
                doc.blocks.push(Block::Text {
                    text: render_value(other),
                });
            }
        }

        Ok(doc)
    }
}

fn scalar_to_text(value: &YamlValue) -> String {
    match value {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        _ => "key".to_string(),
    }
}

/// Render a YAML value as readable text
fn render_value(value: &YamlValue) -> String {
    match value {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        YamlValue::Sequence(seq) => seq
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        YamlValue::Mapping(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", scalar_to_text(k), render_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        YamlValue::Tagged(tagged) => render_value(&tagged.value),
    }
}
