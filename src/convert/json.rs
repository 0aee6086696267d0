use std::path::Path;
use serde_json::Value as JsonValue;
use super::{stem_of, DocumentConverter};
use super::document::{Block, ConvertedDocument};
use crate::error::{DocragError, Result};

/// JSON converter
///
/// Top-level object keys become section blocks. A value that is an array
/// of flat objects is recognized as tabular data and kept as a table
/// block (header row from the first object's keys). Malformed JSON is a
/// conversion error and takes the plaintext-fallback path.
pub struct JsonConverter;

impl DocumentConverter for JsonConverter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn can_convert(&self, extension: &str) -> bool {
        extension == "json"
    }

    fn convert(&self, content: &str, path: &Path) -> Result<ConvertedDocument> {
        let value: JsonValue = serde_json::from_str(content)
            .map_err(|e| DocragError::Conversion(format!("JSON parse error in {}: {}", path.display(), e)))?;

        let mut doc = ConvertedDocument::new(stem_of(path), path.to_string_lossy(), self.format());

        match &value {
            JsonValue::Object(map) => {
                for (key, val) in map {
                    if let Some(rows) = tabular_rows(val) {
                        doc.blocks.push(Block::Table {
                            caption: Some(key.clone()),
                            rows,
                        });
                    } else {
                        doc.blocks.push(Block::Section {
                            heading: key.clone(),
                            level: 1,
                            text: render_value(val),
                        });
                    }
                }
            }
            other => {
                if let Some(rows) = tabular_rows(other) {
                    doc.blocks.push(Block::Table {
                        caption: None,
                        rows,
                    });
                } else {
                    doc.blocks.push(Block::Text {
                        text: render_value(other),
                    });
                }
            }
        }

        Ok(doc)
    }
}

/// Recognize an array of flat objects as a table. Returns header + data
/// rows, or None when the shape doesn't fit.
fn tabular_rows(value: &JsonValue) -> Option<Vec<Vec<String>>> {
    let items = match value {
        JsonValue::Array(items) if !items.is_empty() => items,
        _ => return None,
    };

    let first = match &items[0] {
        JsonValue::Object(map) => map,
        _ => return None,
    };
    let columns: Vec<String> = first.keys().cloned().collect();

    let mut rows = Vec::with_capacity(items.len() + 1);
    rows.push(columns.clone());

    for item in items {
        let map = match item {
            JsonValue::Object(map) => map,
            _ => return None,
        };
        let mut row = Vec::with_capacity(columns.len());
        for col in &columns {
            match map.get(col) {
                Some(JsonValue::Object(_)) | Some(JsonValue::Array(_)) => return None,
                Some(v) => row.push(render_value(v)),
                None => row.push(String::new()),
            }
        }
        rows.push(row);
    }

    Some(rows)
}

/// Render a JSON value as readable text
fn render_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => "null".to_string(),
        JsonValue::Array(arr) => arr
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        JsonValue::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, render_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_can_convert() {
        let converter = JsonConverter;
        assert!(converter.can_convert("json"));
        assert!(!converter.can_convert("yaml"));
    }

    #[test]
    fn test_json_object_keys_become_sections() {
        let converter = JsonConverter;
        let content = r#"{"album": {"description": "stores albums"}, "track": "one row per track"}"#;

        let doc = converter.convert(content, Path::new("schema.json")).unwrap();
        assert_eq!(doc.blocks.len(), 2);

        match &doc.blocks[0] {
            Block::Section { heading, text, .. } => {
                assert_eq!(heading, "album");
                assert!(text.contains("stores albums"));
            }
            other => panic!("expected section, got {:?}", other),
        }
    }

    #[test]
    fn test_json_array_of_objects_becomes_table() {
        let converter = JsonConverter;
        let content = r#"{"columns": [
            {"name": "album_id", "type": "integer"},
            {"name": "title", "type": "text"}
        ]}"#;

        let doc = converter.convert(content, Path::new("columns.json")).unwrap();
        match &doc.blocks[0] {
            Block::Table { caption, rows } => {
                assert_eq!(caption.as_deref(), Some("columns"));
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[0], vec!["name", "type"]);
                assert_eq!(rows[2], vec!["title", "text"]);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_json_nested_arrays_are_not_tables() {
        let converter = JsonConverter;
        let content = r#"{"items": [{"name": "a", "tags": ["x"]}]}"#;

        let doc = converter.convert(content, Path::new("items.json")).unwrap();
        assert!(matches!(&doc.blocks[0], Block::Section { .. }));
    }

    #[test]
    fn test_json_malformed_is_error() {
        let converter = JsonConverter;
        let result = converter.convert(r#"{"key": invalid}"#, Path::new("bad.json"));
        assert!(matches!(result, Err(DocragError::Conversion(_))));
    }
}
