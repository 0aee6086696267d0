use std::path::Path;
use quick_xml::Reader;
use quick_xml::events::Event;
use super::{stem_of, DocumentConverter};
use super::document::{Block, ConvertedDocument};
use crate::error::{DocragError, Result};

/// XML converter
///
/// Each element directly under the document root becomes a section block
/// headed by the element name; text under the root but outside any child
/// element is dropped. Malformed XML is a conversion error, which sends
/// the file down the plaintext-fallback path.
pub struct XmlConverter;

impl DocumentConverter for XmlConverter {
    fn format(&self) -> &'static str {
        "xml"
    }

    fn can_convert(&self, extension: &str) -> bool {
        extension == "xml"
    }

    fn convert(&self, content: &str, path: &Path) -> Result<ConvertedDocument> {
        let mut doc = ConvertedDocument::new(stem_of(path), path.to_string_lossy(), self.format());
        let mut reader = Reader::from_reader(content.as_bytes());

        let mut buf = Vec::new();
        let mut current: Option<(String, String)> = None;
        let mut depth = 0;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if depth == 1 {
                        finish_section(&mut doc.blocks, current.take());
                        current = Some((name, String::new()));
                    }
                    depth += 1;
                }
                Ok(Event::Text(e)) => {
                    if let Some((_, ref mut text)) = current {
                        text.push_str(&String::from_utf8_lossy(e.as_ref()));
                        text.push(' ');
                    }
                }
                Ok(Event::End(_)) => {
                    depth -= 1;
                    if depth == 1 {
                        finish_section(&mut doc.blocks, current.take());
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(DocragError::Conversion(format!(
                        "XML parse error in {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
            buf.clear();
        }
        finish_section(&mut doc.blocks, current.take());

        // Root with no child elements: keep the raw text as one block
        if doc.blocks.is_empty() && !content.trim().is_empty() {
            doc.blocks.push(Block::Text {
                text: content.to_string(),
            });
        }

        Ok(doc)
    }
}

fn finish_section(blocks: &mut Vec<Block>, section: Option<(String, String)>) {
    if let Some((heading, text)) = section {
        if !text.trim().is_empty() {
            blocks.push(Block::Section {
                heading,
                level: 1,
                text: text.trim().to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_can_convert() {
        let converter = XmlConverter;
        assert!(converter.can_convert("xml"));
        assert!(!converter.can_convert("md"));
    }

    #[test]
    fn test_xml_child_elements_become_sections() {
        let converter = XmlConverter;
        let content = r#"
            <schema>
                <Album>Stores album titles and artist references</Album>
                <Track>One row per track</Track>
            </schema>
        "#;

        let doc = converter.convert(content, Path::new("schema.xml")).unwrap();
        assert_eq!(doc.blocks.len(), 2);

        match &doc.blocks[0] {
            Block::Section { heading, text, .. } => {
                assert_eq!(heading, "Album");
                assert!(text.contains("album titles"));
            }
            other => panic!("expected section, got {:?}", other),
        }
    }

    #[test]
    fn test_xml_malformed_is_error() {
        let converter = XmlConverter;
        // Truncated tag open at end of input is a syntax error
        let result = converter.convert("<root><a>x</a><", Path::new("bad.xml"));
        assert!(matches!(result, Err(DocragError::Conversion(_))));
    }
}
