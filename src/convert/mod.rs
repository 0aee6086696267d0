pub mod document;
pub mod markdown;
pub mod xml;
pub mod json;
pub mod yaml;
pub mod plaintext;

use std::path::{Path, PathBuf};
use crate::error::{DocragError, Result};

pub use document::{Block, ConvertedDocument};
pub use markdown::MarkdownConverter;
pub use plaintext::PlainTextConverter;

/// Per-document conversion outcome tag.
///
/// `PartialSuccess` means a structured converter failed and the plaintext
/// fallback recovered the raw text: content survived, structure did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    Success,
    PartialSuccess,
    Failure,
}

/// Aggregate tallies for one conversion batch. Both success and partial
/// counts are surfaced so the caller can apply its own policy to partial
/// conversions (no intermediate file is written for them).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionCounts {
    pub success: usize,
    pub partial: usize,
    pub failure: usize,
}

/// Trait for document converters
pub trait DocumentConverter {
    /// Short format tag recorded on the converted document
    fn format(&self) -> &'static str;

    /// Check if this converter claims the given file extension
    fn can_convert(&self, extension: &str) -> bool;

    /// Convert file content into a structured document tree
    fn convert(&self, content: &str, path: &Path) -> Result<ConvertedDocument>;
}

/// Converter registry that selects a converter by extension.
///
/// The plaintext converter is registered last as the wildcard, so every
/// extension resolves to something and unknown formats are still ingested
/// as raw text.
pub struct ConverterRegistry {
    converters: Vec<Box<dyn DocumentConverter>>,
}

impl ConverterRegistry {
    /// Create a registry with all built-in converters
    pub fn new() -> Self {
        let mut registry = Self {
            converters: Vec::new(),
        };

        registry.register(Box::new(markdown::MarkdownConverter));
        registry.register(Box::new(xml::XmlConverter));
        registry.register(Box::new(json::JsonConverter));
        registry.register(Box::new(yaml::YamlConverter));
        registry.register(Box::new(plaintext::PlainTextConverter));

        registry
    }

    /// Register a converter
    pub fn register(&mut self, converter: Box<dyn DocumentConverter>) {
        self.converters.push(converter);
    }

    /// Find the first converter claiming the extension
    pub fn find_converter(&self, extension: &str) -> Option<&dyn DocumentConverter> {
        self.converters
            .iter()
            .find(|c| c.can_convert(extension))
            .map(|c| c.as_ref())
    }

    /// Convert one document, reporting whether the structured converter
    /// succeeded or the plaintext fallback had to step in.
    pub fn convert(&self, content: &str, path: &Path) -> Result<(ConvertedDocument, ConversionStatus)> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        let converter = self
            .find_converter(&extension)
            .ok_or_else(|| DocragError::Conversion(format!("No converter for extension: {}", extension)))?;

        match converter.convert(content, path) {
            Ok(doc) => Ok((doc, ConversionStatus::Success)),
            Err(e) => {
                log::warn!(
                    "Converter {} failed for {}, falling back to plain text: {}",
                    converter.format(),
                    path.display(),
                    e
                );
                let doc = plaintext::PlainTextConverter.convert(content, path)?;
                Ok((doc, ConversionStatus::PartialSuccess))
            }
        }
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch-convert source documents into `<output_dir>/<stem>.json` files.
///
/// Per-document failures (unreadable file, undecodable bytes) are
/// collected and logged, never raised mid-batch; the whole batch is always
/// attempted. Only fully successful conversions are written to disk.
/// After the batch, any nonzero failure tally aborts the run with an
/// aggregate error so the pipeline never proceeds on a partial corpus.
pub fn convert_documents(
    registry: &ConverterRegistry,
    input_paths: &[PathBuf],
    output_dir: &Path,
) -> Result<ConversionCounts> {
    std::fs::create_dir_all(output_dir)?;

    let mut counts = ConversionCounts::default();
    let total = input_paths.len();

    for path in input_paths {
        let content = match std::fs::read(path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    counts.failure += 1;
                    log::error!("✗ {}: not valid UTF-8: {}", path.display(), e);
                    continue;
                }
            },
            Err(e) => {
                counts.failure += 1;
                log::error!("✗ {}: {}", path.display(), e);
                continue;
            }
        };

        match registry.convert(&content, path) {
            Ok((doc, ConversionStatus::Success)) => {
                doc.write_json(output_dir)?;
                counts.success += 1;
                log::info!("✓ {} ({} blocks)", path.display(), doc.blocks.len());
            }
            Ok((_, ConversionStatus::PartialSuccess)) => {
                // Counted but not persisted: text was recovered without
                // structure, and policy for that is the caller's call.
                counts.partial += 1;
                log::warn!("~ {}: partial conversion, no output written", path.display());
            }
            Ok((_, ConversionStatus::Failure)) | Err(_) => {
                counts.failure += 1;
                log::error!("✗ {}: conversion failed", path.display());
            }
        }
    }

    if counts.failure > 0 {
        return Err(DocragError::Conversion(format!(
            "Failed converting {} of {} documents",
            counts.failure, total
        )));
    }

    Ok(counts)
}

/// File stem used to name the converted document.
pub(crate) fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_registry_dispatch() {
        let registry = ConverterRegistry::new();

        assert_eq!(registry.find_converter("md").unwrap().format(), "markdown");
        assert_eq!(registry.find_converter("xml").unwrap().format(), "xml");
        assert_eq!(registry.find_converter("json").unwrap().format(), "json");
        assert_eq!(registry.find_converter("yml").unwrap().format(), "yaml");
        // Wildcard: anything else falls through to plaintext
        assert_eq!(registry.find_converter("txt").unwrap().format(), "plaintext");
        assert_eq!(registry.find_converter("docx").unwrap().format(), "plaintext");
    }

    #[test]
    fn test_registry_fallback_is_partial() {
        let registry = ConverterRegistry::new();

        let (doc, status) = registry
            .convert(r#"{"key": invalid}"#, Path::new("broken.json"))
            .unwrap();

        assert_eq!(status, ConversionStatus::PartialSuccess);
        assert_eq!(doc.format, "plaintext");
        assert!(matches!(&doc.blocks[0], Block::Text { text } if text.contains("invalid")));
    }

    #[test]
    fn test_convert_documents_all_success() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("converted");

        let a = temp_dir.path().join("a.md");
        let b = temp_dir.path().join("b.md");
        fs::write(&a, "# A\n\ncontents of a\n").unwrap();
        fs::write(&b, "# B\n\ncontents of b\n").unwrap();

        let registry = ConverterRegistry::new();
        let counts = convert_documents(&registry, &[a, b], &out_dir).unwrap();

        assert_eq!(counts, ConversionCounts { success: 2, partial: 0, failure: 0 });
        assert!(out_dir.join("a.json").exists());
        assert!(out_dir.join("b.json").exists());
    }

    #[test]
    fn test_convert_documents_failure_aborts_after_batch() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("converted");

        let a = temp_dir.path().join("a.md");
        let missing = temp_dir.path().join("missing.md");
        let b = temp_dir.path().join("b.md");
        fs::write(&a, "# A\n\ntext\n").unwrap();
        fs::write(&b, "# B\n\ntext\n").unwrap();

        let registry = ConverterRegistry::new();
        let result = convert_documents(&registry, &[a, missing, b], &out_dir);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("1 of 3"), "got: {}", err);

        // The whole batch ran before the abort: both good files were written
        assert!(out_dir.join("a.json").exists());
        assert!(out_dir.join("b.json").exists());
    }

    #[test]
    fn test_convert_documents_partial_not_written() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("converted");

        let bad_json = temp_dir.path().join("broken.json");
        fs::write(&bad_json, "{not valid json").unwrap();

        let registry = ConverterRegistry::new();
        let counts = convert_documents(&registry, &[bad_json], &out_dir).unwrap();

        assert_eq!(counts, ConversionCounts { success: 0, partial: 1, failure: 0 });
        assert!(!out_dir.join("broken.json").exists());
    }

    #[test]
    fn test_convert_documents_non_utf8_is_failure() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("converted");

        let binary = temp_dir.path().join("image.png");
        fs::write(&binary, [0x89u8, 0x50, 0x4e, 0x47, 0xff, 0xfe]).unwrap();

        let registry = ConverterRegistry::new();
        let result = convert_documents(&registry, &[binary], &out_dir);

        assert!(result.unwrap_err().to_string().contains("1 of 1"));
    }

    #[test]
    fn test_convert_documents_creates_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("deep").join("converted");

        let a = temp_dir.path().join("a.md");
        fs::write(&a, "# A\n\ntext\n").unwrap();

        let registry = ConverterRegistry::new();
        convert_documents(&registry, &[a.clone()], &out_dir).unwrap();
        assert!(out_dir.join("a.json").exists());

        // Re-run overwrites in place
        let counts = convert_documents(&registry, &[a], &out_dir).unwrap();
        assert_eq!(counts.success, 1);
    }
}
