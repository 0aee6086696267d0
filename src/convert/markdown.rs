use std::path::Path;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};
use super::{stem_of, DocumentConverter};
use super::document::{Block, ConvertedDocument};
use crate::error::Result;

/// Markdown converter for documentation and data-dictionary files.
///
/// Heading-delimited runs of text become section blocks; pipe tables are
/// kept row-structured as table blocks with the enclosing heading as
/// caption.
pub struct MarkdownConverter;

impl DocumentConverter for MarkdownConverter {
    fn format(&self) -> &'static str {
        "markdown"
    }

    fn can_convert(&self, extension: &str) -> bool {
        matches!(extension, "md" | "markdown")
    }

    fn convert(&self, content: &str, path: &Path) -> Result<ConvertedDocument> {
        let mut doc = ConvertedDocument::new(stem_of(path), path.to_string_lossy(), self.format());
        let parser = CmarkParser::new_ext(content, Options::ENABLE_TABLES);

        // Current section state
        let mut heading: Option<(String, u8)> = None;
        let mut heading_buf = String::new();
        let mut in_heading = false;
        let mut pending_level = 1u8;
        let mut text = String::new();

        // Table state
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut row: Vec<String> = Vec::new();
        let mut cell = String::new();
        let mut in_cell = false;

        for event in parser {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    flush_block(&mut doc.blocks, &heading, &mut text);
                    heading = None;
                    in_heading = true;
                    heading_buf.clear();
                    pending_level = level as u8;
                }
                Event::End(TagEnd::Heading(_)) => {
                    in_heading = false;
                    heading = Some((heading_buf.trim().to_string(), pending_level));
                }
                Event::Start(Tag::Table(_)) => {
                    // A table interrupts the running section text
                    flush_block(&mut doc.blocks, &heading, &mut text);
                    rows.clear();
                }
                Event::End(TagEnd::Table) => {
                    doc.blocks.push(Block::Table {
                        caption: heading.as_ref().map(|(h, _)| h.clone()),
                        rows: std::mem::take(&mut rows),
                    });
                }
                Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => {
                    row.clear();
                }
                Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                    rows.push(std::mem::take(&mut row));
                }
                Event::Start(Tag::TableCell) => {
                    in_cell = true;
                    cell.clear();
                }
                Event::End(TagEnd::TableCell) => {
                    in_cell = false;
                    row.push(cell.trim().to_string());
                }
                Event::Text(t) => {
                    if in_heading {
                        heading_buf.push_str(&t);
                    } else if in_cell {
                        cell.push_str(&t);
                    } else {
                        text.push_str(&t);
                        text.push(' ');
                    }
                }
                Event::Code(code) => {
                    let target = if in_heading {
                        &mut heading_buf
                    } else if in_cell {
                        &mut cell
                    } else {
                        &mut text
                    };
                    target.push('`');
                    target.push_str(&code);
                    target.push('`');
                    target.push(' ');
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) => lang.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    text.push_str("```");
                    text.push_str(&lang);
                    text.push('\n');
                }
                Event::End(TagEnd::CodeBlock) => {
                    text.push_str("```\n");
                }
                Event::SoftBreak | Event::HardBreak => {
                    if in_cell {
                        cell.push(' ');
                    } else if !in_heading {
                        text.push('\n');
                    }
                }
                _ => {}
            }
        }
        flush_block(&mut doc.blocks, &heading, &mut text);

        Ok(doc)
    }
}

/// Push the accumulated text as a section (under the current heading) or a
/// loose text block. Empty runs are dropped, matching how headings without
/// body text behave.
fn flush_block(blocks: &mut Vec<Block>, heading: &Option<(String, u8)>, text: &mut String) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        text.clear();
        return;
    }
    match heading {
        Some((h, level)) => blocks.push(Block::Section {
            heading: h.clone(),
            level: *level,
            text: trimmed.to_string(),
        }),
        None => blocks.push(Block::Text {
            text: trimmed.to_string(),
        }),
    }
    text.clear();
}
