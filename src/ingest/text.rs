use regex::Regex;
use uuid::Uuid;

use super::BlockExtractor;
use crate::error::IngestError;
use crate::schema::{BlockType, DocBlock};

/// Extracts blocks from plain text or markdown.
///
/// Headings (`#`..`######`) keep their level, list lines (`-`, `*`, `1.`,
/// `a)`) become list items, table rows split into one block per cell, and
/// runs of other lines form paragraphs.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl BlockExtractor for PlainTextExtractor {
    fn extract(&self, raw: &[u8]) -> Result<Vec<DocBlock>, IngestError> {
        let text = std::str::from_utf8(raw).map_err(|_| IngestError::Utf8)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let heading_re = Regex::new(r"^(#{1,6})\s+(.+)$")?;
        let list_re = Regex::new(r"^(?:[-*+•]|\d{1,3}[.)]|[a-zA-Z][.)])\s+\S")?;
        let separator_re = Regex::new(r"^\|?[\s:|-]+\|?$")?;

        let mut builder = Builder::default();

        for line in text.lines() {
            let line = line.trim();

            if line.is_empty() {
                builder.flush_paragraph();
                continue;
            }

            if let Some(caps) = heading_re.captures(line) {
                builder.flush_paragraph();
                let level = caps.get(1).map(|m| m.as_str().len() as u8);
                let content = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                builder.push(BlockType::Heading, content, level);
            } else if line.starts_with('|') {
                builder.flush_paragraph();
                if separator_re.is_match(line) {
                    continue;
                }
                for cell in line.trim_matches('|').split('|') {
                    let cell = cell.trim();
                    if !cell.is_empty() {
                        builder.push(BlockType::TableCell, cell, None);
                    }
                }
            } else if list_re.is_match(line) {
                builder.flush_paragraph();
                builder.push(BlockType::ListItem, line, None);
            } else {
                builder.paragraph.push(line);
            }
        }

        builder.flush_paragraph();

        if builder.blocks.is_empty() {
            return Err(IngestError::Empty);
        }
        Ok(builder.blocks)
    }
}

#[derive(Default)]
struct Builder<'a> {
    blocks: Vec<DocBlock>,
    paragraph: Vec<&'a str>,
}

impl<'a> Builder<'a> {
    fn push(&mut self, block_type: BlockType, content: &str, level: Option<u8>) {
        self.blocks.push(DocBlock {
            block_id: Uuid::new_v4().to_string(),
            block_type,
            content: content.to_string(),
            level,
            index: self.blocks.len(),
        });
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let content = self.paragraph.join(" ");
        self.paragraph.clear();
        self.push(BlockType::Paragraph, &content, None);
    }
}
