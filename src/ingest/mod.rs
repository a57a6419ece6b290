//! Block extraction: raw document bytes to addressable text blocks.

mod text;

pub use text::PlainTextExtractor;

use std::collections::HashSet;

use crate::error::IngestError;
use crate::schema::DocBlock;

pub trait BlockExtractor: Send + Sync {
    fn extract(&self, raw: &[u8]) -> Result<Vec<DocBlock>, IngestError>;
}

/// Enforce the extraction contract: at least one block, unique ids, and
/// indexes renumbered to a dense 0-based sequence.
pub fn check_blocks(mut blocks: Vec<DocBlock>) -> Result<Vec<DocBlock>, IngestError> {
    if blocks.is_empty() {
        return Err(IngestError::Empty);
    }

    let mut seen = HashSet::new();
    for block in &blocks {
        if !seen.insert(block.block_id.as_str()) {
            return Err(IngestError::DuplicateBlockId(block.block_id.clone()));
        }
    }

    blocks.sort_by_key(|b| b.index);
    for (i, block) in blocks.iter_mut().enumerate() {
        block.index = i;
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BlockType;

    fn block(id: &str, index: usize) -> DocBlock {
        DocBlock {
            block_id: id.into(),
            block_type: BlockType::Paragraph,
            content: format!("clause {}", id),
            level: None,
            index,
        }
    }

    #[test]
    fn test_check_blocks_renumbers() {
        let blocks = check_blocks(vec![block("b", 7), block("a", 2)]).unwrap();
        let ids: Vec<_> = blocks.iter().map(|b| (b.block_id.as_str(), b.index)).collect();
        assert_eq!(ids, vec![("a", 0), ("b", 1)]);
    }

    #[test]
    fn test_check_blocks_rejects_duplicates_and_empty() {
        assert!(matches!(
            check_blocks(vec![block("a", 0), block("a", 1)]),
            Err(IngestError::DuplicateBlockId(id)) if id == "a"
        ));
        assert!(matches!(check_blocks(Vec::new()), Err(IngestError::Empty)));
    }
}
