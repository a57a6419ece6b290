use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Heading,
    Paragraph,
    ListItem,
    TableCell,
}

/// Addressable unit of contract text, immutable once ingested
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocBlock {
    pub block_id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocMetadata {
    pub total_blocks: usize,
    pub parsed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocAst {
    pub tenant_id: String,
    pub job_id: String,
    pub blocks: Vec<DocBlock>,
    pub metadata: DocMetadata,
}

impl DocAst {
    pub fn new(tenant_id: &str, job_id: &str, blocks: Vec<DocBlock>) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            job_id: job_id.to_string(),
            metadata: DocMetadata {
                total_blocks: blocks.len(),
                parsed_at: Utc::now(),
            },
            blocks,
        }
    }

    pub fn block(&self, block_id: &str) -> Option<&DocBlock> {
        self.blocks.iter().find(|b| b.block_id == block_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_wire_names() {
        let block = DocBlock {
            block_id: "b1".into(),
            block_type: BlockType::ListItem,
            content: "a) payment within 30 days".into(),
            level: None,
            index: 3,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "list-item");
        assert_eq!(json["blockId"], "b1");
        assert!(json.get("level").is_none());
    }

    #[test]
    fn test_doc_ast_lookup() {
        let ast = DocAst::new(
            "default",
            "job",
            vec![DocBlock {
                block_id: "b1".into(),
                block_type: BlockType::Heading,
                content: "1. Object".into(),
                level: Some(1),
                index: 0,
            }],
        );
        assert_eq!(ast.metadata.total_blocks, 1);
        assert!(ast.block("b1").is_some());
        assert!(ast.block("b2").is_none());
    }
}
