//! Tool call result shapes (spec §4.9): `{content: [{type, text}], isError}`.
//! Mirrors `dk-engine::tool_ops`'s per-tool typed `Result` structs, but
//! collapsed to one envelope since every cv tool renders to text/json.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Json { text: Value },
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::Text { text: text.into() }], is_error: false }
    }

    pub fn json(value: Value) -> Self {
        Self { content: vec![ContentBlock::Json { text: value }], is_error: false }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::Text { text: message.into() }], is_error: true }
    }

    /// Partial result on cancellation (spec §5): content so far, flagged.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::error(format!("cancelled: {}", reason.into()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub required_args: &'static [&'static str],
}
