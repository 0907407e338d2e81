//! `VectorStore` (spec §4.4): five logical collections per repo
//! ({code_chunks, docstrings, commits, document_chunks, summaries}) behind a
//! small similarity-search contract. Grounded on `dk-engine::graph::vector`'s
//! `VectorSearch` trait + `NoOpVectorSearch` graceful-degradation pattern.

use async_trait::async_trait;
use cv_core::Result;
use serde_json::Value;
use std::collections::HashMap;

pub const COLLECTION_CODE_CHUNKS: &str = "code_chunks";
pub const COLLECTION_DOCSTRINGS: &str = "docstrings";
pub const COLLECTION_COMMITS: &str = "commits";
pub const COLLECTION_DOCUMENT_CHUNKS: &str = "document_chunks";
pub const COLLECTION_SUMMARIES: &str = "summaries";

pub const ALL_COLLECTIONS: [&str; 5] = [
    COLLECTION_CODE_CHUNKS,
    COLLECTION_DOCSTRINGS,
    COLLECTION_COMMITS,
    COLLECTION_DOCUMENT_CHUNKS,
    COLLECTION_SUMMARIES,
];

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// Exact-match filter over payload fields (file, language, level, tags…).
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub fields: HashMap<String, Value>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, payload: &Value) -> bool {
        self.fields.iter().all(|(k, v)| payload.get(k) == Some(v))
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, collection: &str, id: &str, vector: Vec<f32>, payload: Value) -> Result<()>;

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>>;

    async fn search_by_level(
        &self,
        query_vector: &[f32],
        level: u8,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>>;

    /// Returns top-k results per level in `[start_level, end_level]`, keyed by level.
    async fn search_hierarchical(
        &self,
        query_vector: &[f32],
        start_level: u8,
        end_level: u8,
        k: usize,
    ) -> Result<HashMap<u8, Vec<SearchHit>>>;

    async fn get_summary(&self, id: &str) -> Result<Option<Value>>;
    async fn get_summary_children(&self, parent_id: &str) -> Result<Vec<Value>>;
    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<()>;
}
