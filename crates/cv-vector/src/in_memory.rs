//! In-memory `VectorStore` test double (cosine similarity, brute-force scan).
//! Mirrors `dk-engine::graph::vector::NoOpVectorSearch`'s role of letting
//! upstream crates be exercised without a live Qdrant.

use crate::ports::{SearchFilter, SearchHit, VectorStore};
use async_trait::async_trait;
use cv_core::Result;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone)]
struct Point {
    vector: Vec<f32>,
    payload: Value,
}

pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, Point>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, collection: &str, id: &str, vector: Vec<f32>, payload: Value) -> Result<()> {
        let mut payload = payload;
        if let Value::Object(ref mut map) = payload {
            map.insert("_id".to_string(), Value::String(id.to_string()));
        }
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), Point { vector, payload });
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read();
        let Some(points) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<SearchHit> = points
            .iter()
            .filter(|(_, p)| filter.matches(&p.payload))
            .map(|(id, p)| SearchHit {
                id: id.clone(),
                score: cosine(query_vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn search_by_level(
        &self,
        query_vector: &[f32],
        level: u8,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        let mut filter = filter.clone();
        filter.fields.insert("level".to_string(), serde_json::json!(level));
        self.search("summaries", query_vector, 20, &filter).await
    }

    async fn search_hierarchical(
        &self,
        query_vector: &[f32],
        start_level: u8,
        end_level: u8,
        k: usize,
    ) -> Result<HashMap<u8, Vec<SearchHit>>> {
        let mut out = HashMap::new();
        for level in start_level..=end_level {
            out.insert(level, self.search_by_level(query_vector, level, &SearchFilter::new()).await?);
        }
        Ok(out)
    }

    async fn get_summary(&self, id: &str) -> Result<Option<Value>> {
        Ok(self
            .collections
            .read()
            .get("summaries")
            .and_then(|points| points.get(id))
            .map(|p| p.payload.clone()))
    }

    async fn get_summary_children(&self, parent_id: &str) -> Result<Vec<Value>> {
        Ok(self
            .collections
            .read()
            .get("summaries")
            .map(|points| {
                points
                    .values()
                    .filter(|p| p.payload.get("parent").and_then(|v| v.as_str()) == Some(parent_id))
                    .map(|p| p.payload.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<()> {
        if let Some(points) = self.collections.write().get_mut(collection) {
            for id in ids {
                points.remove(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity_descending() {
        let store = InMemoryVectorStore::new();
        store.upsert("code_chunks", "a", vec![1.0, 0.0], serde_json::json!({})).await.unwrap();
        store.upsert("code_chunks", "b", vec![0.0, 1.0], serde_json::json!({})).await.unwrap();
        let hits = store
            .search("code_chunks", &[1.0, 0.0], 2, &SearchFilter::new())
            .await
            .unwrap();
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn filter_restricts_to_matching_payload_fields() {
        let store = InMemoryVectorStore::new();
        store
            .upsert("code_chunks", "a", vec![1.0], serde_json::json!({"file": "a.rs"}))
            .await
            .unwrap();
        store
            .upsert("code_chunks", "b", vec![1.0], serde_json::json!({"file": "b.rs"}))
            .await
            .unwrap();
        let filter = SearchFilter::new().with("file", serde_json::json!("a.rs"));
        let hits = store.search("code_chunks", &[1.0], 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn delete_points_removes_from_collection() {
        let store = InMemoryVectorStore::new();
        store.upsert("code_chunks", "a", vec![1.0], serde_json::json!({})).await.unwrap();
        store.delete_points("code_chunks", &["a".to_string()]).await.unwrap();
        let hits = store.search("code_chunks", &[1.0], 10, &SearchFilter::new()).await.unwrap();
        assert!(hits.is_empty());
    }
}
