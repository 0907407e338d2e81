//! Qdrant-backed `VectorStore` over its HTTP REST API. Grounded on the
//! pack's Qdrant-client convention (`dkod-io-dkod-engine`'s `qdrant-client`
//! workspace dependency); we ride `reqwest` directly since the REST surface
//! needed here is small and avoids pulling in the gRPC client stack.

use crate::ports::{SearchFilter, SearchHit, VectorStore, COLLECTION_SUMMARIES};
use async_trait::async_trait;
use cv_core::{CvError, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;

pub struct QdrantVectorStore {
    base_url: String,
    repo_id: Option<String>,
    client: Client,
}

impl QdrantVectorStore {
    pub fn new(base_url: impl Into<String>, repo_id: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            repo_id,
            client: Client::new(),
        }
    }

    fn collection_name(&self, kind: &str) -> String {
        collection_name(self.repo_id.as_deref(), kind)
    }

    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let url = format!("{}/collections/{name}", self.base_url);
        let body = json!({ "vectors": { "size": dimensions, "distance": "Cosine" } });
        let resp = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CvError::vector(format!("collection create request failed: {e}")).with_source(e))?;
        // Qdrant returns 200 on create and a conflict-like status when it
        // already exists; either is fine, idempotent by design.
        if !resp.status().is_success() {
            tracing::debug!(status = %resp.status(), %name, "collection create non-success (likely already exists)");
        }
        Ok(())
    }
}

/// `<repoId>_<kind>` — mirrors the Graph Store's `cv_<repoId>` rule (spec §4.3).
fn collection_name(repo_id: Option<&str>, kind: &str) -> String {
    match repo_id {
        Some(id) if !id.is_empty() => format!("{id}_{kind}"),
        _ => format!("default_{kind}"),
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, collection: &str, id: &str, vector: Vec<f32>, payload: Value) -> Result<()> {
        let name = self.collection_name(collection);
        self.ensure_collection(&name, vector.len()).await?;

        let mut payload = payload;
        if let Value::Object(ref mut map) = payload {
            map.insert("_id".to_string(), json!(id));
        }

        let url = format!("{}/collections/{name}/points", self.base_url);
        let body = json!({
            "points": [{ "id": stable_point_id(id), "vector": vector, "payload": payload }]
        });
        self.client
            .put(&url)
            .query(&[("wait", "true")])
            .json(&body)
            .send()
            .await
            .map_err(|e| CvError::vector(format!("upsert failed: {e}")).with_source(e))?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        let name = self.collection_name(collection);
        let url = format!("{}/collections/{name}/points/search", self.base_url);
        let body = json!({
            "vector": query_vector,
            "limit": k,
            "filter": qdrant_filter(filter),
            "with_payload": true,
        });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CvError::vector(format!("search failed: {e}")).with_source(e))?;
        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| CvError::vector(format!("search response decode failed: {e}")).with_source(e))?;
        Ok(parse_search_results(&parsed))
    }

    async fn search_by_level(
        &self,
        query_vector: &[f32],
        level: u8,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        let mut filter = filter.clone();
        filter.fields.insert("level".to_string(), json!(level));
        self.search(COLLECTION_SUMMARIES, query_vector, 20, &filter).await
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
            let mut filter = SearchFilter::new();
            filter.fields.insert("level".to_string(), json!(level));
            let name = self.collection_name(COLLECTION_SUMMARIES);
            let url = format!("{}/collections/{name}/points/search", self.base_url);
            let body = json!({
                "vector": query_vector,
                "limit": k,
                "filter": qdrant_filter(&filter),
                "with_payload": true,
            });
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| CvError::vector(format!("hierarchical search failed: {e}")).with_source(e))?;
            let parsed: Value = resp
                .json()
                .await
                .map_err(|e| CvError::vector(format!("hierarchical search decode failed: {e}")).with_source(e))?;
            out.insert(level, parse_search_results(&parsed));
        }
        Ok(out)
    }

    async fn get_summary(&self, id: &str) -> Result<Option<Value>> {
        let name = self.collection_name(COLLECTION_SUMMARIES);
        let url = format!("{}/collections/{name}/points/{}", self.base_url, stable_point_id(id));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CvError::vector(format!("get_summary failed: {e}")).with_source(e))?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| CvError::vector(format!("get_summary decode failed: {e}")).with_source(e))?;
        Ok(parsed.get("result").cloned())
    }

    async fn get_summary_children(&self, parent_id: &str) -> Result<Vec<Value>> {
        let filter = SearchFilter::new().with("parent", json!(parent_id));
        let name = self.collection_name(COLLECTION_SUMMARIES);
        let url = format!("{}/collections/{name}/points/scroll", self.base_url);
        let body = json!({ "filter": qdrant_filter(&filter), "with_payload": true, "limit": 1000 });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CvError::vector(format!("get_summary_children failed: {e}")).with_source(e))?;
        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| CvError::vector(format!("scroll decode failed: {e}")).with_source(e))?;
        Ok(parsed["result"]["points"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.get("payload").cloned())
            .collect())
    }

    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<()> {
        let name = self.collection_name(collection);
        let url = format!("{}/collections/{name}/points/delete", self.base_url);
        let body = json!({ "points": ids.iter().map(|id| stable_point_id(id)).collect::<Vec<_>>() });
        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CvError::vector(format!("delete_points failed: {e}")).with_source(e))?;
        Ok(())
    }
}

fn qdrant_filter(filter: &SearchFilter) -> Value {
    if filter.fields.is_empty() {
        return Value::Null;
    }
    let must: Vec<Value> = filter
        .fields
        .iter()
        .map(|(k, v)| json!({ "key": k, "match": { "value": v } }))
        .collect();
    json!({ "must": must })
}

fn parse_search_results(response: &Value) -> Vec<SearchHit> {
    response["result"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|hit| {
            let payload = hit.get("payload").cloned().unwrap_or(Value::Null);
            let id = payload
                .get("_id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .or_else(|| hit.get("id").map(|v| v.to_string()))?;
            let score = hit.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
            Some(SearchHit { id, score, payload })
        })
        .collect()
}

/// Qdrant point ids must be a u64 or UUID; chunk ids are our own deterministic
/// strings, so we derive a stable UUIDv5 from them rather than requiring the
/// caller to mint a Qdrant-specific id.
fn stable_point_id(id: &str) -> String {
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, id.as_bytes()).to_string()
}
