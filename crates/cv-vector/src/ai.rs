//! `AiProvider` adapter over a local embedding/completion server (spec §6:
//! "a local embedding server (HTTP: `POST /api/embeddings {model, prompt}
//! -> {embedding: [..]}`) or a remote provider (`POST /v1/embeddings`)").
//! Grounded on `qdrant.rs`'s plain-`reqwest` HTTP client style rather than
//! pulling in a dedicated SDK crate.

use async_trait::async_trait;
use cv_core::ports::AiProvider;
use cv_core::{CvError, Result};
use reqwest::Client;
use serde_json::json;

/// Talks to an Ollama-compatible server: `/api/embeddings` for vectors,
/// `/api/generate` for completions.
pub struct OllamaAiProvider {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaAiProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), model: model.into(), client: Client::new() }
    }
}

#[async_trait]
impl AiProvider for OllamaAiProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": max_tokens, "temperature": temperature },
        });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CvError::embedding(format!("completion request failed: {e}")).with_source(e))?;
        if !resp.status().is_success() {
            return Err(CvError::embedding(format!("completion request returned {}", resp.status())));
        }
        let parsed: serde_json::Value = resp.json().await.map_err(|e| CvError::embedding(format!("invalid completion response: {e}")).with_source(e))?;
        parsed
            .get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CvError::embedding("completion response missing 'response' field"))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let body = json!({ "model": self.model, "prompt": text });
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| CvError::embedding(format!("embed request failed: {e}")).with_source(e))?;
            if !resp.status().is_success() {
                return Err(CvError::embedding(format!("embed request returned {}", resp.status())));
            }
            let parsed: serde_json::Value = resp.json().await.map_err(|e| CvError::embedding(format!("invalid embed response: {e}")).with_source(e))?;
            let vector = parsed
                .get("embedding")
                .and_then(|v| v.as_array())
                .ok_or_else(|| CvError::embedding("embed response missing 'embedding' field"))?
                .iter()
                .map(|n| n.as_f64().unwrap_or(0.0) as f32)
                .collect();
            out.push(vector);
        }
        Ok(out)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
