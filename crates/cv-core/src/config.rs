//! Configuration loading with `env > config > default` precedence (spec §6).
//!
//! Grounded on the teacher's `config/` package (provenance-tracked,
//! layered config) but simplified to the fields this core actually reads.

use crate::error::{CvError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

fn default_max_file_size() -> u64 {
    1024 * 1024 // 1 MiB, per spec §4.1
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_url")]
    pub url: String,
    pub database: Option<String>,
}

fn default_graph_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: default_graph_url(),
            database: None,
        }
    }
}

fn default_collection_code_chunks() -> String {
    "code_chunks".to_string()
}
fn default_collection_docstrings() -> String {
    "docstrings".to_string()
}
fn default_collection_commits() -> String {
    "commits".to_string()
}
fn default_collection_document_chunks() -> String {
    "document_chunks".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorCollections {
    #[serde(default = "default_collection_code_chunks")]
    pub code_chunks: String,
    #[serde(default = "default_collection_docstrings")]
    pub docstrings: String,
    #[serde(default = "default_collection_commits")]
    pub commits: String,
    #[serde(default = "default_collection_document_chunks")]
    pub document_chunks: String,
}

impl Default for VectorCollections {
    fn default() -> Self {
        Self {
            code_chunks: "code_chunks".to_string(),
            docstrings: "docstrings".to_string(),
            commits: "commits".to_string(),
            document_chunks: "document_chunks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_vector_url")]
    pub url: String,
    #[serde(default)]
    pub collections: VectorCollections,
}

fn default_vector_url() -> String {
    "http://127.0.0.1:6333".to_string()
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: default_vector_url(),
            collections: VectorCollections::default(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_embedding_dimensions() -> usize {
    768
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_url")]
    pub url: String,
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            url: default_embedding_url(),
            dimensions: 768,
        }
    }
}

fn default_ai_provider() -> String {
    "ollama".to_string()
}
fn default_ai_model() -> String {
    "llama3".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.2
}

/// Completion-side AI settings (spec §6 `ai.{...}`), distinct from
/// `EmbeddingConfig`: an embedding server and a completion model are
/// often different deployments even when both speak Ollama's API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_provider")]
    pub provider: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            model: default_ai_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub include_languages: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub chunk_by_heading: bool,
    #[serde(default = "default_true")]
    pub infer_types: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: vec!["**/*.md".into()],
            exclude_patterns: vec![],
            chunk_by_heading: true,
            infer_types: true,
        }
    }
}

/// Root configuration, persisted at `.cv/config.json` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            vector: VectorConfig::default(),
            embedding: EmbeddingConfig::default(),
            ai: AiConfig::default(),
            sync: SyncConfig::default(),
            docs: DocsConfig::default(),
            max_file_size: default_max_file_size(),
            log_level: default_log_level(),
            debug: false,
        }
    }
}

impl Config {
    /// Load defaults, overlay `config.json` if present, then overlay
    /// environment variables (precedence: env > config > default).
    pub fn load(config_path: &Path, env: &HashMap<String, String>) -> Result<Self> {
        let mut cfg = if config_path.exists() {
            let bytes = std::fs::read(config_path).map_err(CvError::from)?;
            serde_json::from_slice(&bytes)
                .map_err(|e| CvError::config(format!("invalid config.json: {e}")))?
        } else {
            Config::default()
        };
        cfg.apply_env(env);
        Ok(cfg)
    }

    /// Apply environment overrides in place. Supports the `CV_`-prefixed
    /// names plus legacy unprefixed variants (spec §6).
    pub fn apply_env(&mut self, env: &HashMap<String, String>) {
        if let Some(url) = env_lookup(env, &["CV_FALKORDB_URL", "FALKORDB_URL"]) {
            self.graph.url = url;
        }
        if let Some(url) = env_lookup(env, &["CV_QDRANT_URL", "QDRANT_URL"]) {
            self.vector.url = url;
        }
        if let Some(url) = env_lookup(env, &["CV_OLLAMA_URL", "OLLAMA_URL"]) {
            self.embedding.url = url;
        }
        if let Some(size) = env_lookup(env, &["CV_MAX_FILE_SIZE"]) {
            if let Ok(n) = size.parse::<u64>() {
                self.max_file_size = n;
            }
        }
        if let Some(key) = env_lookup(env, &["CV_AI_API_KEY"]) {
            self.ai.api_key = Some(key);
        }
        if let Some(level) = env_lookup(env, &["CV_LOG_LEVEL"]) {
            self.log_level = level;
        }
        if let Some(debug) = env_lookup(env, &["CV_DEBUG"]) {
            self.debug = debug == "1" || debug.eq_ignore_ascii_case("true");
        }
    }
}

fn env_lookup(env: &HashMap<String, String>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| env.get(*n).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.max_file_size, 1024 * 1024);
        assert_eq!(cfg.graph.url, "redis://127.0.0.1:6379");
        assert_eq!(cfg.vector.collections.code_chunks, "code_chunks");
    }

    #[test]
    fn env_overrides_take_precedence_over_default() {
        let mut cfg = Config::default();
        let mut env = HashMap::new();
        env.insert("CV_FALKORDB_URL".to_string(), "redis://graph:6380".to_string());
        env.insert("CV_MAX_FILE_SIZE".to_string(), "2048".to_string());
        cfg.apply_env(&env);
        assert_eq!(cfg.graph.url, "redis://graph:6380");
        assert_eq!(cfg.max_file_size, 2048);
    }

    #[test]
    fn ai_api_key_env_override_is_applied() {
        let mut cfg = Config::default();
        assert!(cfg.ai.api_key.is_none());
        let mut env = HashMap::new();
        env.insert("CV_AI_API_KEY".to_string(), "sk-test".to_string());
        cfg.apply_env(&env);
        assert_eq!(cfg.ai.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn legacy_unprefixed_env_var_is_honored() {
        let mut cfg = Config::default();
        let mut env = HashMap::new();
        env.insert("QDRANT_URL".to_string(), "http://qdrant:1234".to_string());
        cfg.apply_env(&env);
        assert_eq!(cfg.vector.url, "http://qdrant:1234");
    }

    #[test]
    fn load_from_missing_path_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("config.json"), &HashMap::new()).unwrap();
        assert_eq!(cfg.max_file_size, 1024 * 1024);
    }

    #[test]
    fn load_from_file_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_file_size": 5000}"#).unwrap();
        let cfg = Config::load(&path, &HashMap::new()).unwrap();
        assert_eq!(cfg.max_file_size, 5000);
        assert_eq!(cfg.graph.url, "redis://127.0.0.1:6379");
    }
}
