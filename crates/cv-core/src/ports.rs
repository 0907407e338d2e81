//! Narrow interfaces for external collaborators the core consumes but does
//! not implement (spec §1 "out of scope", §9 "message passing for infra
//! supervision"). Concrete adapters (a real AI provider SDK, a GitHub/
//! GitLab/Bitbucket REST client, an OS keychain) live outside this
//! workspace; only the reference local backends are wired up in
//! `cv-server`.

use crate::error::Result;
use async_trait::async_trait;

/// Prompt-in, text-out and text-in, vector-out. The only shape the core
/// needs from an AI provider.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn model_id(&self) -> &str;
}

/// A single fact about the remote platform a repo is hosted on, fetched
/// lazily (e.g. for the `requirements` dimension's PRD client).
#[async_trait]
pub trait GitPlatform: Send + Sync {
    async fn fetch_text(&self, reference: &str) -> Result<Option<String>>;
}

/// Credential storage is out of scope; this trait only describes the
/// shape a caller needs, not how secrets are held.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// A `CredentialStore` that never has anything — used when no platform
/// adapter is configured, matching the "graceful no-op" pattern used for
/// vector search in the `dk-engine` teacher.
pub struct NoCredentials;

impl CredentialStore for NoCredentials {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_credentials_always_empty() {
        let store = NoCredentials;
        assert_eq!(store.get("anything"), None);
    }
}
