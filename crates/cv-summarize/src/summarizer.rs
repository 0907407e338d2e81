//! Hierarchical Summarizer (spec §4.5): L1 (symbol) → L2 (file) → L3
//! (directory) → L4 (repo), each skipped when `content_hash` is unchanged.
//! Grounded on the `ReviewProvider` prompt/response shape in the pack's
//! `dk-runner::steps::agent_review::provider` and on `dk-engine`'s
//! content-hash-gated regeneration idiom used throughout the teacher.

use cv_core::hash::content_hash;
use cv_core::model::{HierarchicalSummary, SummaryLevel};
use cv_core::ports::AiProvider;
use cv_core::Result;
use cv_vector::{VectorStore, COLLECTION_SUMMARIES};
use std::sync::Arc;

use crate::input::FileSummaryInput;

pub struct FileSummaryResult {
    pub l1: Vec<HierarchicalSummary>,
    pub l2: HierarchicalSummary,
    pub l2_changed: bool,
}

pub struct Summarizer {
    ai: Arc<dyn AiProvider>,
    vector: Arc<dyn VectorStore>,
}

impl Summarizer {
    pub fn new(ai: Arc<dyn AiProvider>, vector: Arc<dyn VectorStore>) -> Self {
        Self { ai, vector }
    }

    /// Generates L1 summaries for every summarizable symbol in the file,
    /// then the L2 file summary aggregating them plus the import list.
    pub async fn summarize_file(&self, input: &FileSummaryInput) -> Result<FileSummaryResult> {
        let mut l1 = Vec::new();
        let mut any_l1_changed = false;
        let l2_id = HierarchicalSummary::make_id(SummaryLevel::File, &input.path);

        for sym in input.symbols.iter().filter(|s| s.is_summarizable) {
            let id = HierarchicalSummary::make_id(SummaryLevel::Symbol, &sym.qualified_name);
            let content = format!(
                "{}\n{}\n{}",
                sym.signature,
                sym.docstring.as_deref().unwrap_or(""),
                sym.body_excerpt
            );
            let hash = content_hash(content.as_bytes());

            if let Some(existing) = self.unchanged_summary(&id, &hash).await? {
                l1.push(existing);
                continue;
            }
            any_l1_changed = true;

            let prompt = format!(
                "Summarize this {} in one or two sentences, focused on intent:\n\n{}",
                sym.kind_label, content
            );
            let text = self.ai.complete(&prompt, 200, 0.2).await?;
            let summary = HierarchicalSummary {
                id: id.clone(),
                level: SummaryLevel::Symbol,
                parent: Some(l2_id.clone()),
                children: Vec::new(),
                summary: text,
                keywords: extract_keywords(&sym.signature),
                content_hash: hash,
            };
            self.store(&summary).await?;
            l1.push(summary);
        }

        let l2_content = format!(
            "imports: {}\n{}",
            input.imports.join(", "),
            l1.iter().map(|s| s.summary.as_str()).collect::<Vec<_>>().join("\n")
        );
        let l2_hash = content_hash(l2_content.as_bytes());

        let (l2, l2_changed) = if !any_l1_changed {
            match self.unchanged_summary(&l2_id, &l2_hash).await? {
                Some(existing) => (existing, false),
                None => (self.build_l2(&l2_id, input, &l1, &l2_content, &l2_hash).await?, true),
            }
        } else {
            (self.build_l2(&l2_id, input, &l1, &l2_content, &l2_hash).await?, true)
        };

        Ok(FileSummaryResult { l1, l2, l2_changed })
    }

    async fn build_l2(
        &self,
        l2_id: &str,
        input: &FileSummaryInput,
        l1: &[HierarchicalSummary],
        content: &str,
        hash: &str,
    ) -> Result<HierarchicalSummary> {
        let prompt = format!("Summarize this file's purpose from its symbol summaries:\n\n{content}");
        let text = self.ai.complete(&prompt, 300, 0.2).await?;
        let dir = parent_directory(&input.path);
        let l3_id = HierarchicalSummary::make_id(SummaryLevel::Directory, &dir);
        let summary = HierarchicalSummary {
            id: l2_id.to_string(),
            level: SummaryLevel::File,
            parent: Some(l3_id),
            children: l1.iter().map(|s| s.id.clone()).collect(),
            summary: text,
            keywords: extract_keywords(&input.path),
            content_hash: hash.to_string(),
        };
        self.store(&summary).await?;
        Ok(summary)
    }

    /// L3: aggregates every L2 child currently pointing at this directory.
    /// Computed bottom-up — call once the directory's leaf files are done.
    /// Returns `None` when the directory has no L2 children yet.
    pub async fn summarize_directory(&self, dir_path: &str) -> Result<Option<HierarchicalSummary>> {
        let l3_id = HierarchicalSummary::make_id(SummaryLevel::Directory, dir_path);
        let children = self.vector.get_summary_children(&l3_id).await?;
        if children.is_empty() {
            return Ok(None);
        }
        let child_summaries = parse_summaries(children);
        let content = join_summaries(&child_summaries);
        let hash = content_hash(content.as_bytes());

        if let Some(existing) = self.unchanged_summary(&l3_id, &hash).await? {
            return Ok(Some(existing));
        }

        let prompt = format!("Summarize this directory from its files' summaries:\n\n{content}");
        let text = self.ai.complete(&prompt, 300, 0.2).await?;
        let l4_id = HierarchicalSummary::make_id(SummaryLevel::Repo, "repo");
        let summary = HierarchicalSummary {
            id: l3_id,
            level: SummaryLevel::Directory,
            parent: Some(l4_id),
            children: child_summaries.iter().map(|s| s.id.clone()).collect(),
            summary: text,
            keywords: Vec::new(),
            content_hash: hash,
        };
        self.store(&summary).await?;
        Ok(Some(summary))
    }

    /// L4: a single repo-wide summary, regenerated whenever any L3 changed
    /// (or on explicit request — the caller decides when to invoke this).
    pub async fn summarize_repo(&self) -> Result<HierarchicalSummary> {
        let l4_id = HierarchicalSummary::make_id(SummaryLevel::Repo, "repo");
        let children = self.vector.get_summary_children(&l4_id).await?;
        let child_summaries = parse_summaries(children);
        let content = join_summaries(&child_summaries);
        let hash = content_hash(content.as_bytes());

        let prompt = format!("Summarize this repository from its directory summaries:\n\n{content}");
        let text = self.ai.complete(&prompt, 400, 0.2).await?;
        let summary = HierarchicalSummary {
            id: l4_id,
            level: SummaryLevel::Repo,
            parent: None,
            children: child_summaries.iter().map(|s| s.id.clone()).collect(),
            summary: text,
            keywords: Vec::new(),
            content_hash: hash,
        };
        self.store(&summary).await?;
        Ok(summary)
    }

    async fn unchanged_summary(&self, id: &str, hash: &str) -> Result<Option<HierarchicalSummary>> {
        let existing = self.vector.get_summary(id).await?;
        Ok(existing.and_then(|v| {
            let matches = v.get("content_hash").and_then(|h| h.as_str()) == Some(hash);
            matches.then(|| serde_json::from_value(v).ok()).flatten()
        }))
    }

    async fn store(&self, summary: &HierarchicalSummary) -> Result<()> {
        let vector = self
            .ai
            .embed(&[summary.summary.clone()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        let payload = serde_json::to_value(summary)?;
        self.vector.upsert(COLLECTION_SUMMARIES, &summary.id, vector, payload).await
    }
}

fn parse_summaries(values: Vec<serde_json::Value>) -> Vec<HierarchicalSummary> {
    values.into_iter().filter_map(|v| serde_json::from_value(v).ok()).collect()
}

fn join_summaries(summaries: &[HierarchicalSummary]) -> String {
    summaries.iter().map(|s| s.summary.as_str()).collect::<Vec<_>>().join("\n")
}

fn parent_directory(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

/// Cheap keyword extraction: alphanumeric words of length >= 4, deduped,
/// first 8 in order of appearance. Good enough for navigational hints —
/// the actual summary text carries the meaning.
fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let lower = word.to_lowercase();
        if lower.len() < 4 || !seen.insert(lower.clone()) {
            continue;
        }
        out.push(lower);
        if out.len() == 8 {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cv_vector::InMemoryVectorStore;

    struct FixedAiProvider;

    #[async_trait]
    impl AiProvider for FixedAiProvider {
        async fn complete(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
            Ok(format!("summary-of({})", prompt.len()))
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn model_id(&self) -> &str {
            "fixed-test-model"
        }
    }

    fn sample_input() -> FileSummaryInput {
        FileSummaryInput {
            path: "src/lib.rs".into(),
            imports: vec!["std::fmt".into()],
            symbols: vec![crate::input::SymbolInput {
                qualified_name: "src/lib.rs:f".into(),
                name: "f".into(),
                kind_label: "function".into(),
                is_summarizable: true,
                signature: "fn f()".into(),
                docstring: Some("does a thing".into()),
                body_excerpt: "{ g(); }".into(),
            }],
        }
    }

    #[tokio::test]
    async fn summarize_file_produces_l1_and_l2() {
        let summarizer = Summarizer::new(Arc::new(FixedAiProvider), Arc::new(InMemoryVectorStore::new()));
        let result = summarizer.summarize_file(&sample_input()).await.unwrap();
        assert_eq!(result.l1.len(), 1);
        assert_eq!(result.l2.children, vec!["l1:src/lib.rs:f".to_string()]);
        assert!(result.l2_changed);
    }

    #[tokio::test]
    async fn second_call_with_unchanged_content_skips_regeneration() {
        let vector = Arc::new(InMemoryVectorStore::new());
        let summarizer = Summarizer::new(Arc::new(FixedAiProvider), vector);
        let input = sample_input();
        let first = summarizer.summarize_file(&input).await.unwrap();
        let second = summarizer.summarize_file(&input).await.unwrap();
        assert_eq!(first.l1[0].content_hash, second.l1[0].content_hash);
        assert!(!second.l2_changed);
    }

    #[tokio::test]
    async fn directory_summary_aggregates_file_children() {
        let vector = Arc::new(InMemoryVectorStore::new());
        let summarizer = Summarizer::new(Arc::new(FixedAiProvider), vector);
        summarizer.summarize_file(&sample_input()).await.unwrap();
        let l3 = summarizer.summarize_directory("src").await.unwrap();
        assert!(l3.is_some());
        assert_eq!(l3.unwrap().children, vec!["l2:src/lib.rs".to_string()]);
    }

    #[tokio::test]
    async fn directory_with_no_children_returns_none() {
        let summarizer = Summarizer::new(Arc::new(FixedAiProvider), Arc::new(InMemoryVectorStore::new()));
        assert!(summarizer.summarize_directory("src").await.unwrap().is_none());
    }
}
