//! The logical data model shared by the graph store, vector store, and
//! every consumer (spec §3). Physical encoding is each store's choice;
//! these are the records that travel between layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Repo-relative path, the key used throughout (File.path, Module.path, ...).
pub type RepoPath = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Variable,
    Constant,
    Enum,
    Struct,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Enum => "enum",
            SymbolKind::Struct => "struct",
        }
    }

    /// Kinds summarized at L1 (Hierarchical Summarizer §4.5).
    pub fn is_summarizable_unit(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Class | SymbolKind::Interface
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Internal,
}

/// File node (spec §3 "File"). `path` is the unique key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    pub path: RepoPath,
    pub language: String,
    pub git_hash: String,
    pub size: u64,
    pub lines_of_code: u32,
    pub complexity: u32,
    pub last_modified: DateTime<Utc>,
}

/// Symbol node. `qualified_name` is the unique key: `<file>:<scope-chain>:<name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolNode {
    pub qualified_name: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file: RepoPath,
    pub start_line: u32,
    pub end_line: u32,
    pub signature: String,
    pub docstring: Option<String>,
    pub visibility: Visibility,
    pub is_async: bool,
    pub is_static: bool,
    pub complexity: u32,
    /// Ordered set of vector point ids this symbol's chunks were embedded into.
    pub vector_ids: Vec<String>,
}

impl SymbolNode {
    /// `vector_id` is the legacy single-value alias of `vector_ids[0]` (spec §9 open question ii).
    pub fn vector_id(&self) -> Option<&str> {
        self.vector_ids.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleType {
    Package,
    Namespace,
    Directory,
}

/// Module node: a directory-level aggregate, rebuilt every sync (never
/// referenced by authored data per spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleNode {
    pub path: RepoPath,
    pub name: String,
    pub module_type: ModuleType,
    pub file_count: u32,
    pub symbol_count: u32,
}

/// Commit node, immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitNode {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Readme,
    Changelog,
    Adr,
    Guide,
    Spec,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Draft,
    Active,
    Archived,
    Deprecated,
}

/// Document node. Owns Sections (line ranges) which own Chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub path: RepoPath,
    pub title: Option<String>,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    /// True when `document_type` came from frontmatter rather than inference.
    pub type_is_explicit: bool,
    pub custom_fields: serde_json::Map<String, serde_json::Value>,
    /// Logical ids of this document's section chunks, mirroring
    /// `SymbolNode::vector_ids` — lets a delete recover the vector points
    /// backing this document without a payload-filter scan.
    pub chunk_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSection {
    pub document: RepoPath,
    pub heading: String,
    pub level: u8,
    pub slug: String,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document: RepoPath,
    pub section_slug: String,
    pub text: String,
}

/// SessionKnowledge node: one turn of an agent session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionKnowledgeNode {
    pub session_id: String,
    pub turn_number: u32,
    pub summary: String,
    pub concern: Option<String>,
    pub files_touched: Vec<RepoPath>,
    pub symbols_referenced: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl SessionKnowledgeNode {
    pub fn key(&self) -> String {
        format!("{}:{}", self.session_id, self.turn_number)
    }
}

// ─────────────────────────── Edges ───────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportType {
    Default,
    Named,
    Namespace,
    SideEffect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportsEdge {
    pub from_file: RepoPath,
    pub to_file: RepoPath,
    pub line: u32,
    pub imported_symbols: Vec<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinesEdge {
    pub file: RepoPath,
    pub symbol: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsEdge {
    pub caller: String,
    pub callee: String,
    pub line: u32,
    pub call_count: u32,
    pub is_conditional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InheritsType {
    Extends,
    Implements,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InheritsEdge {
    pub subtype: String,
    pub supertype: String,
    pub inherits_type: InheritsType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifiesEdge {
    pub commit: String,
    pub file: RepoPath,
    pub change_type: ChangeType,
    pub insertions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouchesEdge {
    pub commit: String,
    pub symbol: String,
    pub change_type: ChangeType,
    pub line_delta: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AboutRole {
    Touched,
    Referenced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutEdge {
    pub session_key: String,
    /// Either a File path or a Symbol qualified_name.
    pub target: String,
    pub role: AboutRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowsEdge {
    pub from_session_key: String,
    pub to_session_key: String,
}

// ─────────────────────── Hierarchical summaries ───────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SummaryLevel {
    Symbol = 1,
    File = 2,
    Directory = 3,
    Repo = 4,
}

impl SummaryLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            SummaryLevel::Symbol => "l1",
            SummaryLevel::File => "l2",
            SummaryLevel::Directory => "l3",
            SummaryLevel::Repo => "l4",
        }
    }

    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            1 => Some(SummaryLevel::Symbol),
            2 => Some(SummaryLevel::File),
            3 => Some(SummaryLevel::Directory),
            4 => Some(SummaryLevel::Repo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalSummary {
    pub id: String,
    pub level: SummaryLevel,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub summary: String,
    pub keywords: Vec<String>,
    pub content_hash: String,
}

impl HierarchicalSummary {
    pub fn make_id(level: SummaryLevel, path_or_qn: &str) -> String {
        format!("{}:{}", level.prefix(), path_or_qn)
    }
}

// ─────────────────────── Authored metadata ───────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthoredPayload {
    DocumentMeta {
        document_type: Option<DocumentType>,
        status: Option<DocumentStatus>,
        tags: Vec<String>,
    },
    Relationship {
        from: String,
        to: String,
        relation: String,
    },
    Annotation {
        target: String,
        note: String,
    },
}

/// Durable sidecar entry. Never regenerated from code (spec §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthoredEntry {
    pub id: String,
    pub path: Option<RepoPath>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub git_commit: Option<String>,
    pub payload: AuthoredPayload,
}

// ─────────────────────── File ledger ───────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackedFileType {
    Code,
    Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub content_hash: String,
    pub size: u64,
    pub file_type: TrackedFileType,
    pub last_synced_at: DateTime<Utc>,
}

/// Deterministic hub-symbol threshold default (SPEC_FULL supplement):
/// in-degree + out-degree in CALLS at or above this marks a hub symbol.
pub const HUB_SYMBOL_THRESHOLD: u32 = 10;

/// A symbol reference set used by several dimensions/traversal contexts.
pub type SymbolSet = BTreeSet<String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_id_is_legacy_alias_of_first() {
        let sym = SymbolNode {
            qualified_name: "a.rs:f".into(),
            name: "f".into(),
            kind: SymbolKind::Function,
            file: "a.rs".into(),
            start_line: 1,
            end_line: 2,
            signature: "fn f()".into(),
            docstring: None,
            visibility: Visibility::Public,
            is_async: false,
            is_static: false,
            complexity: 1,
            vector_ids: vec!["a.rs:1:2".into(), "a.rs:1:2#doc".into()],
        };
        assert_eq!(sym.vector_id(), Some("a.rs:1:2"));
    }

    #[test]
    fn summary_level_ids_are_deterministic() {
        let id = HierarchicalSummary::make_id(SummaryLevel::Directory, "src/lib");
        assert_eq!(id, "l3:src/lib");
    }

    #[test]
    fn summarizable_unit_kinds() {
        assert!(SymbolKind::Function.is_summarizable_unit());
        assert!(SymbolKind::Method.is_summarizable_unit());
        assert!(!SymbolKind::Variable.is_summarizable_unit());
        assert!(!SymbolKind::Constant.is_summarizable_unit());
    }
}
