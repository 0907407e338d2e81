//! Parser output types (spec §4.1). These are intermediate records; the
//! Delta-Sync Engine lowers them into `cv_core::model` nodes/edges.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    pub callee_name: String,
    pub line: u32,
    pub is_conditional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedKind {
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

impl ParsedKind {
    pub fn into_core(self) -> cv_core::model::SymbolKind {
        use cv_core::model::SymbolKind as K;
        match self {
            ParsedKind::Function => K::Function,
            ParsedKind::Method => K::Method,
            ParsedKind::Class => K::Class,
            ParsedKind::Interface => K::Interface,
            ParsedKind::Type => K::Type,
            ParsedKind::Variable => K::Variable,
            ParsedKind::Constant => K::Constant,
            ParsedKind::Enum => K::Enum,
            ParsedKind::Struct => K::Struct,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSymbol {
    pub qualified_name: String,
    pub name: String,
    pub kind: ParsedKind,
    pub start_line: u32,
    pub end_line: u32,
    pub signature: String,
    pub docstring: Option<String>,
    pub is_public: bool,
    pub is_async: bool,
    pub is_static: bool,
    /// 1 when lexically malformed (spec §4.1 edge-case policy); otherwise
    /// a crude cyclomatic-complexity proxy (branch/loop keyword count + 1).
    pub complexity: u32,
    pub calls: Vec<CallSite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportType {
    Default,
    Named,
    Namespace,
    SideEffect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedImport {
    pub source: String,
    pub imported_symbols: Vec<String>,
    pub import_type: ImportType,
    pub is_external: bool,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedExport {
    pub name: String,
    pub is_default: bool,
}

/// A syntactic range suitable for embedding. `id = <file>:<startLine>:<endLine>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
    pub symbol_context: Option<String>,
}

impl Chunk {
    pub fn make_id(file: &str, start_line: u32, end_line: u32) -> String {
        format!("{file}:{start_line}:{end_line}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: String,
    pub language: String,
    pub symbols: Vec<ParsedSymbol>,
    pub imports: Vec<ParsedImport>,
    pub exports: Vec<ParsedExport>,
    pub chunks: Vec<Chunk>,
    pub lines_of_code: u32,
}

// ─────────────────────────── Markdown ───────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub line: u32,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub target: String,
    pub text: String,
    pub line: u32,
    pub is_internal: bool,
    pub is_code_ref: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub slug: String,
    pub level: u8,
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferredDocumentType {
    Readme,
    Changelog,
    Adr,
    Guide,
    Spec,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub path: String,
    pub frontmatter: serde_json::Map<String, serde_json::Value>,
    pub custom_fields: serde_json::Map<String, serde_json::Value>,
    /// Frontmatter's `document_type`, when present — always wins over inference.
    pub explicit_document_type: Option<String>,
    pub inferred_document_type: InferredDocumentType,
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Source(ParsedFile),
    Document(ParsedDocument),
    /// Binary, oversized, or otherwise unparseable; not a failure (spec §4.1).
    Rejected { reason: String },
}
