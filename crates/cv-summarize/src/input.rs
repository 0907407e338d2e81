//! Inputs the Summarizer needs from a parsed file. Deliberately decoupled
//! from `cv-parser`'s `ParsedFile` (hexagonal seam) so summarization can be
//! driven by the sync engine without a direct crate dependency.

#[derive(Debug, Clone)]
pub struct SymbolInput {
    pub qualified_name: String,
    pub name: String,
    pub kind_label: String,
    pub is_summarizable: bool,
    pub signature: String,
    pub docstring: Option<String>,
    pub body_excerpt: String,
}

#[derive(Debug, Clone)]
pub struct FileSummaryInput {
    pub path: String,
    pub imports: Vec<String>,
    pub symbols: Vec<SymbolInput>,
}
