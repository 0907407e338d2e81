//! Lowers `cv_parser` output into `cv_core::model` graph nodes/edges and
//! embeddable chunks (spec §4.2 "parse -> graph upsert -> vector upsert").

use cv_core::model::{
    DocumentChunk, DocumentNode, DocumentStatus, DocumentType, FileNode, ModuleType, SymbolKind,
    SymbolNode, Visibility,
};
use cv_parser::domain::{InferredDocumentType, ParsedDocument, ParsedFile};
use cv_parser::domain::Chunk as ParserChunk;
use chrono::Utc;

pub struct LoweredSource {
    pub file: FileNode,
    pub symbols: Vec<SymbolNode>,
    /// (caller qualified_name, callee bare name, line, is_conditional)
    pub pending_calls: Vec<(String, String, u32, bool)>,
    pub imports: Vec<cv_parser::domain::ParsedImport>,
    pub chunks: Vec<ParserChunk>,
}

pub fn lower_source(path: &str, content_hash: &str, size: u64, parsed: &ParsedFile) -> LoweredSource {
    let file = FileNode {
        path: path.to_string(),
        language: parsed.language.clone(),
        git_hash: content_hash.to_string(),
        size,
        lines_of_code: parsed.lines_of_code,
        complexity: parsed.symbols.iter().map(|s| s.complexity).max().unwrap_or(1),
        last_modified: Utc::now(),
    };

    let mut symbols = Vec::new();
    let mut pending_calls = Vec::new();

    for sym in &parsed.symbols {
        let qualified_name = format!("{path}:{}", sym.qualified_name);
        for call in &sym.calls {
            pending_calls.push((qualified_name.clone(), call.callee_name.clone(), call.line, call.is_conditional));
        }
        let vector_ids = parsed
            .chunks
            .iter()
            .filter(|c| c.symbol_context.as_deref() == Some(sym.qualified_name.as_str()))
            .map(|c| c.id.clone())
            .collect();
        symbols.push(SymbolNode {
            qualified_name,
            name: sym.name.clone(),
            kind: sym.kind.into_core(),
            file: path.to_string(),
            start_line: sym.start_line,
            end_line: sym.end_line,
            signature: sym.signature.clone(),
            docstring: sym.docstring.clone(),
            visibility: if sym.is_public { Visibility::Public } else { Visibility::Private },
            is_async: sym.is_async,
            is_static: sym.is_static,
            complexity: sym.complexity,
            vector_ids,
        });
    }

    LoweredSource {
        file,
        symbols,
        pending_calls,
        imports: parsed.imports.clone(),
        chunks: parsed.chunks.clone(),
    }
}

pub struct LoweredDocument {
    pub document: DocumentNode,
    pub chunks: Vec<DocumentChunk>,
}

pub fn lower_document(path: &str, parsed: &ParsedDocument) -> LoweredDocument {
    let document_type = match &parsed.explicit_document_type {
        Some(t) => parse_explicit_type(t).unwrap_or_else(|| from_inferred(parsed.inferred_document_type)),
        None => from_inferred(parsed.inferred_document_type),
    };
    let title = parsed.headings.first().map(|h| h.text.clone());

    let chunks: Vec<DocumentChunk> = parsed
        .sections
        .iter()
        .map(|section| DocumentChunk {
            id: format!("{path}#{}", section.slug),
            document: path.to_string(),
            section_slug: section.slug.clone(),
            text: section.text.clone(),
        })
        .collect();

    let document = DocumentNode {
        path: path.to_string(),
        title,
        document_type,
        status: DocumentStatus::Active,
        type_is_explicit: parsed.explicit_document_type.is_some(),
        custom_fields: parsed.custom_fields.clone(),
        chunk_ids: chunks.iter().map(|c| c.id.clone()).collect(),
    };

    LoweredDocument { document, chunks }
}

fn parse_explicit_type(raw: &str) -> Option<DocumentType> {
    match raw.to_lowercase().as_str() {
        "readme" => Some(DocumentType::Readme),
        "changelog" => Some(DocumentType::Changelog),
        "adr" => Some(DocumentType::Adr),
        "guide" => Some(DocumentType::Guide),
        "spec" => Some(DocumentType::Spec),
        "other" => Some(DocumentType::Other),
        _ => None,
    }
}

fn from_inferred(inferred: InferredDocumentType) -> DocumentType {
    match inferred {
        InferredDocumentType::Readme => DocumentType::Readme,
        InferredDocumentType::Changelog => DocumentType::Changelog,
        InferredDocumentType::Adr => DocumentType::Adr,
        InferredDocumentType::Guide => DocumentType::Guide,
        InferredDocumentType::Spec => DocumentType::Spec,
        InferredDocumentType::Other => DocumentType::Other,
    }
}

/// Directory-level `ModuleNode` rebuilt every tick from the file set.
pub fn module_type_for(_path: &str) -> ModuleType {
    ModuleType::Directory
}

pub fn is_summarizable(kind: SymbolKind) -> bool {
    kind.is_summarizable_unit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_parser::Parser as SourceParser;

    #[test]
    fn symbol_qualified_names_are_file_prefixed() {
        let parser = SourceParser::new();
        let outcome = parser
            .parse("src/a.ts", b"export function f() { g(); }", cv_parser::DEFAULT_MAX_FILE_SIZE)
            .unwrap();
        let parsed = match outcome {
            cv_parser::ParseOutcome::Source(p) => p,
            _ => panic!("expected source"),
        };
        let lowered = lower_source("src/a.ts", "hash", 10, &parsed);
        assert_eq!(lowered.symbols[0].qualified_name, "src/a.ts:f");
        assert_eq!(lowered.pending_calls[0].1, "g");
    }

    #[test]
    fn document_type_inference_flows_through_to_document_node() {
        let doc = cv_parser::markdown::parse_markdown("README.md", "# R\n## S\ntext\n");
        let lowered = lower_document("README.md", &doc);
        assert_eq!(lowered.document.document_type, DocumentType::Readme);
        assert!(!lowered.document.type_is_explicit);
    }
}
