use super::LanguageExtractor;
use crate::domain::{
    Chunk, ImportType, ParsedExport, ParsedFile, ParsedImport, ParsedKind, ParsedSymbol,
};
use crate::ts_support::*;
use cv_core::Result;
use tree_sitter::{Node, Parser};

pub struct TypeScriptExtractor;

impl LanguageExtractor for TypeScriptExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs"]
    }

    fn language_name(&self) -> &'static str {
        "typescript"
    }

    fn parse(&self, path: &str, source: &str) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        let language = if path.ends_with(".tsx") || path.ends_with(".jsx") {
            tree_sitter_typescript::language_tsx()
        } else {
            tree_sitter_typescript::language_typescript()
        };
        parser
            .set_language(&language)
            .map_err(|e| cv_core::CvError::parse(format!("tree-sitter language error: {e}")))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| cv_core::CvError::parse("tree-sitter produced no tree"))?;

        let mut symbols = Vec::new();
        let mut imports = Vec::new();
        let mut exports = Vec::new();
        let mut chunks = Vec::new();

        let root = tree.root_node();
        let mut cursor = root.walk();
        for top in root.children(&mut cursor) {
            visit_top_level(top, source, path, &mut symbols, &mut imports, &mut exports, &mut chunks);
        }

        let lines_of_code = source.lines().filter(|l| !l.trim().is_empty()).count() as u32;

        Ok(ParsedFile {
            path: path.to_string(),
            language: self.language_name().to_string(),
            symbols,
            imports,
            exports,
            chunks,
            lines_of_code,
        })
    }
}

fn visit_top_level(
    node: Node,
    source: &str,
    path: &str,
    symbols: &mut Vec<ParsedSymbol>,
    imports: &mut Vec<ParsedImport>,
    exports: &mut Vec<ParsedExport>,
    chunks: &mut Vec<Chunk>,
) {
    match node.kind() {
        "import_statement" => {
            if let Some(import) = extract_import(node, source) {
                imports.push(import);
            }
        }
        "export_statement" => {
            let is_default = node_text(&node, source).contains("export default");
            if let Some(decl) = node.child_by_field_name("declaration") {
                if let Some(sym) = extract_declaration(decl, source, true) {
                    exports.push(ParsedExport {
                        name: sym.name.clone(),
                        is_default,
                    });
                    chunks.push(make_chunk(path, &decl, source, Some(sym.qualified_name.clone())));
                    symbols.push(sym);
                }
            }
        }
        "function_declaration" | "class_declaration" | "interface_declaration" => {
            if let Some(sym) = extract_declaration(node, source, false) {
                chunks.push(make_chunk(path, &node, source, Some(sym.qualified_name.clone())));
                symbols.push(sym);
            }
        }
        _ => {}
    }
}

fn make_chunk(path: &str, node: &Node, source: &str, symbol_context: Option<String>) -> Chunk {
    let s = start_line(node);
    let e = end_line(node);
    Chunk {
        id: Chunk::make_id(path, s, e),
        start_line: s,
        end_line: e,
        text: node_text(node, source).to_string(),
        symbol_context,
    }
}

fn extract_declaration(node: Node, source: &str, is_exported: bool) -> Option<ParsedSymbol> {
    let kind = match node.kind() {
        "function_declaration" => ParsedKind::Function,
        "class_declaration" => ParsedKind::Class,
        "interface_declaration" => ParsedKind::Interface,
        _ => return None,
    };
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(&name_node, source).to_string();
    let file = ""; // filled by caller via qualified_name below (path injected by caller)
    let _ = file;

    let is_async = node_text(&node, source).trim_start().starts_with("async")
        || node
            .children(&mut node.walk())
            .any(|c| c.kind() == "async");

    let signature = extract_signature(node, source);
    let docstring = extract_leading_comment(node, source);
    let calls = collect_calls(node, source, "call_expression", "function");

    Some(ParsedSymbol {
        qualified_name: name.clone(), // re-qualified by the sync engine with the file path
        name,
        kind,
        start_line: start_line(&node),
        end_line: end_line(&node),
        signature,
        docstring,
        is_public: is_exported,
        is_async,
        is_static: false,
        complexity: branch_complexity(node),
        calls,
    })
}

fn extract_signature(node: Node, source: &str) -> String {
    let header_end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or(node.end_byte());
    source
        .get(node.start_byte()..header_end)
        .unwrap_or("")
        .trim()
        .to_string()
}

/// JSDoc-style `/** ... */` comment immediately preceding the node.
fn extract_leading_comment(node: Node, source: &str) -> Option<String> {
    let prev = node.prev_sibling()?;
    if prev.kind() == "comment" {
        let text = node_text(&prev, source);
        if text.starts_with("/**") {
            return Some(
                text.trim_start_matches("/**")
                    .trim_end_matches("*/")
                    .lines()
                    .map(|l| l.trim().trim_start_matches('*').trim())
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim()
                    .to_string(),
            );
        }
    }
    None
}

fn extract_import(node: Node, source: &str) -> Option<ParsedImport> {
    let source_node = node.child_by_field_name("source")?;
    let raw_source = node_text(&source_node, source).trim_matches(['"', '\'']).to_string();
    let is_external = !raw_source.starts_with('.') && !raw_source.starts_with('/');

    let mut imported_symbols = Vec::new();
    let mut import_type = ImportType::SideEffect;

    if let Some(clause) = node.child_by_field_name("clause") {
        let mut cursor = clause.walk();
        for child in clause.children(&mut cursor) {
            match child.kind() {
                "named_imports" => {
                    import_type = ImportType::Named;
                    let mut ic = child.walk();
                    for spec in child.children(&mut ic) {
                        if spec.kind() == "import_specifier" {
                            if let Some(name) = spec.child_by_field_name("name") {
                                imported_symbols.push(node_text(&name, source).to_string());
                            }
                        }
                    }
                }
                "namespace_import" => {
                    import_type = ImportType::Namespace;
                    imported_symbols.push(node_text(&child, source).to_string());
                }
                "identifier" => {
                    import_type = ImportType::Default;
                    imported_symbols.push(node_text(&child, source).to_string());
                }
                _ => {}
            }
        }
    }

    Some(ParsedImport {
        source: raw_source,
        imported_symbols,
        import_type,
        is_external,
        line: start_line(&node),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exported_function_and_call() {
        let extractor = TypeScriptExtractor;
        let src = "export function f() { g(); }";
        let parsed = extractor.parse("src/a.ts", src).unwrap();
        assert_eq!(parsed.symbols.len(), 1);
        let f = &parsed.symbols[0];
        assert_eq!(f.name, "f");
        assert!(f.is_public);
        assert_eq!(f.calls.len(), 1);
        assert_eq!(f.calls[0].callee_name, "g");
        assert!(!f.calls[0].is_conditional);
    }

    #[test]
    fn parses_named_import() {
        let extractor = TypeScriptExtractor;
        let src = "import {f} from './a'; export function g(){}";
        let parsed = extractor.parse("src/b.ts", src).unwrap();
        assert_eq!(parsed.imports.len(), 1);
        assert_eq!(parsed.imports[0].source, "./a");
        assert_eq!(parsed.imports[0].imported_symbols, vec!["f".to_string()]);
        assert!(!parsed.imports[0].is_external);
        assert_eq!(parsed.symbols.len(), 1);
        assert_eq!(parsed.symbols[0].name, "g");
    }

    #[test]
    fn flags_conditional_call() {
        let extractor = TypeScriptExtractor;
        let src = "export function f() { if (true) { g(); } }";
        let parsed = extractor.parse("src/a.ts", src).unwrap();
        assert_eq!(parsed.symbols[0].calls[0].callee_name, "g");
        assert!(parsed.symbols[0].calls[0].is_conditional);
    }
}
