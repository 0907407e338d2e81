use super::LanguageExtractor;
use crate::domain::{
    Chunk, ImportType, ParsedExport, ParsedFile, ParsedImport, ParsedKind, ParsedSymbol,
};
use crate::ts_support::*;
use cv_core::Result;
use tree_sitter::{Node, Parser};

pub struct RustExtractor;

impl LanguageExtractor for RustExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn language_name(&self) -> &'static str {
        "rust"
    }

    fn parse(&self, path: &str, source: &str) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::language())
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
            visit_item(top, source, path, None, &mut symbols, &mut imports, &mut exports, &mut chunks);
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

fn visit_item(
    node: Node,
    source: &str,
    path: &str,
    impl_type: Option<&str>,
    symbols: &mut Vec<ParsedSymbol>,
    imports: &mut Vec<ParsedImport>,
    exports: &mut Vec<ParsedExport>,
    chunks: &mut Vec<Chunk>,
) {
    match node.kind() {
        "use_declaration" => {
            if let Some(import) = extract_use(node, source) {
                imports.push(import);
            }
        }
        "function_item" => {
            if let Some(sym) = extract_function(node, source, impl_type) {
                if sym.is_public {
                    exports.push(ParsedExport {
                        name: sym.name.clone(),
                        is_default: false,
                    });
                }
                chunks.push(make_chunk(path, &node, source, Some(sym.qualified_name.clone())));
                symbols.push(sym);
            }
        }
        "struct_item" | "enum_item" => {
            if let Some(sym) = extract_type_decl(node, source) {
                chunks.push(make_chunk(path, &node, source, Some(sym.qualified_name.clone())));
                symbols.push(sym);
            }
        }
        "impl_item" => {
            let type_name = node
                .child_by_field_name("type")
                .map(|t| node_text(&t, source).to_string());
            if let (Some(body), Some(type_name)) = (node.child_by_field_name("body"), type_name) {
                let mut bc = body.walk();
                for child in body.children(&mut bc) {
                    visit_item(child, source, path, Some(&type_name), symbols, imports, exports, chunks);
                }
            }
        }
        "mod_item" => {
            if let Some(body) = node.child_by_field_name("body") {
                let mut bc = body.walk();
                for child in body.children(&mut bc) {
                    visit_item(child, source, path, impl_type, symbols, imports, exports, chunks);
                }
            }
        }
        _ => {}
    }
}

fn is_pub(node: Node) -> bool {
    node.children(&mut node.walk())
        .any(|c| c.kind() == "visibility_modifier")
}

fn extract_function(node: Node, source: &str, impl_type: Option<&str>) -> Option<ParsedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(&name_node, source).to_string();
    let qualified_name = match impl_type {
        Some(t) => format!("{t}::{name}"),
        None => name.clone(),
    };
    let kind = if impl_type.is_some() {
        ParsedKind::Method
    } else {
        ParsedKind::Function
    };
    let is_async = node
        .children(&mut node.walk())
        .any(|c| c.kind() == "async" || node_text(&c, source) == "async");
    let is_static = impl_type.is_some()
        && node
            .child_by_field_name("parameters")
            .map(|p| !node_text(&p, source).contains("self"))
            .unwrap_or(true);

    Some(ParsedSymbol {
        qualified_name,
        name,
        kind,
        start_line: start_line(&node),
        end_line: end_line(&node),
        signature: extract_signature(node, source),
        docstring: extract_doc_comment(node, source),
        is_public: is_pub(node),
        is_async,
        is_static,
        complexity: branch_complexity(node),
        calls: collect_calls(node, source, "call_expression", "function"),
    })
}

fn extract_type_decl(node: Node, source: &str) -> Option<ParsedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(&name_node, source).to_string();
    let kind = if node.kind() == "struct_item" {
        ParsedKind::Struct
    } else {
        ParsedKind::Enum
    };
    Some(ParsedSymbol {
        qualified_name: name.clone(),
        name: name.clone(),
        kind,
        start_line: start_line(&node),
        end_line: end_line(&node),
        signature: format!("{} {}", node.kind().trim_end_matches("_item"), name),
        docstring: extract_doc_comment(node, source),
        is_public: is_pub(node),
        is_async: false,
        is_static: false,
        complexity: 1,
        calls: Vec::new(),
    })
}

fn extract_signature(node: Node, source: &str) -> String {
    let header_end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or(node.end_byte());
    source.get(node.start_byte()..header_end).unwrap_or("").trim().to_string()
}

/// Contiguous `///` or `/** */` comments immediately preceding the item.
fn extract_doc_comment(node: Node, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(n) = current {
        if n.kind() == "line_comment" && node_text(&n, source).starts_with("///") {
            lines.push(node_text(&n, source).trim_start_matches("///").trim().to_string());
            current = n.prev_sibling();
        } else {
            break;
        }
    }
    if lines.is_empty() {
        None
    } else {
        lines.reverse();
        Some(lines.join("\n"))
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

fn extract_use(node: Node, source: &str) -> Option<ParsedImport> {
    let arg = node.child_by_field_name("argument")?;
    let text = node_text(&arg, source).to_string();
    let is_external = !text.starts_with("crate") && !text.starts_with("self") && !text.starts_with("super");
    Some(ParsedImport {
        source: text.clone(),
        imported_symbols: vec![text.rsplit("::").next().unwrap_or(&text).to_string()],
        import_type: ImportType::Named,
        is_external,
        line: start_line(&node),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_pub_function_with_doc_comment() {
        let extractor = RustExtractor;
        let src = "/// does a thing\npub fn f() {\n    g();\n}\n";
        let parsed = extractor.parse("a.rs", src).unwrap();
        assert_eq!(parsed.symbols.len(), 1);
        assert!(parsed.symbols[0].is_public);
        assert_eq!(parsed.symbols[0].docstring.as_deref(), Some("does a thing"));
        assert_eq!(parsed.symbols[0].calls[0].callee_name, "g");
    }

    #[test]
    fn methods_are_qualified_by_impl_type() {
        let extractor = RustExtractor;
        let src = "struct S;\nimpl S {\n    pub fn new() -> Self { S }\n}\n";
        let parsed = extractor.parse("a.rs", src).unwrap();
        let method = parsed.symbols.iter().find(|s| s.name == "new").unwrap();
        assert_eq!(method.qualified_name, "S::new");
        assert_eq!(method.kind, ParsedKind::Method);
        assert!(method.is_static);
    }

    #[test]
    fn use_declaration_is_external_unless_crate_relative() {
        let extractor = RustExtractor;
        let src = "use crate::model::Foo;\nuse serde::Serialize;\n";
        let parsed = extractor.parse("a.rs", src).unwrap();
        assert!(!parsed.imports[0].is_external);
        assert!(parsed.imports[1].is_external);
    }
}
