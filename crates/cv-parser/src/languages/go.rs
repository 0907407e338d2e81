use super::LanguageExtractor;
use crate::domain::{
    Chunk, ImportType, ParsedExport, ParsedFile, ParsedImport, ParsedKind, ParsedSymbol,
};
use crate::ts_support::*;
use cv_core::Result;
use tree_sitter::{Node, Parser};

pub struct GoExtractor;

impl LanguageExtractor for GoExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn language_name(&self) -> &'static str {
        "go"
    }

    fn parse(&self, path: &str, source: &str) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::language())
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
        "import_declaration" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_import_specs(child, source, imports);
            }
        }
        "function_declaration" | "method_declaration" => {
            if let Some(sym) = extract_function(node, source) {
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
        "type_declaration" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "type_spec" {
                    if let Some(sym) = extract_type_spec(child, source) {
                        chunks.push(make_chunk(path, &child, source, Some(sym.qualified_name.clone())));
                        symbols.push(sym);
                    }
                }
            }
        }
        _ => {}
    }
}

fn collect_import_specs(node: Node, source: &str, imports: &mut Vec<ParsedImport>) {
    match node.kind() {
        "import_spec" => {
            if let Some(import) = extract_import_spec(node, source) {
                imports.push(import);
            }
        }
        "import_spec_list" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_import_specs(child, source, imports);
            }
        }
        _ => {}
    }
}

fn extract_import_spec(node: Node, source: &str) -> Option<ParsedImport> {
    let path_node = node.child_by_field_name("path")?;
    let raw_path = node_text(&path_node, source).trim_matches('"').to_string();
    let alias = node
        .child_by_field_name("name")
        .map(|n| node_text(&n, source).to_string());
    let is_external = !raw_path.starts_with('.');
    let imported_symbols = vec![alias
        .clone()
        .unwrap_or_else(|| raw_path.rsplit('/').next().unwrap_or(&raw_path).to_string())];
    Some(ParsedImport {
        source: raw_path,
        imported_symbols,
        import_type: if alias.is_some() {
            ImportType::Default
        } else {
            ImportType::Namespace
        },
        is_external,
        line: start_line(&node),
    })
}

fn extract_function(node: Node, source: &str) -> Option<ParsedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(&name_node, source).to_string();
    let receiver_type = node
        .child_by_field_name("receiver")
        .and_then(|r| receiver_type_name(r, source));

    let qualified_name = match &receiver_type {
        Some(t) => format!("{t}.{name}"),
        None => name.clone(),
    };
    let kind = if receiver_type.is_some() {
        ParsedKind::Method
    } else {
        ParsedKind::Function
    };
    let is_public = name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);

    Some(ParsedSymbol {
        qualified_name,
        name,
        kind,
        start_line: start_line(&node),
        end_line: end_line(&node),
        signature: extract_signature(node, source),
        docstring: extract_doc_comment(node, source),
        is_public,
        is_async: false,
        is_static: receiver_type.is_none(),
        complexity: branch_complexity(node),
        calls: collect_calls(node, source, "call_expression", "function"),
    })
}

/// Receiver parameter list is a single field holding `(r *T)` — dig out `T`.
fn receiver_type_name(receiver: Node, source: &str) -> Option<String> {
    let mut cursor = receiver.walk();
    for param in receiver.children(&mut cursor) {
        if param.kind() == "parameter_declaration" {
            if let Some(ty) = param.child_by_field_name("type") {
                let text = node_text(&ty, source).trim_start_matches('*').to_string();
                return Some(text);
            }
        }
    }
    None
}

fn extract_type_spec(node: Node, source: &str) -> Option<ParsedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(&name_node, source).to_string();
    let kind = node
        .child_by_field_name("type")
        .map(|t| match t.kind() {
            "struct_type" => ParsedKind::Struct,
            "interface_type" => ParsedKind::Interface,
            _ => ParsedKind::Struct,
        })
        .unwrap_or(ParsedKind::Struct);
    let is_public = name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
    Some(ParsedSymbol {
        qualified_name: name.clone(),
        name: name.clone(),
        kind,
        start_line: start_line(&node),
        end_line: end_line(&node),
        signature: format!("type {name}"),
        docstring: extract_doc_comment(node, source),
        is_public,
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

/// Contiguous `//` line comments immediately preceding the declaration.
fn extract_doc_comment(node: Node, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(n) = current {
        if n.kind() == "comment" && node_text(&n, source).starts_with("//") {
            lines.push(node_text(&n, source).trim_start_matches("//").trim().to_string());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_exported_function_with_doc_comment() {
        let extractor = GoExtractor;
        let src = "package main\n\n// Run does a thing\nfunc Run() {\n\tg()\n}\n";
        let parsed = extractor.parse("a.go", src).unwrap();
        assert_eq!(parsed.symbols.len(), 1);
        assert_eq!(parsed.symbols[0].name, "Run");
        assert!(parsed.symbols[0].is_public);
        assert_eq!(parsed.symbols[0].docstring.as_deref(), Some("Run does a thing"));
        assert_eq!(parsed.symbols[0].calls[0].callee_name, "g");
    }

    #[test]
    fn methods_are_qualified_by_receiver_type() {
        let extractor = GoExtractor;
        let src = "package main\n\ntype S struct{}\n\nfunc (s *S) Do() {}\n";
        let parsed = extractor.parse("a.go", src).unwrap();
        let method = parsed.symbols.iter().find(|s| s.name == "Do").unwrap();
        assert_eq!(method.qualified_name, "S.Do");
        assert_eq!(method.kind, ParsedKind::Method);
    }

    #[test]
    fn unexported_function_is_not_public() {
        let extractor = GoExtractor;
        let src = "package main\n\nfunc helper() {}\n";
        let parsed = extractor.parse("a.go", src).unwrap();
        assert!(!parsed.symbols[0].is_public);
    }

    #[test]
    fn import_alias_is_captured() {
        let extractor = GoExtractor;
        let src = "package main\n\nimport (\n\tfoo \"example.com/foo\"\n)\n";
        let parsed = extractor.parse("a.go", src).unwrap();
        assert_eq!(parsed.imports[0].source, "example.com/foo");
        assert_eq!(parsed.imports[0].imported_symbols, vec!["foo".to_string()]);
        assert!(parsed.imports[0].is_external);
    }
}
