use super::LanguageExtractor;
use crate::domain::{
    Chunk, ImportType, ParsedExport, ParsedFile, ParsedImport, ParsedKind, ParsedSymbol,
};
use crate::ts_support::*;
use cv_core::Result;
use tree_sitter::{Node, Parser};

pub struct PythonExtractor;

impl LanguageExtractor for PythonExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn language_name(&self) -> &'static str {
        "python"
    }

    fn parse(&self, path: &str, source: &str) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::language())
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
            visit_module_level(top, source, path, None, &mut symbols, &mut imports, &mut exports, &mut chunks);
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

fn visit_module_level(
    node: Node,
    source: &str,
    path: &str,
    parent_class: Option<&str>,
    symbols: &mut Vec<ParsedSymbol>,
    imports: &mut Vec<ParsedImport>,
    exports: &mut Vec<ParsedExport>,
    chunks: &mut Vec<Chunk>,
) {
    match node.kind() {
        "import_statement" | "import_from_statement" => {
            if let Some(import) = extract_import(node, source) {
                imports.push(import);
            }
        }
        "decorated_definition" => {
            if let Some(def) = node.child_by_field_name("definition") {
                visit_module_level(def, source, path, parent_class, symbols, imports, exports, chunks);
            }
        }
        "function_definition" => {
            if let Some(sym) = extract_function(node, source, parent_class) {
                let is_public = !sym.name.starts_with('_');
                exports.push(ParsedExport {
                    name: sym.name.clone(),
                    is_default: false,
                });
                chunks.push(make_chunk(path, &node, source, Some(sym.qualified_name.clone())));
                symbols.push(ParsedSymbol { is_public, ..sym });
            }
        }
        "class_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(&name_node, source).to_string();
                let is_public = !name.starts_with('_');
                let docstring = extract_docstring(node, source);
                chunks.push(make_chunk(path, &node, source, Some(name.clone())));
                symbols.push(ParsedSymbol {
                    qualified_name: name.clone(),
                    name: name.clone(),
                    kind: ParsedKind::Class,
                    start_line: start_line(&node),
                    end_line: end_line(&node),
                    signature: format!("class {name}"),
                    docstring,
                    is_public,
                    is_async: false,
                    is_static: false,
                    complexity: branch_complexity(node),
                    calls: collect_calls(node, source, "call", "function"),
                });
                if let Some(body) = node.child_by_field_name("body") {
                    let mut bc = body.walk();
                    for child in body.children(&mut bc) {
                        visit_module_level(child, source, path, Some(&name), symbols, imports, exports, chunks);
                    }
                }
            }
        }
        _ => {}
    }
}

fn extract_function(node: Node, source: &str, parent_class: Option<&str>) -> Option<ParsedSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(&name_node, source).to_string();
    let qualified_name = match parent_class {
        Some(c) => format!("{c}.{name}"),
        None => name.clone(),
    };
    let kind = if parent_class.is_some() {
        ParsedKind::Method
    } else {
        ParsedKind::Function
    };
    let is_async = node_text(&node, source).trim_start().starts_with("async");
    let docstring = extract_docstring(node, source);
    let signature = extract_signature(node, source);

    Some(ParsedSymbol {
        qualified_name,
        name,
        kind,
        start_line: start_line(&node),
        end_line: end_line(&node),
        signature,
        docstring,
        is_public: true,
        is_async,
        is_static: false,
        complexity: branch_complexity(node),
        calls: collect_calls(node, source, "call", "function"),
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
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// First statement of the body being a bare string literal is the docstring.
fn extract_docstring(node: Node, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() == "expression_statement" {
        let expr = first.named_child(0)?;
        if expr.kind() == "string" {
            let text = node_text(&expr, source);
            return Some(
                text.trim_matches(|c| c == '"' || c == '\'')
                    .trim()
                    .to_string(),
            );
        }
    }
    None
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

fn extract_import(node: Node, source: &str) -> Option<ParsedImport> {
    if node.kind() == "import_statement" {
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "dotted_name" || child.kind() == "aliased_import" {
                names.push(node_text(&child, source).to_string());
            }
        }
        let source_name = names.first().cloned().unwrap_or_default();
        return Some(ParsedImport {
            source: source_name,
            imported_symbols: names,
            import_type: ImportType::Namespace,
            is_external: true,
            line: start_line(&node),
        });
    }
    if node.kind() == "import_from_statement" {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| node_text(&m, source).to_string())
            .unwrap_or_default();
        let mut imported_symbols = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "dotted_name" && node_text(&child, source) != module {
                imported_symbols.push(node_text(&child, source).to_string());
            }
            if child.kind() == "wildcard_import" {
                imported_symbols.push("*".to_string());
            }
        }
        let is_external = !module.starts_with('.');
        return Some(ParsedImport {
            source: module,
            imported_symbols,
            import_type: ImportType::Named,
            is_external,
            line: start_line(&node),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_and_docstring() {
        let extractor = PythonExtractor;
        let src = "def f():\n    \"\"\"does things\"\"\"\n    g()\n";
        let parsed = extractor.parse("a.py", src).unwrap();
        assert_eq!(parsed.symbols.len(), 1);
        assert_eq!(parsed.symbols[0].name, "f");
        assert_eq!(parsed.symbols[0].docstring.as_deref(), Some("does things"));
        assert_eq!(parsed.symbols[0].calls[0].callee_name, "g");
    }

    #[test]
    fn extracts_method_qualified_name() {
        let extractor = PythonExtractor;
        let src = "class C:\n    def m(self):\n        pass\n";
        let parsed = extractor.parse("a.py", src).unwrap();
        let method = parsed.symbols.iter().find(|s| s.name == "m").unwrap();
        assert_eq!(method.qualified_name, "C.m");
        assert_eq!(method.kind, ParsedKind::Method);
    }

    #[test]
    fn extracts_from_import() {
        let extractor = PythonExtractor;
        let src = "from .utils import helper\n";
        let parsed = extractor.parse("a.py", src).unwrap();
        assert_eq!(parsed.imports[0].source, ".utils");
        assert!(!parsed.imports[0].is_external);
        assert_eq!(parsed.imports[0].imported_symbols, vec!["helper".to_string()]);
    }
}
