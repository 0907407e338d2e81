//! Client-side Cypher parameter substitution (spec §4.3). FalkorDB's
//! `GRAPH.QUERY` takes a single Cypher string; parameters are substituted
//! here with single-quote escaping rather than sent as a separate bind map.
//! Treat `query()` callers as untrusted — never forward raw user input.

use serde_json::Value;

pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", escape_string(s)),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(_) => format!("'{}'", escape_string(&value.to_string())),
    }
}

/// Substitutes every `$name` token in `expr` with the escaped literal from
/// `params`. Unreferenced params are ignored; unbound `$name` tokens are
/// left as-is (the backend will reject them as a syntax error).
pub fn substitute(expr: &str, params: &std::collections::HashMap<String, Value>) -> String {
    let mut out = expr.to_string();
    for (key, value) in params {
        let token = format!("${key}");
        out = out.replace(&token, &literal(value));
    }
    out
}

/// Builds a Cypher `SET` clause fragment from a flat JSON object, e.g.
/// `{"path": "a.rs"}` -> `n.path = 'a.rs'`.
pub fn set_clause(alias: &str, properties: &serde_json::Map<String, Value>) -> String {
    properties
        .iter()
        .map(|(k, v)| format!("{alias}.{k} = {}", literal(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_single_quotes_in_string_literals() {
        assert_eq!(literal(&json!("O'Brien")), "'O\\'Brien'");
    }

    #[test]
    fn substitutes_named_params() {
        let mut params = std::collections::HashMap::new();
        params.insert("path".to_string(), json!("src/a.rs"));
        let out = substitute("MATCH (f:File {path: $path}) RETURN f", &params);
        assert_eq!(out, "MATCH (f:File {path: 'src/a.rs'}) RETURN f");
    }
}
