//! Wire shapes for the line-framed JSON-RPC transport (spec §4.9, §6).
//!
//! One JSON object per line, no embedded newlines. A request carries an
//! `id` the response echoes back; `method` is one of the four message
//! shapes spec §6 names.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    pub fn err(id: Value, error: RpcError) -> Self {
        Self { id, result: None, error: Some(error) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub kind: String,
    pub message: String,
}

impl From<cv_core::CvError> for RpcError {
    fn from(e: cv_core::CvError) -> Self {
        Self { kind: e.kind.as_str().to_string(), message: e.message }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_call_tool_params() {
        let raw = r#"{"id":1,"method":"call_tool","params":{"name":"search","arguments":{"query":"foo"}}}"#;
        let req: Request = serde_json::from_str(raw).unwrap();
        assert_eq!(req.method, "call_tool");
        let params: CallToolParams = serde_json::from_value(req.params).unwrap();
        assert_eq!(params.name, "search");
    }

    #[test]
    fn response_omits_absent_fields() {
        let resp = Response::ok(Value::from(1), serde_json::json!({"a": 1}));
        let s = serde_json::to_string(&resp).unwrap();
        assert!(!s.contains("error"));
    }
}
