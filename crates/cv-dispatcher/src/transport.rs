//! Line-framed JSON-RPC stdio transport (spec §6: "Line-framed JSON-RPC
//! over stdio. Message shapes: `list_tools`, `call_tool{name, arguments}`,
//! `list_resources`, `read_resource{uri}`"). One request, one response,
//! one line each — no batching, no partial frames.

use cv_core::{CvError, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::dispatcher::Dispatcher;
use crate::protocol::{CallToolParams, ReadResourceParams, Request, Response, RpcError};

/// Serves requests from stdin, writing responses to stdout, until stdin
/// closes. Malformed lines get an id-less error response rather than
/// killing the loop.
pub async fn serve_stdio(dispatcher: &Dispatcher) -> Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    serve(dispatcher, BufReader::new(stdin), stdout).await
}

pub async fn serve<R, W>(dispatcher: &Dispatcher, reader: R, mut writer: W) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.map_err(CvError::from)? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(dispatcher, &line).await;
        write_response(&mut writer, &response).await?;
    }
    Ok(())
}

async fn handle_line(dispatcher: &Dispatcher, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return Response::err(
                Value::Null,
                RpcError { kind: "validation".to_string(), message: format!("malformed request: {e}") },
            );
        }
    };
    let id = request.id.clone();
    match dispatch_request(dispatcher, request).await {
        Ok(result) => Response::ok(id, result),
        Err(e) => Response::err(id, e.into()),
    }
}

async fn dispatch_request(dispatcher: &Dispatcher, request: Request) -> Result<Value> {
    match request.method.as_str() {
        "list_tools" => Ok(json!(dispatcher.list_tools())),
        "list_resources" => Ok(json!(dispatcher.list_resources())),
        "call_tool" => {
            let params: CallToolParams = serde_json::from_value(request.params)
                .map_err(|e| CvError::validation(format!("invalid call_tool params: {e}")))?;
            let result = dispatcher.call_tool(&params.name, params.arguments).await;
            Ok(json!(result))
        }
        "read_resource" => {
            let params: ReadResourceParams = serde_json::from_value(request.params)
                .map_err(|e| CvError::validation(format!("invalid read_resource params: {e}")))?;
            let contents = dispatcher.read_resource(&params.uri).await?;
            Ok(json!({"contents": [contents]}))
        }
        other => Err(CvError::validation(format!("unknown method '{other}'"))),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<()> {
    let mut line = serde_json::to_string(response).map_err(CvError::from)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await.map_err(CvError::from)?;
    writer.flush().await.map_err(CvError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::config::Config;
    use cv_core::ports::AiProvider;
    use cv_graph::{GraphStore, InMemoryGraphStore};
    use cv_manifold::ContextManifold;
    use cv_sync::SyncEngine;
    use cv_traversal::TraversalEngine;
    use cv_vector::{InMemoryVectorStore, VectorStore};
    use std::sync::Arc;
    use tokio::io::BufReader;

    struct FixedAi;

    #[async_trait::async_trait]
    impl AiProvider for FixedAi {
        async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
            Ok("ok".to_string())
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2]).collect())
        }
        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    async fn build_dispatcher(dir: &std::path::Path) -> Dispatcher {
        let graph: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());
        let vector: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let ai: Arc<dyn AiProvider> = Arc::new(FixedAi);
        let cache = Arc::new(cv_vector::EmbeddingCache::new());
        let sync = Arc::new(SyncEngine::new(graph.clone(), vector.clone(), cache, ai.clone(), Config::default()));
        let source: Arc<dyn cv_traversal::SourceProvider> = Arc::new(cv_traversal::FsSourceProvider::new(dir.to_path_buf()));
        let traversal = Arc::new(TraversalEngine::new(graph.clone(), vector.clone(), source, dir.join("sessions")));
        let manifold = Arc::new(ContextManifold::new(graph.clone(), vector.clone(), ai.clone(), dir.to_path_buf()));
        let authored = Arc::new(cv_authored::AuthoredLog::load(dir.join("authored.jsonl")).await.unwrap());
        Dispatcher::new(graph, vector, ai, sync, traversal, manifold, authored, dir.to_path_buf())
    }

    #[tokio::test]
    async fn list_tools_round_trips_over_the_line_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        let input = b"{\"id\":1,\"method\":\"list_tools\",\"params\":{}}\n".to_vec();
        let mut output = Vec::new();
        serve(&dispatcher, BufReader::new(&input[..]), &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        let response: Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(response["id"], 1);
        assert!(response["result"].as_array().unwrap().iter().any(|t| t["name"] == "search"));
    }

    #[tokio::test]
    async fn malformed_line_yields_an_error_response_not_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        let input = b"not json\n".to_vec();
        let mut output = Vec::new();
        serve(&dispatcher, BufReader::new(&input[..]), &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        let response: Value = serde_json::from_str(text.trim()).unwrap();
        assert!(response["error"].is_object());
    }

    #[tokio::test]
    async fn call_tool_with_missing_argument_surfaces_as_tool_error_not_rpc_error() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        let input = b"{\"id\":2,\"method\":\"call_tool\",\"params\":{\"name\":\"search\",\"arguments\":{}}}\n".to_vec();
        let mut output = Vec::new();
        serve(&dispatcher, BufReader::new(&input[..]), &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        let response: Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(response["result"]["isError"], true);
    }
}
