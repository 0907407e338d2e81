//! Multi-move traversal-session scenario (spec §4.6, §8): jump into a
//! symbol, step into its callee, then step back out, and check the session
//! history and bounded context packet at each hop.

use chrono::Utc;
use cv_core::model::{FileNode, SymbolKind, SymbolNode, Visibility};
use cv_core::Result;
use cv_graph::{EdgeType, GraphStore, InMemoryGraphStore};
use cv_traversal::{Direction, SourceProvider, Target, TraversalEngine};
use cv_vector::InMemoryVectorStore;
use std::sync::Arc;

struct StaticSource;

#[async_trait::async_trait]
impl SourceProvider for StaticSource {
    async fn read_file(&self, path: &str) -> Result<Option<String>> {
        if path == "src/a.ts" {
            Ok(Some("line1\nfunction f() {\n  g();\n}\nline5\n".to_string()))
        } else {
            Ok(None)
        }
    }
}

async fn seeded_graph() -> Arc<InMemoryGraphStore> {
    let graph = Arc::new(InMemoryGraphStore::new());
    graph
        .upsert_file(&FileNode {
            path: "src/a.ts".into(),
            language: "typescript".into(),
            git_hash: "abc".into(),
            size: 40,
            lines_of_code: 5,
            complexity: 1,
            last_modified: Utc::now(),
        })
        .await
        .unwrap();
    graph
        .upsert_symbol(&SymbolNode {
            qualified_name: "src/a.ts:f".into(),
            name: "f".into(),
            kind: SymbolKind::Function,
            file: "src/a.ts".into(),
            start_line: 2,
            end_line: 4,
            signature: "function f()".into(),
            docstring: None,
            visibility: Visibility::Public,
            is_async: false,
            is_static: false,
            complexity: 1,
            vector_ids: vec![],
        })
        .await
        .unwrap();
    graph.create_edge(EdgeType::Calls, "src/a.ts:f", "src/a.ts:g", serde_json::json!({})).await.unwrap();
    graph
}

fn engine(graph: Arc<InMemoryGraphStore>, dir: &std::path::Path) -> TraversalEngine {
    TraversalEngine::new(graph, Arc::new(InMemoryVectorStore::new()), Arc::new(StaticSource), dir.join("sessions"))
}

#[tokio::test]
async fn jump_then_in_then_out_matches_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let graph = seeded_graph().await;
    let engine = engine(graph, dir.path());

    let (session, ctx) = engine
        .start(Target {
            file: Some("src/a.ts".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ctx.position.depth, 2);
    assert_eq!(ctx.symbols, vec!["src/a.ts:f".to_string()]);

    let (session, ctx) = engine
        .navigate(
            &session.id,
            Direction::In,
            Some(Target {
                symbol: Some("src/a.ts:f".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(ctx.position.depth, 3);
    assert_eq!(ctx.callees, vec!["src/a.ts:g".to_string()]);
    assert!(ctx.code.unwrap().contains("function f()"));

    let (session, ctx) = engine.navigate(&session.id, Direction::Out, None).await.unwrap();
    assert_eq!(ctx.position.depth, 2);
    assert_eq!(session.history.len(), 3);
}
