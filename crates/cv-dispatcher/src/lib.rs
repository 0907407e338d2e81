//! Tool Dispatcher (spec §4.9): line-framed JSON-RPC over stdio, mapping
//! named tool calls to the core services. `dk-mcp` (the pack's other
//! MCP-shaped crate) ships only a `Cargo.toml` in this retrieval pack — no
//! source to ground the transport loop on — so the stdio framing here is
//! grounded instead on `tokio::io::AsyncBufReadExt`/`AsyncWriteExt`, the
//! same idiom `cv-infra::docker::exec_streaming` already uses for reading
//! a child process's stdout line by line. The typed per-tool results and
//! service-façade shape still follow `dk-engine::tool_ops`.

pub mod dispatcher;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod tool;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use protocol::{CallToolParams, ReadResourceParams, Request, Response, RpcError};
pub use resources::{ResourceContents, ResourceDescriptor};
pub use tool::{ContentBlock, ToolDescriptor, ToolResult};
