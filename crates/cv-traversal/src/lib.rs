//! Traversal Engine (spec §4.6): session-based navigation over the code
//! graph — `in`/`out`/`lateral`/`jump`/`stay` moves between repo, module,
//! file, and symbol depths, each assembling a bounded context packet.

pub mod domain;
pub mod engine;
pub mod source;
pub mod store;

pub use domain::{Direction, Position, Session, Target, TraversalContextResult};
pub use engine::TraversalEngine;
pub use source::{FsSourceProvider, SourceProvider};
pub use store::{default_sessions_dir, SessionStore};
