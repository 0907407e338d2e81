//! Graph Store (spec §4.3): a labeled-property-graph client with per-repo
//! isolation, schema indexes, and typed upsert/edge primitives.

pub mod falkordb;
pub mod in_memory;
pub mod namespace;
pub mod ports;
pub mod query;

pub use falkordb::FalkorGraphStore;
pub use in_memory::InMemoryGraphStore;
pub use namespace::{collection_name, repo_namespace};
pub use ports::{EdgeRecord, EdgeType, GraphStats, GraphStore, QueryRow};
