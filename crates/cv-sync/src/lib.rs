//! Delta-Sync Engine (spec §4.2): the pipeline that walks the working tree,
//! diffs it against the `FileLedger`, and routes the delta through the
//! Parser into the Graph Store and Vector Store.

pub mod commits;
pub mod engine;
pub mod ledger;
pub mod lower;
pub mod stats;
pub mod walker;

pub use commits::{ingest_commits, DEFAULT_COMMIT_DEPTH};
pub use engine::{default_parallelism, SyncEngine};
pub use ledger::FileLedger;
pub use stats::{SyncFileError, SyncMode, SyncStats};
pub use walker::{walk_tree, WalkedFile, WalkedKind};
