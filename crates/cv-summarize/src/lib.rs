//! Hierarchical Summarizer (spec §4.5): L1 symbol → L2 file → L3 directory
//! → L4 repo summaries, stored in the `summaries` vector collection.

pub mod input;
pub mod summarizer;

pub use input::{FileSummaryInput, SymbolInput};
pub use summarizer::{FileSummaryResult, Summarizer};
