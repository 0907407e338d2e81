//! Context Manifold (spec §4.7): nine per-query dimension scores —
//! structural, semantic, temporal, requirements, summary, navigational,
//! session, intent, impact — assembled into a byte-budgeted context.

pub mod dimension;
pub mod format;
pub mod git_signals;
pub mod manifold;
pub mod risk;
pub mod state;
pub mod weights;

pub use dimension::{Dimension, DimensionScore};
pub use format::OutputFormat;
pub use manifold::{ContextManifold, ContextResult};
pub use risk::RiskBucket;
pub use weights::Weights;
