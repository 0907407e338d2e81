//! The nine Context Manifold dimensions (spec §4.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Structural,
    Semantic,
    Temporal,
    Requirements,
    Summary,
    Navigational,
    Session,
    Intent,
    Impact,
}

impl Dimension {
    pub const ALL: [Dimension; 9] = [
        Dimension::Structural,
        Dimension::Semantic,
        Dimension::Temporal,
        Dimension::Requirements,
        Dimension::Summary,
        Dimension::Navigational,
        Dimension::Session,
        Dimension::Intent,
        Dimension::Impact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Structural => "structural",
            Dimension::Semantic => "semantic",
            Dimension::Temporal => "temporal",
            Dimension::Requirements => "requirements",
            Dimension::Summary => "summary",
            Dimension::Navigational => "navigational",
            Dimension::Session => "session",
            Dimension::Intent => "intent",
            Dimension::Impact => "impact",
        }
    }
}

/// One dimension's contribution to an assembled context: its relevance
/// score, pointers into the stores it drew from, and the rendered text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub score: f32,
    pub refs: Vec<String>,
    pub fragment: String,
    pub byte_budget: usize,
}
