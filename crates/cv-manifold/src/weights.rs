//! Default dimension weights (spec §4.7 "Default base weights").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weights {
    pub structural: f32,
    pub semantic: f32,
    pub temporal: f32,
    pub requirements: f32,
    pub summary: f32,
    pub navigational: f32,
    pub session: f32,
    pub intent: f32,
    pub impact: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            semantic: 0.25,
            structural: 0.20,
            summary: 0.15,
            session: 0.10,
            temporal: 0.10,
            navigational: 0.05,
            requirements: 0.05,
            intent: 0.05,
            impact: 0.05,
        }
    }
}

impl Weights {
    pub fn get(&self, dim: crate::dimension::Dimension) -> f32 {
        use crate::dimension::Dimension::*;
        match dim {
            Structural => self.structural,
            Semantic => self.semantic,
            Temporal => self.temporal,
            Requirements => self.requirements,
            Summary => self.summary,
            Navigational => self.navigational,
            Session => self.session,
            Intent => self.intent,
            Impact => self.impact,
        }
    }

    pub fn sum(&self) -> f32 {
        self.structural
            + self.semantic
            + self.temporal
            + self.requirements
            + self.summary
            + self.navigational
            + self.session
            + self.intent
            + self.impact
    }
}
