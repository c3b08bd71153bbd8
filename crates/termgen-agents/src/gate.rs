//! Quality gate — maps an evaluation score to a routing decision.

use serde::{Deserialize, Serialize};

use crate::router::GateDecision;

/// Score at or above which a translation is accepted.
pub const DEFAULT_ACCEPT_THRESHOLD: u8 = 9;

/// Total score-to-decision rule for the evaluation stage.
///
/// The source prompts only defined `score < 8 → RETRY` and
/// `score >= 9 → ACCEPT`, leaving 8 unmapped. This gate resolves the
/// boundary conservatively: anything below the accept threshold retries,
/// so a score of 8 routes to RETRY. An absent score (the evaluator omitted
/// the field, or it was unparseable) is treated as failing and also
/// routes to RETRY — the gate never stalls the workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityGate {
    pub accept_threshold: u8,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
        }
    }
}

impl QualityGate {
    pub fn new(accept_threshold: u8) -> Self {
        Self { accept_threshold }
    }

    /// Decide routing for a parsed score.
    pub fn decide(&self, score: Option<u8>) -> GateDecision {
        match score {
            Some(s) if s >= self.accept_threshold => GateDecision::Accept,
            _ => GateDecision::Retry,
        }
    }
}
