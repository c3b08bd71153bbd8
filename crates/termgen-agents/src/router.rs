//! Stage router — the workflow transition table as a pure function.
//!
//! ```text
//! Init → Draft → Translate → Evaluate → Gate
//!                    ↑                    │ RETRY
//!                    └────────────────────┘
//!                                         │ ACCEPT
//!                                         ▼
//!                                      Terminal
//! ```
//!
//! The router holds no state of its own: it maps the role of the message
//! just produced (plus the gate decision, when that role is `Gate`) to the
//! next stage or to explicit termination. Any `(role, decision)` pair
//! outside the table is a programming error surfaced as
//! [`WorkflowError::RouterInvariant`], never silently absorbed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;
use crate::stage::StageRole;

/// Binary routing decision produced by the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Translation quality insufficient — loop back to the translate stage.
    Retry,
    /// Translation accepted — terminate the session.
    Accept,
}

impl GateDecision {
    /// Token written into the `Gate` message content.
    pub fn token(self) -> &'static str {
        match self {
            Self::Retry => "RETRY",
            Self::Accept => "ACCEPT",
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for GateDecision {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            t if t.eq_ignore_ascii_case("retry") => Ok(Self::Retry),
            t if t.eq_ignore_ascii_case("accept") => Ok(Self::Accept),
            _ => Err(()),
        }
    }
}

/// What the router selected: another stage, or explicit termination.
///
/// Termination is a first-class variant — the loop never ends by falling
/// through to an undefined transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStage {
    Stage(StageRole),
    Terminal,
}

/// Map `(last role, gate decision)` to the next stage.
///
/// `decision` must be `Some` exactly when `last_role` is [`StageRole::Gate`];
/// every other combination is outside the transition table.
pub fn route(
    last_role: StageRole,
    decision: Option<GateDecision>,
) -> Result<NextStage, WorkflowError> {
    use StageRole::*;

    match (last_role, decision) {
        (Init, None) => Ok(NextStage::Stage(Draft)),
        (Draft, None) => Ok(NextStage::Stage(Translate)),
        (Translate, None) => Ok(NextStage::Stage(Evaluate)),
        (Evaluate, None) => Ok(NextStage::Stage(Gate)),
        (Gate, Some(GateDecision::Retry)) => Ok(NextStage::Stage(Translate)),
        (Gate, Some(GateDecision::Accept)) => Ok(NextStage::Terminal),
        (role, decision) => Err(WorkflowError::RouterInvariant { role, decision }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabulated_transitions() {
        assert_eq!(
            route(StageRole::Init, None).unwrap(),
            NextStage::Stage(StageRole::Draft)
        );
        assert_eq!(
            route(StageRole::Draft, None).unwrap(),
            NextStage::Stage(StageRole::Translate)
        );
        assert_eq!(
            route(StageRole::Translate, None).unwrap(),
            NextStage::Stage(StageRole::Evaluate)
        );
        assert_eq!(
            route(StageRole::Evaluate, None).unwrap(),
            NextStage::Stage(StageRole::Gate)
        );
        assert_eq!(
            route(StageRole::Gate, Some(GateDecision::Retry)).unwrap(),
            NextStage::Stage(StageRole::Translate)
        );
        assert_eq!(
            route(StageRole::Gate, Some(GateDecision::Accept)).unwrap(),
            NextStage::Terminal
        );
    }

    #[test]
    fn undefined_pairs_are_invariant_errors() {
        // Gate without a decision.
        assert!(matches!(
            route(StageRole::Gate, None),
            Err(WorkflowError::RouterInvariant { .. })
        ));
        // Decisions attached to non-gate roles.
        for role in [
            StageRole::Init,
            StageRole::Draft,
            StageRole::Translate,
            StageRole::Evaluate,
        ] {
            for decision in [GateDecision::Retry, GateDecision::Accept] {
                assert!(matches!(
                    route(role, Some(decision)),
                    Err(WorkflowError::RouterInvariant { .. })
                ));
            }
        }
    }

    #[test]
    fn routing_is_stateless_and_repeatable() {
        for _ in 0..3 {
            assert_eq!(
                route(StageRole::Gate, Some(GateDecision::Retry)).unwrap(),
                NextStage::Stage(StageRole::Translate)
            );
        }
    }

    #[test]
    fn decision_token_roundtrip() {
        assert_eq!("RETRY".parse::<GateDecision>().unwrap(), GateDecision::Retry);
        assert_eq!(
            "accept".parse::<GateDecision>().unwrap(),
            GateDecision::Accept
        );
        assert_eq!(
            GateDecision::Accept.token().parse::<GateDecision>().unwrap(),
            GateDecision::Accept
        );
        assert!("final output".parse::<GateDecision>().is_err());
    }
}
