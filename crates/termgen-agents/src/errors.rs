//! Workflow error taxonomy with retry classification.
//!
//! The session loop queries `is_retriable()` instead of string-matching
//! error messages. Only [`WorkflowError::RouterInvariant`] and
//! [`WorkflowError::Configuration`] escape the loop; everything retriable is
//! absorbed against the round budget. Budget exhaustion is not an error at
//! all — it is the `Exhausted` terminal status on the session.
//!
//! | Category           | Retriable | Recovery                                |
//! |--------------------|-----------|----------------------------------------|
//! | Transient          | yes       | re-invoke the same stage                |
//! | RateLimit          | yes       | re-invoke the same stage                |
//! | ParseFailure       | yes       | default the field, gate routes to RETRY |
//! | InvariantViolation | no        | abort the session                       |
//! | Configuration      | no        | abort before the loop starts            |

use std::fmt;

use thiserror::Error;

use crate::router::GateDecision;
use crate::stage::StageRole;

/// Classification used by the session loop to decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCategory {
    /// Network / inference backend failure — safe to re-invoke the stage.
    Transient,
    /// Provider rate limit — re-invoke; pacing delay already throttles calls.
    RateLimit,
    /// A recognized numeric field could not be parsed — default and continue.
    ParseFailure,
    /// The router reached an undefined `(role, decision)` pair — logic defect.
    InvariantViolation,
    /// Configuration is invalid — nothing to retry.
    Configuration,
}

impl RetryCategory {
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Transient | Self::RateLimit | Self::ParseFailure)
    }
}

impl fmt::Display for RetryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::ParseFailure => write!(f, "parse_failure"),
            Self::InvariantViolation => write!(f, "invariant_violation"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Unified error type for the generation workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Stage call failed (network error, timeout, backend 5xx).
    #[error("Stage inference failure [{role}]: {message}")]
    InferenceFailure { role: StageRole, message: String },

    /// Provider returned HTTP 429.
    #[error("Rate limited [{role}]: {message}")]
    RateLimit { role: StageRole, message: String },

    /// A recognized numeric field had a non-integer value.
    #[error("Malformed field `{field}`: {value:?}")]
    MalformedField { field: &'static str, value: String },

    /// The router was asked for a transition outside its table.
    #[error("No transition defined for ({role}, {decision:?})")]
    RouterInvariant {
        role: StageRole,
        decision: Option<GateDecision>,
    },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Anything else from the binary / adapter edges.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WorkflowError {
    pub fn retry_category(&self) -> RetryCategory {
        match self {
            Self::InferenceFailure { .. } => RetryCategory::Transient,
            Self::RateLimit { .. } => RetryCategory::RateLimit,
            Self::MalformedField { .. } => RetryCategory::ParseFailure,
            Self::RouterInvariant { .. } => RetryCategory::InvariantViolation,
            Self::Configuration(_) => RetryCategory::Configuration,
            Self::Internal(_) => RetryCategory::Transient,
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.retry_category().is_retriable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_failure_is_retriable() {
        let err = WorkflowError::InferenceFailure {
            role: StageRole::Translate,
            message: "timeout".into(),
        };
        assert!(err.is_retriable());
        assert_eq!(err.retry_category(), RetryCategory::Transient);
    }

    #[test]
    fn malformed_field_is_retriable() {
        let err = WorkflowError::MalformedField {
            field: "score",
            value: "high".into(),
        };
        assert!(err.is_retriable());
        assert_eq!(err.retry_category(), RetryCategory::ParseFailure);
    }

    #[test]
    fn router_invariant_is_fatal() {
        let err = WorkflowError::RouterInvariant {
            role: StageRole::Init,
            decision: Some(GateDecision::Accept),
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn configuration_is_fatal() {
        let err = WorkflowError::Configuration("empty base_url".into());
        assert!(!err.is_retriable());
    }
}
