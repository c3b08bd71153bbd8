//! Stage roles and transcript messages for the generation workflow.
//!
//! Every message in a session transcript carries an explicit [`StageRole`]
//! tag. Routing decisions are made on the tag alone — never on the identity
//! of whatever produced the message — so a transcript can be serialized,
//! replayed, and inspected offline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed, ordered set of stage identities in the workflow.
///
/// `Init` seeds the conversation; `Draft`, `Translate`, and `Evaluate` are
/// model-backed generation stages; `Gate` reduces the latest evaluation to a
/// binary routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Synthetic conversation opener appended by the session itself.
    Init,
    /// Produces English source sentences from the reference summary.
    Draft,
    /// Produces the Korean translation with parenthetical term formatting.
    Translate,
    /// Scores the translation and reports field-structured findings.
    Evaluate,
    /// Carries the RETRY / ACCEPT decision derived from the evaluation.
    Gate,
}

impl StageRole {
    /// Whether this role is produced by a model call rather than synthesized
    /// locally by the session.
    pub fn is_generative(self) -> bool {
        matches!(self, Self::Draft | Self::Translate | Self::Evaluate)
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "Init"),
            Self::Draft => write!(f, "Draft"),
            Self::Translate => write!(f, "Translate"),
            Self::Evaluate => write!(f, "Evaluate"),
            Self::Gate => write!(f, "Gate"),
        }
    }
}

/// One entry in a session transcript. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMessage {
    /// Which stage produced this message.
    pub role: StageRole,
    /// Free-text stage output. Treated as an untrusted semi-structured
    /// document by downstream parsing.
    pub content: String,
    /// 1-based round number at which this message was appended.
    pub round: u32,
}

impl StageMessage {
    pub fn new(role: StageRole, content: impl Into<String>, round: u32) -> Self {
        Self {
            role,
            content: content.into(),
            round,
        }
    }
}

/// Find the most recent message with the given role, searching backwards.
pub fn last_message_with_role(transcript: &[StageMessage], role: StageRole) -> Option<&StageMessage> {
    transcript.iter().rev().find(|m| m.role == role)
}
