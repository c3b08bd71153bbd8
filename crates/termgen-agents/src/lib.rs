//! Quality-gated generation workflow for bilingual technical-term
//! training sentences.
//!
//! A [`session::WorkflowSession`] drives a fixed stage sequence —
//! draft, translate, evaluate, gate — against a pluggable
//! [`backend::StageBackend`], looping back to the translate stage while the
//! [`gate::QualityGate`] scores low, bounded by a hard round budget.
//! Completed sessions are reduced to [`record::SentenceRecord`]s combining
//! the accepted translation, its evaluation fields, and reference paper
//! metadata from a [`arxiv::PaperSource`].

pub mod arxiv;
pub mod backend;
pub mod config;
pub mod errors;
pub mod fields;
pub mod gate;
pub mod prompts;
pub mod record;
pub mod router;
pub mod session;
pub mod stage;
pub mod terms;

pub use backend::{OpenAiBackend, StageBackend};
pub use config::GenConfig;
pub use errors::{RetryCategory, WorkflowError};
pub use fields::ParsedFields;
pub use gate::QualityGate;
pub use record::{PaperGroup, PaperMetadata, RecordBuilder, SentenceRecord};
pub use router::{GateDecision, NextStage};
pub use session::{SessionContext, SessionStatus, WorkflowSession};
pub use stage::{StageMessage, StageRole};
