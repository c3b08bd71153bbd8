//! Workflow session — the bounded conversation loop.
//!
//! One session produces one gated draft→translate→evaluate cycle (looping on
//! RETRY) for one term set. The session owns the transcript, drives the
//! router, synthesizes the `Init` and `Gate` messages, and enforces the
//! round budget as a hard safety valve against unbounded retry loops.
//!
//! Sessions hold no cross-session state: each one is independent and may
//! run in parallel with others at the caller's discretion.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::StageBackend;
use crate::config::GenConfig;
use crate::errors::WorkflowError;
use crate::fields;
use crate::gate::QualityGate;
use crate::prompts;
use crate::router::{self, GateDecision, NextStage};
use crate::stage::{last_message_with_role, StageMessage, StageRole};

/// Immutable inputs shared by every stage call in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Target technical terms the sentences must embed.
    pub terms: BTreeSet<String>,
    /// Reference document summary the draft stage writes from.
    pub reference_summary: String,
}

impl SessionContext {
    pub fn new(terms: BTreeSet<String>, reference_summary: impl Into<String>) -> Self {
        Self {
            terms,
            reference_summary: reference_summary.into(),
        }
    }
}

/// Session lifecycle status.
///
/// `Exhausted` is a normal terminal status, not an error — exhausted
/// sessions still yield a best-effort record, flagged non-final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    /// The gate accepted a translation before the budget ran out.
    Accepted,
    /// Round budget reached (or the caller cancelled) before acceptance.
    Exhausted,
}

/// One bounded generation session.
pub struct WorkflowSession {
    ctx: SessionContext,
    gate: QualityGate,
    pacing: Duration,
    transcript: Vec<StageMessage>,
    round_count: u32,
    round_budget: u32,
    status: SessionStatus,
}

impl WorkflowSession {
    pub fn new(ctx: SessionContext, round_budget: u32) -> Self {
        Self {
            ctx,
            gate: QualityGate::default(),
            pacing: Duration::ZERO,
            transcript: Vec::new(),
            round_count: 0,
            round_budget,
            status: SessionStatus::Running,
        }
    }

    /// Build a session with gate threshold, budget, and pacing taken from
    /// the workflow configuration.
    pub fn from_config(config: &GenConfig, ctx: SessionContext) -> Self {
        Self {
            gate: QualityGate::new(config.accept_threshold),
            pacing: config.pacing_delay(),
            ..Self::new(ctx, config.round_budget)
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Append-only message history. Insertion order is the conversation.
    pub fn transcript(&self) -> &[StageMessage] {
        &self.transcript
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn round_budget(&self) -> u32 {
        self.round_budget
    }

    /// Seed an arbitrary transcript. Test scaffolding only.
    #[cfg(test)]
    pub(crate) fn seed_for_tests(&mut self, messages: &[(StageRole, &str)]) {
        for (role, content) in messages {
            self.append(*role, *content);
        }
    }

    fn append(&mut self, role: StageRole, content: impl Into<String>) {
        self.round_count += 1;
        self.transcript
            .push(StageMessage::new(role, content, self.round_count));
    }

    /// Drive the loop to a terminal status.
    ///
    /// Retriable stage failures are absorbed here (each failed attempt
    /// consumes a round); only router invariant violations and fatal
    /// configuration errors propagate. Cancelling `cancel` interrupts a
    /// pending stage call and marks the session `Exhausted`.
    pub async fn run(
        &mut self,
        backend: &dyn StageBackend,
        cancel: &CancellationToken,
    ) -> Result<SessionStatus, WorkflowError> {
        if self.status != SessionStatus::Running {
            return Ok(self.status);
        }

        // A zero budget leaves no room even for the seed message.
        if self.round_budget == 0 {
            self.status = SessionStatus::Exhausted;
            return Ok(self.status);
        }

        if self.transcript.is_empty() {
            self.append(StageRole::Init, prompts::INIT_MESSAGE);
        }

        // Rate-limit pacing before the first stage call.
        if !self.pacing.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.status = SessionStatus::Exhausted;
                    return Ok(self.status);
                }
                _ = tokio::time::sleep(self.pacing) => {}
            }
        }

        loop {
            // Hard safety valve: budget wins regardless of router state.
            if self.round_count >= self.round_budget {
                info!(
                    rounds = self.round_count,
                    budget = self.round_budget,
                    "round budget reached"
                );
                self.status = SessionStatus::Exhausted;
                break;
            }
            if cancel.is_cancelled() {
                info!("session cancelled");
                self.status = SessionStatus::Exhausted;
                break;
            }

            let (last_role, decision) = match self.transcript.last() {
                Some(last) => {
                    let decision = if last.role == StageRole::Gate {
                        last.content.trim().parse::<GateDecision>().ok()
                    } else {
                        None
                    };
                    (last.role, decision)
                }
                None => {
                    return Err(WorkflowError::Configuration(
                        "session loop entered with empty transcript".into(),
                    ))
                }
            };

            match router::route(last_role, decision)? {
                NextStage::Terminal => {
                    info!(rounds = self.round_count, "translation accepted");
                    self.status = SessionStatus::Accepted;
                    break;
                }
                NextStage::Stage(StageRole::Gate) => self.synthesize_gate(),
                NextStage::Stage(role) => {
                    debug!(%role, round = self.round_count + 1, "invoking stage");
                    let outcome = {
                        let call = backend.generate(role, &self.transcript, &self.ctx);
                        tokio::select! {
                            _ = cancel.cancelled() => None,
                            result = call => Some(result),
                        }
                    };
                    let Some(result) = outcome else {
                        info!(%role, "stage call interrupted by cancellation");
                        self.status = SessionStatus::Exhausted;
                        break;
                    };
                    match result {
                        Ok(text) => self.append(role, text),
                        Err(err) if err.is_retriable() => {
                            // A failed attempt is still a round; the router
                            // re-selects the same stage next iteration.
                            self.round_count += 1;
                            warn!(%role, error = %err, "stage failed, retrying within budget");
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        Ok(self.status)
    }

    /// Reduce the latest evaluation to a RETRY / ACCEPT gate message.
    ///
    /// A missing or malformed score is treated as failing the gate, so the
    /// workflow can never stall on bad evaluator output.
    fn synthesize_gate(&mut self) {
        let score = match last_message_with_role(&self.transcript, StageRole::Evaluate) {
            Some(evaluation) => match fields::extract_score(&evaluation.content) {
                Ok(score) => score,
                Err(err) => {
                    warn!(error = %err, "malformed score, gate will retry");
                    None
                }
            },
            None => None,
        };
        let decision = self.gate.decide(score);
        info!(?score, decision = %decision, "gate decision");
        self.append(StageRole::Gate, decision.token());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NeverCalledBackend;

    #[async_trait]
    impl StageBackend for NeverCalledBackend {
        async fn generate(
            &self,
            role: StageRole,
            _transcript: &[StageMessage],
            _ctx: &SessionContext,
        ) -> Result<String, WorkflowError> {
            panic!("backend should not be invoked, got role {role}");
        }
    }

    fn ctx() -> SessionContext {
        SessionContext::new(
            ["gravity".to_string()].into_iter().collect(),
            "A reference summary.",
        )
    }

    #[tokio::test]
    async fn budget_of_one_exhausts_after_init_alone() {
        let mut session = WorkflowSession::new(ctx(), 1);
        let status = session
            .run(&NeverCalledBackend, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(status, SessionStatus::Exhausted);
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].role, StageRole::Init);
    }

    #[tokio::test]
    async fn pre_cancelled_session_exhausts_without_stage_calls() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut session = WorkflowSession::new(ctx(), 10);
        let status = session.run(&NeverCalledBackend, &cancel).await.unwrap();
        assert_eq!(status, SessionStatus::Exhausted);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn terminal_session_run_is_idempotent() {
        let mut session = WorkflowSession::new(ctx(), 1);
        let cancel = CancellationToken::new();
        session.run(&NeverCalledBackend, &cancel).await.unwrap();
        let again = session.run(&NeverCalledBackend, &cancel).await.unwrap();
        assert_eq!(again, SessionStatus::Exhausted);
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn gate_synthesis_without_evaluation_retries() {
        let mut session = WorkflowSession::new(ctx(), 10);
        session.append(StageRole::Init, prompts::INIT_MESSAGE);
        session.synthesize_gate();
        let gate = session.transcript().last().unwrap();
        assert_eq!(gate.role, StageRole::Gate);
        assert_eq!(gate.content, "RETRY");
    }

    #[test]
    fn gate_synthesis_reads_latest_evaluation() {
        let mut session = WorkflowSession::new(ctx(), 10);
        session.append(StageRole::Evaluate, "score: 4/10");
        session.append(StageRole::Evaluate, "score: 10/10");
        session.synthesize_gate();
        assert_eq!(session.transcript().last().unwrap().content, "ACCEPT");
    }

    #[test]
    fn rounds_number_messages_sequentially() {
        let mut session = WorkflowSession::new(ctx(), 10);
        session.append(StageRole::Init, "a");
        session.append(StageRole::Draft, "b");
        assert_eq!(session.transcript()[0].round, 1);
        assert_eq!(session.transcript()[1].round, 2);
        assert_eq!(session.round_count(), 2);
    }
}
