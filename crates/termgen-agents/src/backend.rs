//! Stage backends — the pluggable text-producing side of the workflow.
//!
//! The session treats every stage invocation as an opaque, potentially slow,
//! potentially failing call: `(transcript, session context) -> text`. The
//! production implementation posts to an OpenAI-compatible
//! `/chat/completions` endpoint; tests substitute scripted backends.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::{GenConfig, StageSampling};
use crate::errors::WorkflowError;
use crate::prompts;
use crate::session::SessionContext;
use crate::stage::{StageMessage, StageRole};

/// A stage function provider.
///
/// Implementations must be safe to call repeatedly for the same role: the
/// session re-invokes a stage after transient failures and after RETRY
/// gate decisions.
#[async_trait]
pub trait StageBackend: Send + Sync {
    /// Produce the text output of `role` given the accumulated transcript
    /// and session context.
    ///
    /// # Errors
    ///
    /// Retriable: [`WorkflowError::InferenceFailure`] (timeout, network,
    /// backend 5xx) and [`WorkflowError::RateLimit`]. Anything else aborts
    /// the session.
    async fn generate(
        &self,
        role: StageRole,
        transcript: &[StageMessage],
        ctx: &SessionContext,
    ) -> Result<String, WorkflowError>;
}

// ── OpenAI-compatible backend ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Backend posting to an OpenAI-compatible chat completions endpoint, with
/// per-role model and sampling from [`GenConfig`].
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: GenConfig,
}

impl OpenAiBackend {
    pub fn new(config: &GenConfig) -> Result<Self, WorkflowError> {
        config.validate().map_err(WorkflowError::Configuration)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| WorkflowError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn sampling_for(&self, role: StageRole) -> Result<&StageSampling, WorkflowError> {
        match role {
            StageRole::Draft => Ok(&self.config.models.writer),
            StageRole::Translate => Ok(&self.config.models.translator),
            StageRole::Evaluate => Ok(&self.config.models.evaluator),
            StageRole::Init | StageRole::Gate => Err(WorkflowError::Configuration(format!(
                "role {role} is synthesized locally, not generated"
            ))),
        }
    }
}

/// Map a transcript into chat messages. The `Init` seed is the user turn;
/// every stage output is an assistant turn, so each stage sees the full
/// conversation so far.
fn chat_messages(
    role: StageRole,
    transcript: &[StageMessage],
    ctx: &SessionContext,
) -> Vec<serde_json::Value> {
    let mut messages = vec![json!({
        "role": "system",
        "content": prompts::instruction_for(role, &ctx.terms, &ctx.reference_summary),
    })];
    for message in transcript {
        let chat_role = if message.role == StageRole::Init {
            "user"
        } else {
            "assistant"
        };
        messages.push(json!({ "role": chat_role, "content": message.content }));
    }
    messages
}

#[async_trait]
impl StageBackend for OpenAiBackend {
    async fn generate(
        &self,
        role: StageRole,
        transcript: &[StageMessage],
        ctx: &SessionContext,
    ) -> Result<String, WorkflowError> {
        let sampling = self.sampling_for(role)?;
        let body = json!({
            "model": sampling.model,
            "temperature": sampling.temperature,
            "top_p": sampling.top_p,
            "messages": chat_messages(role, transcript, ctx),
        });

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(%role, model = %sampling.model, "stage request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::InferenceFailure {
                role,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(WorkflowError::RateLimit {
                role,
                message: format!("endpoint returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(WorkflowError::InferenceFailure {
                role,
                message: format!("endpoint returned {status}"),
            });
        }

        let payload: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| WorkflowError::InferenceFailure {
                    role,
                    message: format!("response decode: {e}"),
                })?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| WorkflowError::InferenceFailure {
                role,
                message: "empty completion".into(),
            })
    }
}
