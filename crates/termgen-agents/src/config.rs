//! Runtime configuration for the generation workflow.
//!
//! All credential and model state lives in this struct and is passed
//! explicitly into backends and sessions — nothing reads the environment
//! after construction.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variable overrides (`TERMGEN_*`, read once in `from_env`)
//! 2. Values set on the struct
//! 3. Built-in defaults
//!
//! ## Model roles
//!
//! | Role       | Stage      | Default sampling          |
//! |------------|------------|---------------------------|
//! | writer     | Draft      | temperature 0.5, top_p 0.9 |
//! | translator | Translate  | temperature 0.1, top_p 0.8 |
//! | evaluator  | Evaluate   | temperature 0.1, top_p 0.8 |

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default OpenAI-compatible endpoint.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model for every role.
const DEFAULT_MODEL: &str = "gpt-4o";
/// Per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Delay before the first stage call of each session, to respect provider
/// rate limits. Pacing, not correctness.
const DEFAULT_PACING_SECS: u64 = 10;
/// Maximum stage invocations per session.
const DEFAULT_ROUND_BUDGET: u32 = 10;

const ENV_BASE_URL: &str = "TERMGEN_BASE_URL";
const ENV_API_KEY: &str = "TERMGEN_API_KEY";
const ENV_API_KEY_FALLBACK: &str = "OPENAI_API_KEY";
const ENV_WRITER_MODEL: &str = "TERMGEN_WRITER_MODEL";
const ENV_TRANSLATOR_MODEL: &str = "TERMGEN_TRANSLATOR_MODEL";
const ENV_EVALUATOR_MODEL: &str = "TERMGEN_EVALUATOR_MODEL";

/// Sampling options for one model role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSampling {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
}

/// Per-role model assignment with sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageModelConfig {
    /// Draft stage — higher temperature for sentence variety.
    pub writer: StageSampling,
    /// Translate stage — low temperature for terminology consistency.
    pub translator: StageSampling,
    /// Evaluate stage — low temperature for stable scoring.
    pub evaluator: StageSampling,
}

impl Default for StageModelConfig {
    fn default() -> Self {
        Self {
            writer: StageSampling {
                model: DEFAULT_MODEL.into(),
                temperature: 0.5,
                top_p: 0.9,
            },
            translator: StageSampling {
                model: DEFAULT_MODEL.into(),
                temperature: 0.1,
                top_p: 0.8,
            },
            evaluator: StageSampling {
                model: DEFAULT_MODEL.into(),
                temperature: 0.1,
                top_p: 0.8,
            },
        }
    }
}

/// Top-level workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenConfig {
    /// OpenAI-compatible base URL.
    pub base_url: String,
    /// API key for the endpoint.
    pub api_key: String,
    /// Per-role models and sampling.
    pub models: StageModelConfig,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Delay before the first stage call of each session, in seconds.
    pub pacing_delay_secs: u64,
    /// Maximum stage invocations per session.
    pub round_budget: u32,
    /// Score at or above which the gate accepts (see `QualityGate`).
    pub accept_threshold: u8,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: String::new(),
            models: StageModelConfig::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            pacing_delay_secs: DEFAULT_PACING_SECS,
            round_budget: DEFAULT_ROUND_BUDGET,
            accept_threshold: crate::gate::DEFAULT_ACCEPT_THRESHOLD,
        }
    }
}

impl GenConfig {
    /// Build a config from defaults plus `TERMGEN_*` environment overrides.
    ///
    /// The API key falls back to `OPENAI_API_KEY` when `TERMGEN_API_KEY` is
    /// unset. This is the only place the process environment is consulted.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var(ENV_BASE_URL) {
            config.base_url = url;
        }
        config.api_key = env::var(ENV_API_KEY)
            .or_else(|_| env::var(ENV_API_KEY_FALLBACK))
            .unwrap_or_default();
        if let Ok(model) = env::var(ENV_WRITER_MODEL) {
            config.models.writer.model = model;
        }
        if let Ok(model) = env::var(ENV_TRANSLATOR_MODEL) {
            config.models.translator.model = model;
        }
        if let Ok(model) = env::var(ENV_EVALUATOR_MODEL) {
            config.models.evaluator.model = model;
        }
        config
    }

    /// Validate structural constraints. Called before a session starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".into());
        }
        if self.round_budget == 0 {
            return Err("round_budget must be at least 1".into());
        }
        if self.accept_threshold > 10 {
            return Err(format!(
                "accept_threshold {} outside score range [0, 10]",
                self.accept_threshold
            ));
        }
        for (role, sampling) in [
            ("writer", &self.models.writer),
            ("translator", &self.models.translator),
            ("evaluator", &self.models.evaluator),
        ] {
            if sampling.model.is_empty() {
                return Err(format!("{role} model must not be empty"));
            }
            if !(0.0..=2.0).contains(&sampling.temperature) {
                return Err(format!(
                    "{role} temperature {} outside [0.0, 2.0]",
                    sampling.temperature
                ));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_secs(self.pacing_delay_secs)
    }
}
