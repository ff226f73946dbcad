//! Runtime configuration read from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::pipeline::DEFAULT_MAX_TRANSITIONS;
use crate::providers::ManimRenderer;

/// Variable holding the LLM API key.
pub const API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
/// Variable overriding the model name.
pub const MODEL_ENV: &str = "GENFLOW_MODEL";
/// Variable overriding the LLM request timeout, in seconds.
pub const LLM_TIMEOUT_ENV: &str = "GENFLOW_LLM_TIMEOUT_SECS";
/// Variable overriding the media directory.
pub const MEDIA_DIR_ENV: &str = "GENFLOW_MEDIA_DIR";
/// Variable overriding the renderer executable.
pub const RENDER_COMMAND_ENV: &str = "GENFLOW_RENDER_COMMAND";
/// Variable overriding the render timeout, in seconds.
pub const RENDER_TIMEOUT_ENV: &str = "GENFLOW_RENDER_TIMEOUT_SECS";
/// Variable overriding the PlantUML server.
pub const PLANTUML_SERVER_ENV: &str = "GENFLOW_PLANTUML_SERVER";
/// Variable overriding the per-run stage cap.
pub const MAX_TRANSITIONS_ENV: &str = "GENFLOW_MAX_TRANSITIONS";

/// Settings shared by every workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenflowConfig {
    /// LLM API key.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// LLM request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,
    /// Directory rendered media is written to.
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
    /// Renderer executable.
    #[serde(default = "default_render_command")]
    pub render_command: String,
    /// Render timeout in seconds.
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,
    /// PlantUML server root.
    #[serde(default = "default_plantuml_server")]
    pub plantuml_server: String,
    /// Stage executions allowed per run.
    #[serde(default = "default_max_transitions")]
    pub max_transitions: usize,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("media")
}

fn default_render_command() -> String {
    "manim".to_string()
}

fn default_render_timeout() -> u64 {
    120
}

fn default_plantuml_server() -> String {
    crate::features::design::DEFAULT_PLANTUML_SERVER.to_string()
}

fn default_max_transitions() -> usize {
    DEFAULT_MAX_TRANSITIONS
}

impl GenflowConfig {
    /// Creates a configuration with defaults and the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            llm_timeout_secs: default_llm_timeout(),
            media_dir: default_media_dir(),
            render_command: default_render_command(),
            render_timeout_secs: default_render_timeout(),
            plantuml_server: default_plantuml_server(),
            max_transitions: default_max_transitions(),
        }
    }

    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key =
            get(API_KEY_ENV).ok_or_else(|| ConfigError::MissingCredential(API_KEY_ENV.to_string()))?;
        let mut config = Self::new(api_key);

        if let Some(model) = get(MODEL_ENV) {
            config.model = model;
        }
        if let Some(raw) = get(LLM_TIMEOUT_ENV) {
            config.llm_timeout_secs = parse_number(LLM_TIMEOUT_ENV, &raw)?;
        }
        if let Some(dir) = get(MEDIA_DIR_ENV) {
            config.media_dir = PathBuf::from(dir);
        }
        if let Some(command) = get(RENDER_COMMAND_ENV) {
            config.render_command = command;
        }
        if let Some(raw) = get(RENDER_TIMEOUT_ENV) {
            config.render_timeout_secs = parse_number(RENDER_TIMEOUT_ENV, &raw)?;
        }
        if let Some(server) = get(PLANTUML_SERVER_ENV) {
            config.plantuml_server = server.trim_end_matches('/').to_string();
        }
        if let Some(raw) = get(MAX_TRANSITIONS_ENV) {
            config.max_transitions = parse_number(MAX_TRANSITIONS_ENV, &raw)?;
        }
        Ok(config)
    }

    /// LLM request timeout.
    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Render timeout.
    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    /// A renderer for the configured media directory and command.
    #[must_use]
    pub fn renderer(&self) -> ManimRenderer {
        ManimRenderer::new(&self.media_dir)
            .with_command(&self.render_command)
            .with_timeout(self.render_timeout())
    }

    /// A Gemini client sampling at `temperature`.
    #[cfg(feature = "gemini")]
    pub fn llm(&self, temperature: f32) -> Result<crate::providers::GeminiProvider, ConfigError> {
        crate::providers::GeminiProvider::new(
            self.api_key.clone(),
            self.model.clone(),
            temperature,
            self.llm_timeout(),
        )
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::invalid(key, format!("expected a non-negative integer, got '{raw}'")))
}
