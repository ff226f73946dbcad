//! Error types for genflow.
//!
//! Errors never cross a running pipeline: the orchestrator folds every
//! [`StageError`] into an `error` stage on the [`PipelineState`]. The types
//! here are what construction, validation and the external collaborators
//! report before that folding happens.
//!
//! [`PipelineState`]: crate::core::PipelineState

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for genflow operations.
#[derive(Debug, Error)]
pub enum GenflowError {
    /// Configuration was missing or invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Caller input was rejected before the pipeline started.
    #[error("{0}")]
    InvalidInput(#[from] InputRejected),

    /// The LLM call failed.
    #[error("{0}")]
    Llm(#[from] LlmError),

    /// The renderer failed.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// A stage execution error.
    #[error("Stage execution error: {0}")]
    Stage(#[from] StageError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised at construction time when a required setting is unavailable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required credential was not set.
    #[error("{0} environment variable is not set")]
    MissingCredential(String),

    /// A setting had a value that could not be used.
    #[error("Invalid value for {key}: {reason}")]
    Invalid {
        /// The offending setting.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-setting error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Caller-provided input failed a precondition.
///
/// This is the "bad input" signal: it is reported to the caller directly and
/// never becomes an error-stage event.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{detail}")]
pub struct InputRejected {
    /// The field that was rejected (e.g. "prompt").
    pub field: String,
    /// Human-readable detail.
    pub detail: String,
}

impl InputRejected {
    /// Creates a rejection for the given field.
    #[must_use]
    pub fn new(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Rejection for an empty or whitespace-only field.
    #[must_use]
    pub fn empty(field: impl Into<String>) -> Self {
        let field = field.into();
        let detail = format!("{} is required and cannot be empty", humanize(&field));
        Self { field, detail }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("field".to_string(), serde_json::Value::String(self.field.clone()));
        map.insert("detail".to_string(), serde_json::Value::String(self.detail.clone()));
        map
    }
}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Failure of the external LLM capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// The request could not be sent or timed out.
    #[error("LLM request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("LLM provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
    },

    /// The provider answered but carried no text.
    #[error("LLM response contained no text")]
    EmptyResponse,

    /// A scripted or mock provider ran out of responses.
    #[error("LLM provider exhausted: {0}")]
    Exhausted(String),
}

/// Failure of the external renderer capability.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The source does not declare a renderable scene.
    #[error("Could not find Scene class in the code")]
    MissingScene,

    /// The renderer process could not be started.
    #[error("Failed to start renderer: {0}")]
    Spawn(#[source] std::io::Error),

    /// The renderer exited unsuccessfully.
    #[error("Renderer exited with {code:?}: {stderr}")]
    Failed {
        /// Exit code, if any.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The renderer exceeded its time budget.
    #[error("Renderer timed out after {0} seconds")]
    Timeout(u64),

    /// Rendering finished but no artifact could be located.
    #[error("No rendered artifact found for {0}")]
    ArtifactMissing(String),

    /// Scratch file handling failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure raised while a stage executes.
///
/// The orchestrator prefixes the message with the step's failure context,
/// so the text here is the bare cause.
#[derive(Debug, Error)]
pub enum StageError {
    /// The LLM call failed.
    #[error("{0}")]
    Llm(#[from] LlmError),

    /// The renderer failed.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// Intermediate data was unusable (e.g. rejected generated code).
    #[error("{0}")]
    InvalidData(String),

    /// A key the stage depends on was missing from the state.
    #[error("missing state key '{0}'")]
    MissingKey(String),
}

impl StageError {
    /// Creates an invalid-data error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

/// Result alias for genflow operations.
pub type Result<T> = std::result::Result<T, GenflowError>;
