//! The accumulating record threaded through a pipeline run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::StageError;

/// Label of a freshly created state.
pub const STARTING_STAGE: &str = "starting";

/// Label of a state whose pipeline failed.
pub const ERROR_STAGE: &str = "error";

const RESERVED_KEYS: [&str; 3] = ["input", "stage", "error"];

/// State handed from stage to stage.
///
/// Stages never mutate a shared record: each one receives the previous
/// state by reference and returns a new value built with [`with`]. Output
/// keys are append-only; the orchestrator rejects a stage result that
/// dropped a key it was given. The `stage` label is stamped by the
/// orchestrator alone.
///
/// [`with`]: PipelineState::with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    input: String,
    stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(flatten)]
    values: Map<String, Value>,
}

impl PipelineState {
    /// Creates the initial state for a run.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self::at_stage(input, STARTING_STAGE)
    }

    /// Creates a state positioned at an arbitrary stage label.
    ///
    /// Labels unknown to a workflow are accepted here; the orchestrator
    /// treats them as terminal.
    #[must_use]
    pub fn at_stage(input: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            stage: stage.into(),
            error: None,
            values: Map::new(),
        }
    }

    /// The user text the run started from.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The current stage label.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// The failure message, present only in the error stage.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns true once the run has failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.stage == ERROR_STAGE
    }

    /// Returns a stage output by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns a string stage output by key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Returns a stage output, or a [`StageError::MissingKey`].
    pub fn require(&self, key: &str) -> Result<&Value, StageError> {
        self.values
            .get(key)
            .ok_or_else(|| StageError::MissingKey(key.to_string()))
    }

    /// Returns a string stage output, or a [`StageError::MissingKey`].
    pub fn require_str(&self, key: &str) -> Result<&str, StageError> {
        self.get_str(key)
            .ok_or_else(|| StageError::MissingKey(key.to_string()))
    }

    /// All stage outputs.
    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Returns a copy with one more output.
    ///
    /// The reserved keys `input`, `stage` and `error` cannot be written
    /// through this method.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            warn!(key = %key, "Ignoring write to reserved state key");
            return self;
        }
        self.values.insert(key, value.into());
        self
    }

    /// Returns true if `self` keeps the input and every output of `prior`.
    #[must_use]
    pub fn extends(&self, prior: &Self) -> bool {
        self.input == prior.input && prior.values.keys().all(|k| self.values.contains_key(k))
    }

    pub(crate) fn advance(mut self, stage: &str) -> Self {
        self.stage = stage.to_string();
        self
    }

    pub(crate) fn fail(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self.stage = ERROR_STAGE.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_state_starts() {
        let state = PipelineState::new("teach me rust");
        assert_eq!(state.input(), "teach me rust");
        assert_eq!(state.stage(), STARTING_STAGE);
        assert!(state.error().is_none());
        assert!(state.values().is_empty());
    }

    #[test]
    fn test_with_is_clone_with_update() {
        let first = PipelineState::new("x");
        let second = first.clone().with("analysis", json!({"a": 1}));

        assert!(first.get("analysis").is_none());
        assert_eq!(second.get("analysis"), Some(&json!({"a": 1})));
        assert!(second.extends(&first));
    }

    #[test]
    fn test_with_ignores_reserved_keys() {
        let state = PipelineState::new("x").with("stage", "hijacked");
        assert_eq!(state.stage(), STARTING_STAGE);
        assert!(state.get("stage").is_none());
    }

    #[test]
    fn test_extends_detects_dropped_keys() {
        let prior = PipelineState::new("x").with("analysis", "a").with("code", "c");
        let shrunk = PipelineState::new("x").with("analysis", "a");
        assert!(!shrunk.extends(&prior));
        assert!(prior.extends(&shrunk));
    }

    #[test]
    fn test_fail_sets_error_stage() {
        let state = PipelineState::new("x").with("analysis", "a").fail("boom");
        assert!(state.is_error());
        assert_eq!(state.error(), Some("boom"));
        assert_eq!(state.get_str("analysis"), Some("a"));
    }

    #[test]
    fn test_require_reports_missing_key() {
        let state = PipelineState::new("x");
        let err = state.require("analysis").unwrap_err();
        assert_eq!(err.to_string(), "missing state key 'analysis'");
    }

    #[test]
    fn test_state_serializes_flat() {
        let state = PipelineState::new("x").with("analysis", json!({"k": "v"}));
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({"input": "x", "stage": "starting", "analysis": {"k": "v"}})
        );
    }
}
