//! Progress event type streamed to the boundary layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::status::ProgressStatus;

/// One unit of streamed pipeline output.
///
/// Serializes as a single flat JSON object: the fixed fields below plus the
/// workflow's stage-specific payload fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Coarse status.
    pub status: ProgressStatus,

    /// Percent complete, or -1 for the error stage.
    pub progress: i32,

    /// The stage label this event reports.
    pub stage: String,

    /// Human-readable description of the stage.
    pub stage_description: String,

    /// Failure message, null unless the run failed.
    #[serde(default)]
    pub error: Option<String>,

    /// Stage-specific payload fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ProgressEvent {
    /// Creates an event; the status is derived from the stage and progress.
    #[must_use]
    pub fn new(stage: impl Into<String>, progress: i32, description: impl Into<String>) -> Self {
        let stage = stage.into();
        Self {
            status: ProgressStatus::derive(&stage, progress),
            progress,
            stage,
            stage_description: description.into(),
            error: None,
            payload: Map::new(),
        }
    }

    /// Sets the failure message.
    #[must_use]
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Adds a single payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Returns a payload field, treating JSON null as absent.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key).filter(|v| !v.is_null())
    }

    /// Returns a string payload field.
    #[must_use]
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    /// Returns true if this is the last event of a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Serializes the event to a compact JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_event_status_derived() {
        let event = ProgressEvent::new("career_analyzed", 25, "Analyzing...");
        assert_eq!(event.status, ProgressStatus::InProgress);

        let event = ProgressEvent::new("roadmap_complete", 100, "Done");
        assert_eq!(event.status, ProgressStatus::Complete);
        assert!(event.is_terminal());

        let event = ProgressEvent::new("error", -1, "Oops");
        assert_eq!(event.status, ProgressStatus::Error);
    }

    #[test]
    fn test_event_serializes_flat() {
        let event = ProgressEvent::new("code_generated", 50, "Generating optimized Manim code...")
            .with_field("code", json!("print(1)"))
            .with_field("video_url", Value::Null);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "in_progress",
                "progress": 50,
                "stage": "code_generated",
                "stage_description": "Generating optimized Manim code...",
                "error": null,
                "code": "print(1)",
                "video_url": null
            })
        );
    }

    #[test]
    fn test_field_treats_null_as_absent() {
        let event = ProgressEvent::new("x", 0, "d").with_field("video_url", Value::Null);
        assert!(event.field("video_url").is_none());
        assert!(event.field_str("missing").is_none());
    }

    #[test]
    fn test_event_deserializes_payload() {
        let raw = r#"{"status":"error","progress":-1,"stage":"error","stage_description":"d","error":"boom","analysis":{"a":1}}"#;
        let event: ProgressEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.error.as_deref(), Some("boom"));
        assert_eq!(event.field("analysis"), Some(&json!({"a": 1})));
    }
}
