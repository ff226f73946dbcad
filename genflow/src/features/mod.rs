//! The three generation workflows.
//!
//! Each feature is a [`Workflow`](crate::pipeline::Workflow) of four
//! LLM-backed steps plus the result type its synchronous endpoint returns.

pub mod animation;
pub mod design;
pub mod roadmap;

pub use animation::{AnimationResult, AnimationWorkflow};
pub use design::{DesignResult, DesignWorkflow};
pub use roadmap::{RoadmapResult, RoadmapWorkflow};

use serde_json::{Map, Value};

use crate::core::{PipelineState, ProgressEvent};

/// Pretty JSON for embedding in a prompt.
pub(crate) fn prompt_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Joins the string items of a JSON array.
pub(crate) fn join_strings(value: Option<&Value>, separator: &str) -> String {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(separator)
        })
        .unwrap_or_default()
}

/// A string field of a JSON object, or `fallback`.
pub(crate) fn str_or<'a>(value: &'a Value, key: &str, fallback: &'a str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

/// Copies state outputs into an event payload; absent keys become null.
pub(crate) fn copy_fields(state: &PipelineState, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .map(|key| {
            (
                (*key).to_string(),
                state.get(key).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

/// `"Error: <message>"` for a failed run.
pub(crate) fn error_explanation(event: &ProgressEvent) -> String {
    format!("Error: {}", event.error.as_deref().unwrap_or("Unknown error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_strings_skips_non_strings() {
        let list = json!(["Circle", 3, "Text"]);
        assert_eq!(join_strings(Some(&list), ", "), "Circle, Text");
        assert_eq!(join_strings(None, ", "), "");
        assert_eq!(join_strings(Some(&json!("scalar")), ", "), "");
    }

    #[test]
    fn test_copy_fields_nulls_absent_keys() {
        let state = PipelineState::new("x").with("analysis", json!({"a": 1}));
        let payload = copy_fields(&state, &["analysis", "video_url"]);
        assert_eq!(payload["analysis"], json!({"a": 1}));
        assert_eq!(payload["video_url"], Value::Null);
    }

    #[test]
    fn test_error_explanation_defaults() {
        let event = ProgressEvent::new("error", -1, "d");
        assert_eq!(error_explanation(&event), "Error: Unknown error");
        let event = event.with_error(Some("Failed to render animation: boom".into()));
        assert_eq!(error_explanation(&event), "Error: Failed to render animation: boom");
    }
}
