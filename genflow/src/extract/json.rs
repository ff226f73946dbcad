use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::rescue::{rescue_value, RescuePass};
use super::scan::balanced_object_span;
use crate::utils::patterns::compile_static;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"```(?i:json)[ \t]*\r?\n?([\s\S]*?)```"));
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"```[\w+#.-]*[ \t]*\r?\n?([\s\S]*?)```"));

/// Recovers a JSON object from `text`, or returns a clone of `default`.
///
/// Never fails. When nothing usable is found a warning is logged and the
/// caller's default is substituted.
pub fn extract_json(text: &str, default: &Map<String, Value>) -> Map<String, Value> {
    if let Some(map) = try_extract_json(text) {
        return map;
    }
    warn!(
        response_len = text.len(),
        "Could not extract a JSON object from model output, using default"
    );
    default.clone()
}

/// Like [`extract_json`] but reports failure as `None`.
pub fn try_extract_json(text: &str) -> Option<Map<String, Value>> {
    let candidate = json_candidate(text);
    match rescue_value(candidate) {
        Some((Value::Object(map), pass)) => {
            if pass != RescuePass::Direct {
                debug!(%pass, "Repaired model JSON");
            }
            Some(map)
        }
        Some((other, _)) => {
            debug!(kind = json_kind(&other), "Model JSON is not an object");
            None
        }
        None => None,
    }
}

/// Picks the slice of `text` most likely to hold the JSON object.
pub(crate) fn json_candidate(text: &str) -> &str {
    if let Some(inner) = JSON_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        return inner.as_str();
    }
    if let Some(inner) = ANY_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        return inner.as_str();
    }
    match balanced_object_span(text) {
        Some((start, end)) => &text[start..end],
        None => text,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
