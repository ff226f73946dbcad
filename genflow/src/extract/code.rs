use regex::Regex;
use std::sync::LazyLock;

use crate::utils::patterns::compile_static;

/// Returned by [`extract_explanation`] when the model wrote no trailing prose.
pub const NO_EXPLANATION: &str = "No explanation provided.";

const FENCE: &str = "```";

static UNTAGGED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"```(?:[\w+#.-]+)?\s*([\s\S]*?)```"));

/// Returns the trimmed interior of the first fenced block, or `""`.
///
/// With a `language_hint` the opening fence may carry that tag
/// (case-insensitive); any other tag is treated as part of the block body.
pub fn extract_code_block(text: &str, language_hint: Option<&str>) -> String {
    let first = match language_hint.filter(|hint| !hint.is_empty()) {
        Some(hint) => {
            let pattern = format!(r"```(?i:{})?\s*([\s\S]*?)```", regex::escape(hint));
            match Regex::new(&pattern) {
                Ok(re) => capture_first(&re, text),
                Err(_) => capture_first(&UNTAGGED_BLOCK, text),
            }
        }
        None => capture_first(&UNTAGGED_BLOCK, text),
    };
    first.map(|code| code.trim().to_string()).unwrap_or_default()
}

fn capture_first<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Returns the prose after the last fence, or [`NO_EXPLANATION`].
pub fn extract_explanation(text: &str) -> String {
    let parts: Vec<&str> = text.split(FENCE).collect();
    if parts.len() < 3 {
        return NO_EXPLANATION.to_string();
    }
    match parts.last().map(|tail| tail.trim()) {
        Some(tail) if !tail.is_empty() => tail.to_string(),
        _ => NO_EXPLANATION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "Here is the scene:\n\n```python\nfrom manim import *\n\nclass Demo(Scene):\n    pass\n```\n\nThe circle grows, then fades.\n";

    #[test]
    fn test_code_block_with_hint() {
        let code = extract_code_block(RESPONSE, Some("python"));
        assert!(code.starts_with("from manim import *"));
        assert!(code.ends_with("pass"));
    }

    #[test]
    fn test_code_block_hint_case_insensitive() {
        let text = "```Python\nx = 1\n```";
        assert_eq!(extract_code_block(text, Some("python")), "x = 1");
    }

    #[test]
    fn test_code_block_without_hint_strips_tag() {
        let text = "```plantuml\n@startuml\n@enduml\n```";
        assert_eq!(extract_code_block(text, None), "@startuml\n@enduml");
    }

    #[test]
    fn test_code_block_first_wins() {
        let text = "```\nfirst\n```\n```\nsecond\n```";
        assert_eq!(extract_code_block(text, None), "first");
    }

    #[test]
    fn test_code_block_missing() {
        assert_eq!(extract_code_block("just prose, no code", Some("python")), "");
        assert_eq!(extract_code_block("```\nnever closed", None), "");
    }

    #[test]
    fn test_explanation_after_last_fence() {
        assert_eq!(extract_explanation(RESPONSE), "The circle grows, then fades.");
    }

    #[test]
    fn test_explanation_sentinel() {
        assert_eq!(extract_explanation("no fences at all"), NO_EXPLANATION);
        assert_eq!(extract_explanation("```\ncode\n```\n   \n"), NO_EXPLANATION);
    }
}
