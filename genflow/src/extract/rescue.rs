//! Escalating repair passes for almost-JSON LLM output.
//!
//! Each pass is a pure `&str -> String` rewrite. [`rescue`] runs them
//! cheapest-first, feeding each pass the previous pass's output, and stops
//! at the first text that `serde_json` accepts. Input that already parses
//! is returned untouched.

use regex::{Captures, Regex};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

use super::arith;
use super::scan::{
    balanced_object_span, map_outside_strings, strip_invalid_escapes, unescape_apostrophes,
};
use crate::utils::patterns::compile_static;

/// `"key": <expr>` where the expression uses only digits, decimal points,
/// parentheses, whitespace and `+ - * /`.
static LENIENT_ARITHMETIC: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r#""([^"\\]*)"\s*:\s*([-+(\s]*\d[\d\s.()+\-*/]*)"#));

/// `"key": <int> <op> <int> ...` with integers only.
static STRICT_ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| {
    compile_static(r#""([^"\\]*)"\s*:\s*([-+]?\d+(?:\s*[-+*/]\s*[-+]?\d+)+)"#)
});

static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| compile_static(r",(\s*[}\]])"));
static ADJACENT_OBJECTS: LazyLock<Regex> = LazyLock::new(|| compile_static(r"\}\s*\{"));
static ADJACENT_ARRAYS: LazyLock<Regex> = LazyLock::new(|| compile_static(r"\]\s*\["));
static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*):"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| compile_static(r"\s+"));
static LITERAL_WORD: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"(?i)\b(true|false|null)\b"));
static QUOTED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r#""\s*(-?\d+(?:\.\d+)?)\s*"(\s*[,}\]])"#));
static BARE_WORD_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static(r":\s*([A-Za-z][A-Za-z0-9_\s]*[A-Za-z0-9])\s*([,}\]])")
});
static UNQUOTED_SCALAR: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r#":\s*([^",\[\]{}\s]+)(\s*[,}\]])"#));
static QUOTED_LITERAL_VALUE: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r#":\s*"(true|false|null)""#));
static QUOTED_NUMBER_VALUE: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r#":\s*"(-?\d+(?:\.\d+)?)"(\s*[,}\]])"#));

/// The step of the chain that produced parseable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescuePass {
    /// The input parsed as-is.
    Direct,
    /// Structural cleanup.
    Structural,
    /// Aggressive cleanup.
    Aggressive,
    /// Final rescue.
    Final,
}

impl fmt::Display for RescuePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Structural => write!(f, "structural"),
            Self::Aggressive => write!(f, "aggressive"),
            Self::Final => write!(f, "final"),
        }
    }
}

/// Output of the rescue chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Rescued {
    /// The best text the chain produced.
    pub text: String,
    /// Which pass made it parse, or `None` if nothing did.
    pub pass: Option<RescuePass>,
}

impl Rescued {
    /// Returns true if [`text`](Self::text) parses as JSON.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.pass.is_some()
    }
}

/// Runs the rescue chain over `raw`.
#[must_use]
pub fn rescue(raw: &str) -> Rescued {
    let (text, parsed) = run_chain(raw);
    Rescued {
        text,
        pass: parsed.map(|(_, pass)| pass),
    }
}

/// Runs the rescue chain and returns the parsed value with the pass that
/// produced it.
#[must_use]
pub fn rescue_value(raw: &str) -> Option<(Value, RescuePass)> {
    run_chain(raw).1
}

fn run_chain(raw: &str) -> (String, Option<(Value, RescuePass)>) {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return (raw.to_string(), Some((value, RescuePass::Direct)));
    }

    let passes: [(RescuePass, fn(&str) -> String); 3] = [
        (RescuePass::Structural, structural_pass),
        (RescuePass::Aggressive, aggressive_pass),
        (RescuePass::Final, final_pass),
    ];

    let mut text = raw.to_string();
    for (pass, apply) in passes {
        text = apply(&text);
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            return (text, Some((value, pass)));
        }
    }
    (text, None)
}

/// Pass 1: trim to the object span, reduce arithmetic, fix commas,
/// normalize `\'` and quote bare keys.
#[must_use]
pub fn structural_pass(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut text = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => trimmed[start..=end].to_string(),
        (Some(start), _) => trimmed[start..].to_string(),
        _ => trimmed.to_string(),
    };

    text = reduce_arithmetic(&LENIENT_ARITHMETIC, &text);
    text = map_outside_strings(&text, |segment| {
        let segment = TRAILING_COMMA.replace_all(segment, "$1");
        let segment = ADJACENT_OBJECTS.replace_all(&segment, "},{");
        let segment = ADJACENT_ARRAYS.replace_all(&segment, "],[");
        BARE_KEY.replace_all(&segment, "$1\"$2\"$3:").into_owned()
    });
    unescape_apostrophes(&text)
}

/// Pass 2: re-isolate the object with string-aware depth counting,
/// collapse whitespace, reduce integer arithmetic, drop invalid escapes,
/// normalize literals and quote bare words.
#[must_use]
pub fn aggressive_pass(raw: &str) -> String {
    let mut text = match balanced_object_span(raw) {
        Some((start, end)) => raw[start..end].to_string(),
        None => raw.to_string(),
    };

    text = WHITESPACE_RUN.replace_all(&text, " ").trim().to_string();
    text = reduce_arithmetic(&STRICT_ARITHMETIC, &text);
    text = unescape_apostrophes(&text);
    text = strip_invalid_escapes(&text);
    text = map_outside_strings(&text, |segment| {
        LITERAL_WORD
            .replace_all(segment, |caps: &Captures<'_>| caps[1].to_ascii_lowercase())
            .into_owned()
    });
    text = QUOTED_NUMBER.replace_all(&text, "$1$2").into_owned();
    map_outside_strings(&text, |segment| {
        let segment = TRAILING_COMMA.replace_all(segment, "$1");
        let segment = BARE_WORD_VALUE.replace_all(&segment, |caps: &Captures<'_>| {
            let word = caps[1].trim_end();
            if is_json_literal(word) {
                caps[0].to_string()
            } else {
                format!(": \"{word}\"{}", &caps[2])
            }
        });
        let segment = ADJACENT_OBJECTS.replace_all(&segment, "},{");
        ADJACENT_ARRAYS.replace_all(&segment, "],[").into_owned()
    })
}

/// Pass 3: collapse whitespace, reduce whatever arithmetic remains with
/// full evaluation, strip trailing commas and force-quote stray scalars
/// before restoring numbers and literals.
#[must_use]
pub fn final_pass(raw: &str) -> String {
    let mut text = WHITESPACE_RUN.replace_all(raw, " ").trim().to_string();
    text = reduce_arithmetic(&STRICT_ARITHMETIC, &text);
    text = reduce_arithmetic(&LENIENT_ARITHMETIC, &text);
    text = map_outside_strings(&text, |segment| {
        let segment = TRAILING_COMMA.replace_all(segment, "$1");
        UNQUOTED_SCALAR.replace_all(&segment, ": \"$1\"$2").into_owned()
    });
    text = QUOTED_LITERAL_VALUE.replace_all(&text, ": $1").into_owned();
    QUOTED_NUMBER_VALUE.replace_all(&text, ": $1$2").into_owned()
}

fn is_json_literal(word: &str) -> bool {
    matches!(word, "true" | "false" | "null")
}

/// Replaces the expression in group 2 of `pattern` with its value when it
/// evaluates and contains at least one operator. Trailing whitespace the
/// pattern swallowed is kept.
fn reduce_arithmetic(pattern: &Regex, text: &str) -> String {
    pattern
        .replace_all(text, |caps: &Captures<'_>| {
            let (Some(whole), Some(expr)) = (caps.get(0), caps.get(2)) else {
                return caps[0].to_string();
            };
            let raw_expr = expr.as_str();
            let body = raw_expr.trim_end();
            match arith::reduce(body) {
                Some(value) => {
                    let prefix = &text[whole.start()..expr.start()];
                    format!("{prefix}{value}{}", &raw_expr[body.len()..])
                }
                None => whole.as_str().to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parsed(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_valid_input_is_untouched() {
        let raw = r#"{"a": [1, 2], "b": "it's fine"}"#;
        let rescued = rescue(raw);
        assert_eq!(rescued.pass, Some(RescuePass::Direct));
        assert_eq!(rescued.text, raw);
    }

    #[test]
    fn test_arithmetic_reduced_in_structural_pass() {
        let rescued = rescue(r#"{"x": -650 + 1300, "y": 500}"#);
        assert_eq!(rescued.pass, Some(RescuePass::Structural));
        assert_eq!(parsed(&rescued.text), json!({"x": 650, "y": 500}));
    }

    #[test]
    fn test_arithmetic_inside_nested_position() {
        let (value, pass) =
            rescue_value(r#"{"position": {"x": -650 + 650, "y": 100 + 2 * 200}}"#).unwrap();
        assert_eq!(pass, RescuePass::Structural);
        assert_eq!(value, json!({"position": {"x": 0, "y": 500}}));
    }

    #[test]
    fn test_arithmetic_ignores_strings() {
        let out = structural_pass(r#"{"range": "10 - 20", "n": 3 * 4}"#);
        assert_eq!(parsed(&out), json!({"range": "10 - 20", "n": 12}));
    }

    #[test]
    fn test_trailing_commas() {
        let (value, pass) = rescue_value(r#"{"a": 1, "b": [1, 2,],}"#).unwrap();
        assert_eq!(pass, RescuePass::Structural);
        assert_eq!(value, json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn test_escaped_apostrophe() {
        let (value, _) = rescue_value(r#"{"title": "Rust\'s Book"}"#).unwrap();
        assert_eq!(value, json!({"title": "Rust's Book"}));
    }

    #[test]
    fn test_escaped_backslash_before_apostrophe_survives() {
        let (value, _) = rescue_value(r#"{"p": "a\\'b",}"#).unwrap();
        assert_eq!(value, json!({"p": "a\\'b"}));
    }

    #[test]
    fn test_bare_keys_quoted() {
        let out = structural_pass(r#"{name: "a", nested: {count: 2}}"#);
        assert_eq!(parsed(&out), json!({"name": "a", "nested": {"count": 2}}));
    }

    #[test]
    fn test_bare_keys_left_alone_inside_strings() {
        let out = structural_pass(r#"{"note": "see a, b: c", d: 1}"#);
        assert_eq!(parsed(&out), json!({"note": "see a, b: c", "d": 1}));
    }

    #[test]
    fn test_adjacent_objects_separated() {
        let out = structural_pass(r#"{"nodes": [{"id": "a"} {"id": "b"}]}"#);
        assert_eq!(parsed(&out), json!({"nodes": [{"id": "a"}, {"id": "b"}]}));
    }

    #[test]
    fn test_aggressive_pass_repairs_literals_and_words() {
        let (value, pass) = rescue_value(
            "noise {\"done\": True, \"level\": beginner friendly, \"hours\": \"20\", \"path\": \"a\\qb\"} trailing",
        )
        .unwrap();
        assert_eq!(pass, RescuePass::Aggressive);
        assert_eq!(
            value,
            json!({"done": true, "level": "beginner friendly", "hours": 20, "path": "aqb"})
        );
    }

    #[test]
    fn test_aggressive_pass_handles_raw_newlines_in_strings() {
        let (value, _) = rescue_value("{\"description\": \"line one\nline two\"}").unwrap();
        assert_eq!(value, json!({"description": "line one line two"}));
    }

    #[test]
    fn test_final_pass_force_quotes_scalars() {
        let out = final_pass(r#"{"url": https://example.com, "n": 5, "ok": true}"#);
        assert_eq!(
            parsed(&out),
            json!({"url": "https://example.com", "n": 5, "ok": true})
        );
    }

    #[test]
    fn test_final_pass_evaluates_parenthesized() {
        let out = final_pass(r#"{"x": (1 + 2) * 3.5}"#);
        assert_eq!(parsed(&out), json!({"x": 10.5}));
    }

    #[test]
    fn test_unrescuable_reports_no_pass() {
        let rescued = rescue(r#"{"a": [1, 2"#);
        assert_eq!(rescued.pass, None);
        assert!(!rescued.is_valid());
        assert!(serde_json::from_str::<Value>(&rescued.text).is_err());
    }

    #[test]
    fn test_passes_are_idempotent() {
        let samples = [
            r#"{"x": -650 + 1300, "y": 500,}"#,
            r#"{name: "a", "b": [1,2,]}"#,
            "{\"done\": TRUE, \"level\": beginner friendly, \"n\": \"7\"}",
            r#"{"url": https://example.com, "n": 5}"#,
        ];
        for sample in samples {
            let once = structural_pass(sample);
            assert_eq!(structural_pass(&once), once, "structural: {sample}");
            let once = aggressive_pass(sample);
            assert_eq!(aggressive_pass(&once), once, "aggressive: {sample}");
            let once = final_pass(sample);
            assert_eq!(final_pass(&once), once, "final: {sample}");
        }
    }
}
