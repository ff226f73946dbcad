//! Static checks on generated animation code before it is executed.

use regex::Regex;
use std::sync::LazyLock;

use crate::errors::StageError;
use crate::utils::patterns::compile_static;

/// Substrings that reject generated code outright.
pub const DISALLOWED_OPERATIONS: [&str; 14] = [
    "os.system",
    "subprocess",
    "eval",
    "exec",
    "shutil.rmtree",
    "sys.exit",
    "__import__",
    "open(",
    "file(",
    "input(",
    "raw_input(",
    "compile(",
    "globals(",
    "locals(",
];

const MANIM_PRELUDE: &str = "from manim import *\n\n";

static SCENE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| compile_static(r"class\s+\w+\(\s*Scene\s*\)"));

/// Validates generated code and makes sure it imports manim.
///
/// The check is a plain substring scan, so `exec` also rejects
/// identifiers such as `executor`.
pub fn sanitize_code(code: &str) -> Result<String, StageError> {
    if let Some(op) = DISALLOWED_OPERATIONS.iter().find(|op| code.contains(*op)) {
        return Err(StageError::invalid(format!(
            "Code contains disallowed operation: {op}"
        )));
    }
    if !SCENE_DEFINITION.is_match(code) {
        return Err(StageError::invalid("Code must define a Scene class"));
    }
    if code.contains("from manim import *") || code.contains("import manim") {
        Ok(code.to_string())
    } else {
        Ok(format!("{MANIM_PRELUDE}{code}"))
    }
}
