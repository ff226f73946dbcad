//! Compiled-once regular expressions.

use regex::Regex;

/// Compiles a pattern literal that is known to be valid.
///
/// Only used for `LazyLock` statics over string literals, where a bad
/// pattern is a programming error caught by the module's tests.
#[allow(clippy::expect_used)]
pub(crate) fn compile_static(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex pattern must compile")
}
