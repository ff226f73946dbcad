//! String-literal-aware scanning over almost-JSON text.
//!
//! "String-aware" here means double-quoted spans with backslash escapes are
//! recognised and left alone. An unterminated string runs to the end of the
//! input.

/// Applies `f` to every stretch of text that lies outside string literals.
///
/// String literals (quotes included) are copied through unchanged.
pub(crate) fn map_outside_strings(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                out.push_str(&text[segment_start..=i]);
                segment_start = i + 1;
            }
        } else if c == '"' {
            out.push_str(&f(&text[segment_start..i]));
            segment_start = i;
            in_string = true;
        }
    }

    let tail = &text[segment_start..];
    if in_string {
        out.push_str(tail);
    } else {
        out.push_str(&f(tail));
    }
    out
}

/// Finds the first `{` and its matching `}` by depth counting, ignoring
/// braces inside string literals.
///
/// Returns a byte range. When the braces never balance, the range runs to
/// the end of the text.
pub(crate) fn balanced_object_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some((start, end));
                }
            }
            _ => {}
        }
    }

    Some((start, text.len()))
}

/// Turns `\'` into `'`, walking escapes in pairs so the second
/// backslash of an escaped `\\` is never consumed.
pub(crate) fn unescape_apostrophes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => out.push('\''),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Drops backslashes that do not start a valid JSON escape.
///
/// Valid escapes (`\"`, `\\`, `\/`, `\b`, `\f`, `\n`, `\r`, `\t`, `\u`) are
/// copied as pairs so an escaped backslash is never split.
pub(crate) fn strip_invalid_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&next @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')) => {
                out.push('\\');
                out.push(next);
                chars.next();
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_outside_strings_skips_literals() {
        let out = map_outside_strings(r#"{a: "b, c: d", e: 1}"#, str::to_uppercase);
        assert_eq!(out, r#"{A: "b, c: d", E: 1}"#);
    }

    #[test]
    fn test_map_outside_strings_handles_escapes() {
        let out = map_outside_strings(r#"x "a \" y" z"#, str::to_uppercase);
        assert_eq!(out, r#"X "a \" y" Z"#);
    }

    #[test]
    fn test_unescape_apostrophes_respects_escaped_backslash() {
        assert_eq!(unescape_apostrophes(r"it\'s"), "it's");
        assert_eq!(unescape_apostrophes(r"a\\'b"), r"a\\'b");
        assert_eq!(unescape_apostrophes(r"a\\\'b"), r"a\\'b");
        assert_eq!(unescape_apostrophes(r"tail\"), r"tail\");
    }

    #[test]
    fn test_map_outside_strings_unterminated() {
        let out = map_outside_strings(r#"a "open"#, str::to_uppercase);
        assert_eq!(out, r#"A "open"#);
    }

    #[test]
    fn test_balanced_span_ignores_string_braces() {
        let text = r#"noise {"a": "}", "b": {"c": 1}} tail"#;
        let (start, end) = balanced_object_span(text).unwrap();
        assert_eq!(&text[start..end], r#"{"a": "}", "b": {"c": 1}}"#);
    }

    #[test]
    fn test_balanced_span_unbalanced_runs_to_end() {
        let text = r#"x {"a": [1, 2"#;
        let (start, end) = balanced_object_span(text).unwrap();
        assert_eq!(&text[start..end], r#"{"a": [1, 2"#);
        assert!(balanced_object_span("no braces").is_none());
    }

    #[test]
    fn test_strip_invalid_escapes() {
        assert_eq!(strip_invalid_escapes(r#""a\qb""#), r#""aqb""#);
        assert_eq!(strip_invalid_escapes(r#""line\nnext""#), r#""line\nnext""#);
        assert_eq!(strip_invalid_escapes(r#""c:\\dir""#), r#""c:\\dir""#);
    }
}
