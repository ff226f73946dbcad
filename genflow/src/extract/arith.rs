//! Minimal arithmetic evaluator for numeric values left unevaluated by an LLM.
//!
//! Grammar (recursive descent, usual precedence):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | '(' expr ')' | number
//! number := digits ('.' digits)? | '.' digits
//! ```
//!
//! Nothing else is accepted: no identifiers, no exponents, no function
//! calls. Input length and nesting depth are bounded.

use thiserror::Error;

/// Longest expression the evaluator will look at.
pub const MAX_EXPRESSION_LEN: usize = 256;

/// Deepest nesting of parentheses and unary signs.
pub const MAX_DEPTH: usize = 32;

/// Largest magnitude rendered as an integer literal.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Reasons an expression is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithError {
    /// Nothing to evaluate.
    #[error("empty expression")]
    Empty,
    /// Longer than [`MAX_EXPRESSION_LEN`].
    #[error("expression longer than {MAX_EXPRESSION_LEN} bytes")]
    TooLong,
    /// Nested deeper than [`MAX_DEPTH`].
    #[error("expression nested deeper than {MAX_DEPTH}")]
    TooDeep,
    /// A character outside the grammar.
    #[error("unexpected '{0}' at offset {1}")]
    Unexpected(char, usize),
    /// Input ended mid-expression.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Overflowed to infinity or NaN.
    #[error("result is not finite")]
    NonFinite,
}

/// Result of a successful evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Numeric value.
    pub value: f64,
    /// Number of binary operators applied.
    pub operators: usize,
}

/// Evaluates an arithmetic expression.
pub fn evaluate(expr: &str) -> Result<Evaluation, ArithError> {
    if expr.len() > MAX_EXPRESSION_LEN {
        return Err(ArithError::TooLong);
    }
    if expr.trim().is_empty() {
        return Err(ArithError::Empty);
    }

    let mut parser = Parser {
        bytes: expr.as_bytes(),
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if let Some(&b) = parser.bytes.get(parser.pos) {
        return Err(ArithError::Unexpected(char::from(b), parser.pos));
    }
    if !value.is_finite() {
        return Err(ArithError::NonFinite);
    }

    Ok(Evaluation {
        value,
        operators: parser.operators,
    })
}

/// Evaluates `expr` and renders the result, but only if it actually
/// contained a binary operator. Plain numbers return `None` so callers
/// leave them untouched.
#[must_use]
pub fn reduce(expr: &str) -> Option<String> {
    match evaluate(expr) {
        Ok(eval) if eval.operators > 0 => Some(format_number(eval.value)),
        _ => None,
    }
}

/// Renders a number as a JSON literal; integral values drop the fraction.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.bytes.get(self.pos).copied()
    }

    fn descend(&mut self) -> Result<(), ArithError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ArithError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<f64, ArithError> {
        let mut acc = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            self.operators += 1;
            let rhs = self.term()?;
            acc = if op == b'+' { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<f64, ArithError> {
        let mut acc = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            self.operators += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                acc *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err(ArithError::DivisionByZero);
                }
                acc /= rhs;
            }
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<f64, ArithError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                self.descend()?;
                let value = self.factor()?;
                self.depth -= 1;
                Ok(-value)
            }
            Some(b'+') => {
                self.pos += 1;
                self.descend()?;
                let value = self.factor()?;
                self.depth -= 1;
                Ok(value)
            }
            Some(b'(') => {
                self.pos += 1;
                self.descend()?;
                let value = self.expr()?;
                match self.peek() {
                    Some(b')') => self.pos += 1,
                    Some(other) => return Err(ArithError::Unexpected(char::from(other), self.pos)),
                    None => return Err(ArithError::UnexpectedEnd),
                }
                self.depth -= 1;
                Ok(value)
            }
            Some(b) if b.is_ascii_digit() || b == b'.' => self.number(),
            Some(other) => Err(ArithError::Unexpected(char::from(other), self.pos)),
            None => Err(ArithError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, ArithError> {
        let start = self.pos;
        let mut seen_digit = false;
        let mut seen_dot = false;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_digit() {
                seen_digit = true;
            } else if b == b'.' && !seen_dot {
                seen_dot = true;
            } else {
                break;
            }
            self.pos += 1;
        }
        if !seen_digit {
            return Err(ArithError::Unexpected('.', start));
        }
        // The slice holds only ASCII digits and at most one dot.
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or(ArithError::Unexpected('.', start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(expr: &str) -> f64 {
        evaluate(expr).unwrap().value
    }

    #[test]
    fn test_basic_operations() {
        assert_eq!(value("-650 + 1300"), 650.0);
        assert_eq!(value("2 * 3 + 4"), 10.0);
        assert_eq!(value("2 * (3 + 4)"), 14.0);
        assert_eq!(value("10 / 4"), 2.5);
        assert_eq!(value("1 - 2 * 3"), -5.0);
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(value("-(3 + 4)"), -7.0);
        assert_eq!(value("--5"), 5.0);
        assert_eq!(value("+2 - -2"), 4.0);
    }

    #[test]
    fn test_decimals() {
        assert_eq!(value("0.5 + .25"), 0.75);
        assert!(evaluate("1.2.3").is_err());
    }

    #[test]
    fn test_operator_count() {
        assert_eq!(evaluate("42").unwrap().operators, 0);
        assert_eq!(evaluate("-42").unwrap().operators, 0);
        assert_eq!(evaluate("1 + 2 * 3").unwrap().operators, 2);
    }

    #[test]
    fn test_rejects_non_arithmetic() {
        assert!(matches!(evaluate("__import__('os')"), Err(ArithError::Unexpected('_', 0))));
        assert!(matches!(evaluate("2 ** 3"), Err(ArithError::Unexpected('*', _))));
        assert!(matches!(evaluate("1e3"), Err(ArithError::Unexpected('e', 1))));
        assert_eq!(evaluate(""), Err(ArithError::Empty));
        assert_eq!(evaluate("1 +"), Err(ArithError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(ArithError::UnexpectedEnd));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1 / 0"), Err(ArithError::DivisionByZero));
        assert_eq!(evaluate("1 / (2 - 2)"), Err(ArithError::DivisionByZero));
    }

    #[test]
    fn test_limits() {
        let long = "1+".repeat(200) + "1";
        assert_eq!(evaluate(&long), Err(ArithError::TooLong));

        let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(evaluate(&deep), Err(ArithError::TooDeep));
    }

    #[test]
    fn test_reduce_requires_operator() {
        assert_eq!(reduce("-650 + 650"), Some("0".to_string()));
        assert_eq!(reduce("300 * 0.3"), Some("90".to_string()));
        assert_eq!(reduce("10 / 4"), Some("2.5".to_string()));
        assert_eq!(reduce("500"), None);
        assert_eq!(reduce("-500"), None);
        assert_eq!(reduce("abc"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(650.0), "650");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
    }
}
