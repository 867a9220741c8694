//! Boolean expression evaluation for validation checks
//!
//! Checks are built as [`Comparison`]s and handed to an
//! [`ExpressionEvaluator`]. The default backend is [`RhaiEvaluator`], which
//! evaluates the comparison as a rhai expression. Only a fixed set of
//! comparators is accepted; `=~` and `!~` are regular-expression matches.

use std::fmt;

use regex::Regex;
use rhai::{Dynamic, Engine};

use crate::error::EvaluationError;

/// Comparators accepted in validator definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Matches,
    NotMatches,
}

impl Comparator {
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessOrEqual),
            ">" => Some(Self::Greater),
            ">=" => Some(Self::GreaterOrEqual),
            "=~" => Some(Self::Matches),
            "!~" => Some(Self::NotMatches),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Matches => "=~",
            Self::NotMatches => "!~",
        }
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(i64),
    Text(String),
}

impl Operand {
    fn as_text(&self) -> String {
        match self {
            Operand::Number(n) => n.to_string(),
            Operand::Text(s) => s.clone(),
        }
    }

    fn to_rhai(&self) -> String {
        match self {
            Operand::Number(n) => n.to_string(),
            Operand::Text(s) => rhai_string_literal(s),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// `left <comparator> right`, displayed as it appears in the validation trace
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Operand,
    pub comparator: String,
    pub right: Operand,
}

impl Comparison {
    pub fn new(left: Operand, comparator: impl Into<String>, right: Operand) -> Self {
        Self {
            left,
            comparator: comparator.into(),
            right,
        }
    }

    pub fn numbers(left: i64, comparator: impl Into<String>, right: i64) -> Self {
        Self::new(Operand::Number(left), comparator, Operand::Number(right))
    }

    pub fn texts(left: impl Into<String>, comparator: impl Into<String>, right: impl Into<String>) -> Self {
        Self::new(
            Operand::Text(left.into()),
            comparator,
            Operand::Text(right.into()),
        )
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.comparator, self.right)
    }
}

/// Evaluates a comparison to a boolean
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, comparison: &Comparison) -> Result<bool, EvaluationError>;
}

/// rhai-backed evaluator
pub struct RhaiEvaluator {
    engine: Engine,
}

impl RhaiEvaluator {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_max_expr_depths(16, 16);
        engine.set_max_operations(10_000);
        Self { engine }
    }

    fn eval_script(&self, script: &str) -> Result<bool, EvaluationError> {
        let result: Dynamic = self
            .engine
            .eval_expression(script)
            .map_err(|e| EvaluationError::Evaluation(e.to_string()))?;

        result
            .as_bool()
            .map_err(|type_name| EvaluationError::NotBoolean(type_name.to_string()))
    }
}

impl Default for RhaiEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RhaiEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RhaiEvaluator").finish_non_exhaustive()
    }
}

impl ExpressionEvaluator for RhaiEvaluator {
    fn evaluate(&self, comparison: &Comparison) -> Result<bool, EvaluationError> {
        let comparator = Comparator::parse(&comparison.comparator)
            .ok_or_else(|| EvaluationError::InvalidComparator(comparison.comparator.clone()))?;

        match comparator {
            Comparator::Matches | Comparator::NotMatches => {
                let pattern = Regex::new(&comparison.right.as_text())
                    .map_err(|e| EvaluationError::Evaluation(format!("Invalid pattern: {}", e)))?;
                let matched = pattern.is_match(&comparison.left.as_text());
                Ok(matched == (comparator == Comparator::Matches))
            }
            _ => {
                let script = format!(
                    "{} {} {}",
                    comparison.left.to_rhai(),
                    comparator.symbol(),
                    comparison.right.to_rhai()
                );
                self.eval_script(&script)
            }
        }
    }
}

fn rhai_string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if c.is_control() => literal.push_str(&format!("\\u{:04X}", c as u32)),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality() {
        let evaluator = RhaiEvaluator::new();
        assert_eq!(evaluator.evaluate(&Comparison::numbers(200, "==", 200)), Ok(true));
        assert_eq!(evaluator.evaluate(&Comparison::numbers(200, "==", 404)), Ok(false));
    }

    #[test]
    fn test_text_comparators() {
        let evaluator = RhaiEvaluator::new();
        assert_eq!(evaluator.evaluate(&Comparison::texts("abc", "==", "abc")), Ok(true));
        assert_eq!(evaluator.evaluate(&Comparison::texts("abc", "!=", "abd")), Ok(true));
        assert_eq!(evaluator.evaluate(&Comparison::texts("a", "<", "b")), Ok(true));
        assert_eq!(evaluator.evaluate(&Comparison::texts("b", ">=", "c")), Ok(false));
    }

    #[test]
    fn test_quotes_and_escapes_are_literal() {
        let evaluator = RhaiEvaluator::new();
        let tricky = r#"it's "quoted" \ back"#;
        assert_eq!(evaluator.evaluate(&Comparison::texts(tricky, "==", tricky)), Ok(true));
        assert_eq!(
            evaluator.evaluate(&Comparison::texts("line\nbreak", "==", "line\nbreak")),
            Ok(true)
        );
    }

    #[test]
    fn test_regex_comparators() {
        let evaluator = RhaiEvaluator::new();
        assert_eq!(evaluator.evaluate(&Comparison::texts("order-42", "=~", r"^order-\d+$")), Ok(true));
        assert_eq!(evaluator.evaluate(&Comparison::texts("order-42", "!~", r"^user")), Ok(true));
        assert!(matches!(
            evaluator.evaluate(&Comparison::texts("x", "=~", "(")),
            Err(EvaluationError::Evaluation(_))
        ));
    }

    #[test]
    fn test_unknown_comparator_is_rejected() {
        let evaluator = RhaiEvaluator::new();
        let result = evaluator.evaluate(&Comparison::texts("a", "contains", "a"));
        assert_eq!(result, Err(EvaluationError::InvalidComparator("contains".to_string())));

        let injected = evaluator.evaluate(&Comparison::texts("a", "== \"a\" ||", "b"));
        assert!(matches!(injected, Err(EvaluationError::InvalidComparator(_))));
    }

    #[test]
    fn test_display_matches_trace_format() {
        assert_eq!(Comparison::texts("abc", "==", "xyz").to_string(), "'abc' == 'xyz'");
        assert_eq!(Comparison::numbers(200, "==", 201).to_string(), "200 == 201");
    }
}
