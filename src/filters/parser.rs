//! Parser for compact filter expressions.
//!
//! An expression is `<field><op><value>` where the operator is a single
//! character: `=` equals, `!` not equals, `>` / `<` strict comparisons,
//! `)` / `(` inclusive comparisons, `~` regex, `*` membership, `%` substring
//! (case-insensitive) and `@` existence.

use std::sync::LazyLock;

use regex::Regex;

static EXPRESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z._]+)([=!<>)(~*%@])(.*)$").expect("valid regex"));

/// Version-like strings (`3.14`, `2.0.1`) must stay textual even though they
/// would parse as floats.
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").expect("valid regex"));

static FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.?[0-9]*$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Regex,
    In,
    Ilike,
    Exists,
}

impl FilterOp {
    fn from_token(token: char) -> Option<Self> {
        match token {
            '=' => Some(Self::Eq),
            '!' => Some(Self::Ne),
            '>' => Some(Self::Gt),
            '<' => Some(Self::Lt),
            ')' => Some(Self::Gte),
            '(' => Some(Self::Lte),
            '~' => Some(Self::Regex),
            '*' => Some(Self::In),
            '%' => Some(Self::Ilike),
            '@' => Some(Self::Exists),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Float(f64),
    List(Vec<String>),
    Bool(bool),
}

/// A parsed filter expression. `raw_value` keeps the unquoted source text so
/// predicates that bind text (regex, substring, list members) are not affected
/// by numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
    pub raw_value: String,
}

/// Parses one expression, or `None` when it does not match the grammar.
pub fn parse(expression: &str) -> Option<FilterExpression> {
    let caps = EXPRESSION_RE.captures(expression)?;
    let field = caps.get(1)?.as_str().to_string();
    let op = FilterOp::from_token(caps.get(2)?.as_str().chars().next()?)?;
    let raw_value = strip_quotes(caps.get(3)?.as_str());

    let value = match op {
        FilterOp::Exists => FilterValue::Bool(is_truthy(&raw_value)),
        FilterOp::In => FilterValue::List(
            raw_value
                .split(';')
                .map(|item| item.to_string())
                .collect(),
        ),
        _ => coerce(&field, &raw_value),
    };

    Some(FilterExpression {
        field,
        op,
        value,
        raw_value,
    })
}

fn strip_quotes(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.chars().next().map(|c| c.to_ascii_lowercase()),
        Some('y') | Some('t') | Some('1')
    )
}

/// Guesses a type for a comparison value. Version-like strings and anything
/// on a `build_number` field stay textual; otherwise all-digit values become
/// integers and decimal values become floats.
fn coerce(field: &str, raw: &str) -> FilterValue {
    if VERSION_RE.is_match(raw) {
        return FilterValue::Str(raw.to_string());
    }
    if field.contains("build_number") {
        return FilterValue::Str(raw.to_string());
    }
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(number) = raw.parse::<i64>() {
            return FilterValue::Int(number);
        }
    }
    if FLOAT_RE.is_match(raw) {
        if let Ok(number) = raw.parse::<f64>() {
            return FilterValue::Float(number);
        }
    }
    FilterValue::Str(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_equality() {
        let parsed = parse("result=passed").unwrap();
        assert_eq!(parsed.field, "result");
        assert_eq!(parsed.op, FilterOp::Eq);
        assert_eq!(parsed.value, FilterValue::Str("passed".to_string()));
        assert_eq!(parsed.raw_value, "passed");
    }

    #[test]
    fn test_parse_all_operators() {
        let cases = [
            ("result=passed", FilterOp::Eq),
            ("result!passed", FilterOp::Ne),
            ("duration>5", FilterOp::Gt),
            ("duration<5", FilterOp::Lt),
            ("duration)5", FilterOp::Gte),
            ("duration(5", FilterOp::Lte),
            ("test_id~login", FilterOp::Regex),
            ("env*prod;stage", FilterOp::In),
            ("component%api", FilterOp::Ilike),
            ("metadata.run@y", FilterOp::Exists),
        ];
        for (expression, op) in cases {
            assert_eq!(parse(expression).unwrap().op, op, "{expression}");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_expressions() {
        assert!(parse("no_operator").is_none());
        assert!(parse("=value").is_none());
        assert!(parse("field#value").is_none());
        assert!(parse("field2=value").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(parse("count=42").unwrap().value, FilterValue::Int(42));
    }

    #[test]
    fn test_mixed_hex_like_value_stays_text() {
        let parsed = parse("metadata.run=63fe5").unwrap();
        assert_eq!(parsed.value, FilterValue::Str("63fe5".to_string()));
    }

    #[test]
    fn test_version_like_value_stays_text() {
        let parsed = parse("metadata.version=3.14").unwrap();
        assert_eq!(parsed.value, FilterValue::Str("3.14".to_string()));
        // raw_value keeps the same text for binding.
        assert_eq!(parsed.raw_value, "3.14");
    }

    #[test]
    fn test_build_number_stays_text() {
        let parsed = parse("metadata.build_number=42").unwrap();
        assert_eq!(parsed.value, FilterValue::Str("42".to_string()));
    }

    #[test]
    fn test_float_coercion_without_version_shape() {
        // A trailing dot is not version-like, so the float rule applies.
        assert_eq!(parse("duration>5.").unwrap().value, FilterValue::Float(5.0));
    }

    #[test]
    fn test_quoted_values_are_unwrapped() {
        let parsed = parse("component=\"frontend api\"").unwrap();
        assert_eq!(parsed.value, FilterValue::Str("frontend api".to_string()));
        let parsed = parse("component='42'").unwrap();
        assert_eq!(parsed.value, FilterValue::Str("42".to_string()));
    }

    #[test]
    fn test_exists_truthiness() {
        for expression in ["metadata.run@y", "metadata.run@Yes", "metadata.run@true", "metadata.run@1"] {
            assert_eq!(
                parse(expression).unwrap().value,
                FilterValue::Bool(true),
                "{expression}"
            );
        }
        for expression in ["metadata.run@n", "metadata.run@false", "metadata.run@0", "metadata.run@"] {
            assert_eq!(
                parse(expression).unwrap().value,
                FilterValue::Bool(false),
                "{expression}"
            );
        }
    }

    #[test]
    fn test_in_splits_on_semicolons() {
        let parsed = parse("env*prod;stage;dev").unwrap();
        assert_eq!(
            parsed.value,
            FilterValue::List(vec![
                "prod".to_string(),
                "stage".to_string(),
                "dev".to_string()
            ])
        );
    }

    #[test]
    fn test_value_may_contain_operator_characters() {
        let parsed = parse("test_id~^tests/api/.*$").unwrap();
        assert_eq!(parsed.op, FilterOp::Regex);
        assert_eq!(parsed.raw_value, "^tests/api/.*$");
    }
}
