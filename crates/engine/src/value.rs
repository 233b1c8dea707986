//! The tagged evaluation result and the XPath coercion rules.

use crate::nodeset::LocationPathEvaluation;
use crate::tree::TreeNode;
use std::fmt;
use xforms_xpath_datetime::ZonedDateTime;

/// The observable type of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Number,
    String,
    Node,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Node => "node-set",
        })
    }
}

/// A value of exactly one XPath type.
///
/// `Date` is a string-typed value that also remembers the instant it was
/// produced from, so date arithmetic and comparisons see day numbers.
#[derive(Debug, Clone)]
pub enum Evaluation<'a, N: TreeNode<'a>> {
    Boolean(bool),
    Number(f64),
    String(String),
    Date(ZonedDateTime),
    Node(LocationPathEvaluation<'a, N>),
}

impl<'a, N: TreeNode<'a>> Evaluation<'a, N> {
    pub fn value_type(&self) -> ValueType {
        match self {
            Evaluation::Boolean(_) => ValueType::Boolean,
            Evaluation::Number(_) => ValueType::Number,
            Evaluation::String(_) | Evaluation::Date(_) => ValueType::String,
            Evaluation::Node(_) => ValueType::Node,
        }
    }

    pub fn is_node_set(&self) -> bool {
        matches!(self, Evaluation::Node(_))
    }

    pub fn as_node_set(&self) -> Option<&LocationPathEvaluation<'a, N>> {
        match self {
            Evaluation::Node(set) => Some(set),
            _ => None,
        }
    }

    pub fn into_node_set(self) -> Option<LocationPathEvaluation<'a, N>> {
        match self {
            Evaluation::Node(set) => Some(set),
            _ => None,
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Evaluation::Boolean(b) => *b,
            Evaluation::Number(n) => *n != 0.0 && !n.is_nan(),
            Evaluation::String(s) => !s.is_empty(),
            Evaluation::Date(_) => true,
            Evaluation::Node(set) => set.to_boolean(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Evaluation::Boolean(b) => boolean_to_number(*b),
            Evaluation::Number(n) => *n,
            Evaluation::String(s) => string_to_number(s),
            Evaluation::Date(date) => date.to_days(),
            Evaluation::Node(set) => set.to_number(),
        }
    }
}

impl<'a, N: TreeNode<'a>> fmt::Display for Evaluation<'a, N> {
    /// The XPath string coercion.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Boolean(b) => write!(f, "{}", b),
            Evaluation::Number(n) => f.write_str(&number_to_string(*n)),
            Evaluation::String(s) => f.write_str(s),
            Evaluation::Date(date) => write!(f, "{}", date),
            Evaluation::Node(set) => f.write_str(&set.to_xpath_string()),
        }
    }
}

pub fn boolean_to_number(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Parses the XPath `Number` production surrounded by optional whitespace:
/// an optional `-`, then digits with an optional fraction. Anything else,
/// including the empty string, is `NaN`.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_xml_space);
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let (int, frac) = match body.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (body, None),
    };
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let has_digits = !int.is_empty() || frac.is_some_and(|f| !f.is_empty());
    if !has_digits || !all_digits(int) || !frac.is_none_or(all_digits) {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// The XPath number to string conversion: no exponent notation, integers
/// without a decimal point, and both zeroes as `0`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::mock::MockNode;
    use rstest::rstest;

    type Value<'a> = Evaluation<'a, MockNode<'a>>;

    #[rstest]
    #[case("3", 3.0)]
    #[case("  -12.5\n", -12.5)]
    #[case(".5", 0.5)]
    #[case("4.", 4.0)]
    fn test_string_to_number_accepts_number_grammar(#[case] input: &str, #[case] expected: f64) {
        assert_eq!(string_to_number(input), expected);
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[case("-")]
    #[case(".")]
    #[case("+1")]
    #[case("1e3")]
    #[case("Infinity")]
    #[case("NaN")]
    #[case("0x10")]
    #[case("1 2")]
    fn test_string_to_number_rejects_everything_else(#[case] input: &str) {
        assert!(string_to_number(input).is_nan());
    }

    #[rstest]
    #[case(f64::NAN, "NaN")]
    #[case(f64::INFINITY, "Infinity")]
    #[case(f64::NEG_INFINITY, "-Infinity")]
    #[case(-0.0, "0")]
    #[case(4.0, "4")]
    #[case(-17.0, "-17")]
    #[case(1e21, "1000000000000000000000")]
    #[case(0.5, "0.5")]
    #[case(-0.000001, "-0.000001")]
    fn test_number_to_string(#[case] input: f64, #[case] expected: &str) {
        assert_eq!(number_to_string(input), expected);
    }

    #[test]
    fn test_scalar_coercions() {
        let t: Value = Evaluation::Boolean(true);
        assert_eq!(t.to_number(), 1.0);
        assert_eq!(t.to_string(), "true");

        let nan: Value = Evaluation::Number(f64::NAN);
        assert!(!nan.to_boolean());
        assert_eq!(nan.to_string(), "NaN");

        let empty: Value = Evaluation::String(String::new());
        assert!(!empty.to_boolean());
        assert!(empty.to_number().is_nan());
        assert_eq!(empty.value_type(), ValueType::String);
    }

    #[test]
    fn test_date_is_string_typed() {
        let date = ZonedDateTime::parse("1970-01-03", xforms_xpath_datetime::TimeZone::Utc).unwrap();
        let value: Value = Evaluation::Date(date);
        assert_eq!(value.value_type(), ValueType::String);
        assert_eq!(value.to_number(), 2.0);
        assert_eq!(value.to_string(), "1970-01-03");
        assert!(value.to_boolean());
    }
}
