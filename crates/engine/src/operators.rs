//! Binary operators: logic, comparison, arithmetic and union.

use crate::ast::{BinaryOperator, Expression};
use crate::context::EvaluationContext;
use crate::engine::{evaluate, expect_node_set};
use crate::error::XPathError;
use crate::nodeset::LocationPathEvaluation;
use crate::tree::{TreeNode, sort_document_order};
use crate::value::{Evaluation, string_to_number};
use std::rc::Rc;
use xforms_xpath_datetime::ZonedDateTime;
use xforms_xpath_iter::IteratorExt;

pub fn evaluate_binary<'a, N: TreeNode<'a>>(
    op: BinaryOperator,
    left: &Expression,
    right: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
    scope: &Rc<LocationPathEvaluation<'a, N>>,
) -> Result<Evaluation<'a, N>, XPathError> {
    match op {
        BinaryOperator::Or => {
            let lhs = evaluate(left, e_ctx, scope)?;
            if lhs.to_boolean() {
                return Ok(Evaluation::Boolean(true));
            }
            as_boolean(evaluate(right, e_ctx, scope)?)
        }
        BinaryOperator::And => {
            let lhs = evaluate(left, e_ctx, scope)?;
            if !lhs.to_boolean() {
                return Ok(Evaluation::Boolean(false));
            }
            as_boolean(evaluate(right, e_ctx, scope)?)
        }
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let lhs = evaluate(left, e_ctx, scope)?;
            let rhs = evaluate(right, e_ctx, scope)?;
            let equal = equals(&lhs, &rhs, op == BinaryOperator::NotEquals);
            Ok(Evaluation::Boolean(equal))
        }
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            let lhs = evaluate(left, e_ctx, scope)?;
            let rhs = evaluate(right, e_ctx, scope)?;
            Ok(Evaluation::Boolean(relational(op, &lhs, &rhs, e_ctx)))
        }
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => {
            let lhs = evaluate(left, e_ctx, scope)?.to_number();
            if lhs.is_nan() {
                return Ok(Evaluation::Number(f64::NAN));
            }
            let rhs = evaluate(right, e_ctx, scope)?.to_number();
            Ok(Evaluation::Number(arithmetic(op, lhs, rhs)))
        }
        BinaryOperator::Union => {
            let lhs = expect_node_set(evaluate(left, e_ctx, scope)?)?;
            let rhs = expect_node_set(evaluate(right, e_ctx, scope)?)?;
            let mut nodes: Vec<N> = lhs
                .context_nodes()
                .chain(rhs.context_nodes())
                .distinct()
                .collect();
            sort_document_order(&mut nodes);
            Ok(Evaluation::Node(LocationPathEvaluation::from_nodes(
                nodes,
                Some(Rc::clone(scope)),
            )))
        }
    }
}

fn as_boolean<'a, N: TreeNode<'a>>(value: Evaluation<'a, N>) -> Result<Evaluation<'a, N>, XPathError> {
    Ok(match value {
        Evaluation::Boolean(_) => value,
        other => Evaluation::Boolean(other.to_boolean()),
    })
}

pub fn arithmetic(op: BinaryOperator, lhs: f64, rhs: f64) -> f64 {
    match op {
        BinaryOperator::Plus => lhs + rhs,
        BinaryOperator::Minus => lhs - rhs,
        BinaryOperator::Multiply => lhs * rhs,
        BinaryOperator::Divide => lhs / rhs,
        // Truncating remainder, sign follows the dividend.
        BinaryOperator::Modulo => lhs % rhs,
        _ => f64::NAN,
    }
}

/// `=` and `!=` with the XPath 1.0 conversion ladder: a boolean operand
/// converts the other side to boolean, node-sets compare existentially,
/// then numbers, then strings.
fn equals<'a, N: TreeNode<'a>>(lhs: &Evaluation<'a, N>, rhs: &Evaluation<'a, N>, negate: bool) -> bool {
    let scalar = |a: &Evaluation<'a, N>, b: &Evaluation<'a, N>| -> bool {
        let equal = match (a, b) {
            (Evaluation::Boolean(_), _) | (_, Evaluation::Boolean(_)) => a.to_boolean() == b.to_boolean(),
            (Evaluation::Number(_), _) | (_, Evaluation::Number(_)) => a.to_number() == b.to_number(),
            (Evaluation::Date(_), Evaluation::Date(_)) => a.to_number() == b.to_number(),
            _ => a.to_string() == b.to_string(),
        };
        equal != negate
    };

    match (lhs, rhs) {
        (Evaluation::Boolean(_), _) | (_, Evaluation::Boolean(_)) => scalar(lhs, rhs),
        (Evaluation::Node(a), Evaluation::Node(b)) => {
            let right: Vec<String> = b.context_nodes().map(|n| n.string_value()).collect();
            a.context_nodes().any(|n| {
                let value = n.string_value();
                right.iter().any(|other| (value == *other) != negate)
            })
        }
        (Evaluation::Node(set), other) => set
            .context_nodes()
            .any(|n| node_scalar_equals(&n.string_value(), other, negate)),
        (other, Evaluation::Node(set)) => set
            .context_nodes()
            .any(|n| node_scalar_equals(&n.string_value(), other, negate)),
        _ => scalar(lhs, rhs),
    }
}

fn node_scalar_equals<'a, N: TreeNode<'a>>(value: &str, other: &Evaluation<'a, N>, negate: bool) -> bool {
    let equal = match other {
        Evaluation::Number(n) => string_to_number(value) == *n,
        _ => value == other.to_string(),
    };
    equal != negate
}

/// `<`, `<=`, `>`, `>=`. Both sides compare as numbers; a node-set side is
/// satisfied by any of its nodes. When one side is a date, the other side's
/// string is read as a date in the evaluation's time zone.
fn relational<'a, N: TreeNode<'a>>(
    op: BinaryOperator,
    lhs: &Evaluation<'a, N>,
    rhs: &Evaluation<'a, N>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> bool {
    let dates = matches!(lhs, Evaluation::Date(_)) || matches!(rhs, Evaluation::Date(_));
    let numbers = |value: &Evaluation<'a, N>| -> Vec<f64> {
        let convert = |text: String| {
            if dates {
                date_number(&text, e_ctx)
            } else {
                string_to_number(&text)
            }
        };
        match value {
            Evaluation::Node(set) => set.context_nodes().map(|n| convert(n.string_value())).collect(),
            Evaluation::String(s) => vec![convert(s.clone())],
            other => vec![other.to_number()],
        }
    };
    let left = numbers(lhs);
    let right = numbers(rhs);
    left.iter().any(|&a| right.iter().any(|&b| compare(op, a, b)))
}

fn date_number<'a, N: TreeNode<'a>>(text: &str, e_ctx: &EvaluationContext<'a, '_, N>) -> f64 {
    ZonedDateTime::parse(text, e_ctx.time_zone)
        .map(|date| date.to_days())
        .unwrap_or_else(|_| string_to_number(text))
}

fn compare(op: BinaryOperator, a: f64, b: f64) -> bool {
    match op {
        BinaryOperator::LessThan => a < b,
        BinaryOperator::LessThanOrEqual => a <= b,
        BinaryOperator::GreaterThan => a > b,
        BinaryOperator::GreaterThanOrEqual => a >= b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionLibraryCollection;
    use crate::parser::parse_expression;
    use crate::tree::mock::{MockNode, MockTree};
    use rstest::rstest;
    use std::collections::HashMap;
    use xforms_xpath_datetime::TimeZone;

    /// <root><a>3</a><b/><c>x</c><d>3</d><d>7</d></root>
    fn tree() -> MockTree {
        let mut b = MockTree::builder();
        b.start_element("root");
        b.leaf("a", "3");
        b.leaf("b", "");
        b.leaf("c", "x");
        b.leaf("d", "3");
        b.leaf("d", "7");
        b.end_element();
        b.finish()
    }

    fn eval<'a>(context: MockNode<'a>, text: &str) -> Evaluation<'a, MockNode<'a>> {
        let functions = FunctionLibraryCollection::standard();
        let variables = HashMap::new();
        let e_ctx = EvaluationContext::new(context, &functions, &variables)
            .with_time_zone(TimeZone::Utc);
        let scope = Rc::new(LocationPathEvaluation::single(context, None));
        evaluate(&parse_expression(text).unwrap(), &e_ctx, &scope).unwrap()
    }

    #[rstest]
    #[case("/root/a = 3", true)]
    #[case("/root/a = '3'", true)]
    #[case("/root/b != ''", false)]
    #[case("/root/b = ''", true)]
    #[case("/root/d = 7", true)]
    #[case("/root/d != 3", true)]
    #[case("/root/missing = ''", false)]
    #[case("/root/missing != ''", false)]
    #[case("/root/d = /root/a", true)]
    #[case("/root/a = true()", true)]
    #[case("/root/missing = false()", true)]
    #[case("'1' = 1.0", true)]
    #[case("'abc' = 'abc '", false)]
    #[case("true() = 'x'", true)]
    fn test_equality(#[case] expr: &str, #[case] expected: bool) {
        let tree = tree();
        assert_eq!(eval(tree.root(), expr).to_boolean(), expected, "{}", expr);
    }

    #[rstest]
    #[case("/root/d > 5", true)]
    #[case("/root/d < 3", false)]
    #[case("/root/d <= 3", true)]
    #[case("/root/c < 10", false)]
    #[case("/root/c >= 10", false)]
    #[case("'2' < '10'", true)]
    #[case("true() > false()", true)]
    fn test_relational(#[case] expr: &str, #[case] expected: bool) {
        let tree = tree();
        assert_eq!(eval(tree.root(), expr).to_boolean(), expected, "{}", expr);
    }

    #[test]
    fn test_nan_is_unordered() {
        let tree = tree();
        let root = tree.root();
        for expr in ["number('x') = number('x')", "0 div 0 < 1", "0 div 0 >= 1"] {
            assert!(!eval(root, expr).to_boolean(), "{}", expr);
        }
        assert!(eval(root, "number('x') != number('x')").to_boolean());
    }

    #[rstest]
    #[case("/root/a + 1", 4.0)]
    #[case("7 mod 3", 1.0)]
    #[case("-7 mod 3", -1.0)]
    #[case("1 div 0", f64::INFINITY)]
    #[case("-1 div 0", f64::NEG_INFINITY)]
    #[case("2 * 3 - 1", 5.0)]
    #[case("- /root/a", -3.0)]
    fn test_arithmetic(#[case] expr: &str, #[case] expected: f64) {
        let tree = tree();
        assert_eq!(eval(tree.root(), expr).to_number(), expected, "{}", expr);
    }

    #[test]
    fn test_arithmetic_with_nan() {
        let tree = tree();
        let root = tree.root();
        assert!(eval(root, "/root/b + 1").to_number().is_nan());
        assert!(eval(root, "/root/c * 2").to_number().is_nan());
        assert!(eval(root, "1 + 'x'").to_number().is_nan());
    }

    #[test]
    fn test_logical_results_are_booleans() {
        let tree = tree();
        let root = tree.root();
        let value = eval(root, "/root/a and 'x'");
        assert!(matches!(value, Evaluation::Boolean(true)));
        let value = eval(root, "/root/b or 0");
        assert!(matches!(value, Evaluation::Boolean(false)));
        // The right operand is not evaluated once the result is known.
        assert!(eval(root, "true() or $nope/x").to_boolean());
        assert!(!eval(root, "false() and $nope/x").to_boolean());
    }

    #[test]
    fn test_union_is_ordered_and_idempotent() {
        let tree = tree();
        let root = tree.root();
        fn names<'a>(value: Evaluation<'a, MockNode<'a>>) -> Vec<String> {
            value
                .into_node_set()
                .unwrap()
                .to_vec()
                .iter()
                .map(|n| n.name().unwrap().local_part.to_string())
                .collect()
        }
        assert_eq!(names(eval(root, "/root/c | /root/a")), vec!["a", "c"]);
        assert_eq!(names(eval(root, "/root/d | /root/d")), vec!["d", "d"]);
        assert_eq!(
            names(eval(root, "(/root/c | /root/a) | /root/a")),
            names(eval(root, "/root/c | /root/a"))
        );
    }

    #[test]
    fn test_union_requires_node_sets() {
        let tree = tree();
        let functions = FunctionLibraryCollection::standard();
        let variables = HashMap::new();
        let root = tree.root();
        let e_ctx = EvaluationContext::new(root, &functions, &variables);
        let scope = Rc::new(LocationPathEvaluation::single(root, None));
        let err = evaluate(&parse_expression("/root/a | 1").unwrap(), &e_ctx, &scope).unwrap_err();
        assert!(matches!(err, XPathError::TypeMismatch { .. }));
    }

    #[test]
    fn test_date_comparison_reads_strings_as_dates() {
        let tree = tree();
        let root = tree.root();
        assert!(eval(root, "date('2020-01-02') > '2020-01-01'").to_boolean());
        assert!(!eval(root, "date('2020-01-02') < '2019-12-31'").to_boolean());
        assert!(eval(root, "date('1970-01-03') = 2").to_boolean());
    }
}
