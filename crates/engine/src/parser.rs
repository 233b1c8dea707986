//! Expression text to [`Expression`] trees, written with `nom` combinators.

use super::ast::*;
use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0, satisfy},
    combinator::{map, map_res, not, opt, recognize},
    error::ErrorKind,
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, preceded, terminated},
};

type Error<'a> = nom::error::Error<&'a str>;

/// Parses a complete expression. Trailing input is an error.
pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(XPathError::parse(input, "Empty expression"));
    }
    match expression(text) {
        Ok(("", expr)) => Ok(expr),
        Ok((rest, _)) => Err(XPathError::parse(
            input,
            format!("Unexpected input at '{}'", rest),
        )),
        Err(e) => Err(XPathError::parse(input, e.to_string())),
    }
}

fn expression(input: &str) -> IResult<&str, Expression> {
    binary(0, input)
}

fn fail(input: &str, kind: ErrorKind) -> nom::Err<Error<'_>> {
    nom::Err::Error(Error::new(input, kind))
}

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

// --- Operators ---

/// Binary operators from the loosest binding to the tightest. Unary minus
/// binds tighter than all of them except union, which `union_expr` handles.
const LEVELS: [&[(&str, BinaryOperator)]; 6] = [
    &[("or", BinaryOperator::Or)],
    &[("and", BinaryOperator::And)],
    &[("!=", BinaryOperator::NotEquals), ("=", BinaryOperator::Equals)],
    &[
        ("<=", BinaryOperator::LessThanOrEqual),
        ("&lt;=", BinaryOperator::LessThanOrEqual),
        (">=", BinaryOperator::GreaterThanOrEqual),
        ("&gt;=", BinaryOperator::GreaterThanOrEqual),
        ("<", BinaryOperator::LessThan),
        ("&lt;", BinaryOperator::LessThan),
        (">", BinaryOperator::GreaterThan),
        ("&gt;", BinaryOperator::GreaterThan),
    ],
    &[("+", BinaryOperator::Plus), ("-", BinaryOperator::Minus)],
    &[
        ("*", BinaryOperator::Multiply),
        ("div", BinaryOperator::Divide),
        ("mod", BinaryOperator::Modulo),
    ],
];

/// Matches one operator token of a level, with surrounding whitespace. Word
/// operators must end at a token boundary so `order` is never read as `or`
/// followed by `der`.
fn operator<'a>(
    table: &[(&'static str, BinaryOperator)],
    input: &'a str,
) -> IResult<&'a str, BinaryOperator> {
    let (start, _) = multispace0::<_, Error>(input)?;
    for (token, op) in table {
        let matched: IResult<&str, &str> = if token.starts_with(is_name_start) {
            terminated(tag(*token), not(satisfy(is_name_char))).parse(start)
        } else {
            tag(*token).parse(start)
        };
        if let Ok((rest, _)) = matched {
            let (rest, _) = multispace0::<_, Error>(rest)?;
            return Ok((rest, *op));
        }
    }
    Err(fail(input, ErrorKind::Tag))
}

fn operand(level: usize, input: &str) -> IResult<&str, Expression> {
    match level + 1 {
        next if next < LEVELS.len() => binary(next, input),
        _ => unary_expr(input),
    }
}

/// Left-associative chain of the operators at `level`. An operator with no
/// operand after it is left in the input.
fn binary(level: usize, input: &str) -> IResult<&str, Expression> {
    let (mut input, mut left) = operand(level, input)?;
    loop {
        let Ok((rest, op)) = operator(LEVELS[level], input) else {
            break;
        };
        let (rest, right) = match operand(level, rest) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        };
        left = Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        };
        input = rest;
    }
    Ok((input, left))
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    let (input, signs) = many0(ws(char::<_, Error>('-'))).parse(input)?;
    let (input, inner) = union_expr(input)?;
    let expr = signs.iter().fold(inner, |expr, _| Expression::UnaryOp {
        op: UnaryOperator::Minus,
        expr: Box::new(expr),
    });
    Ok((input, expr))
}

fn union_expr(input: &str) -> IResult<&str, Expression> {
    let (input, paths) = separated_list1(ws(char('|')), path_expr).parse(input)?;
    let expr = paths
        .into_iter()
        .reduce(|left, right| Expression::BinaryOp {
            left: Box::new(left),
            op: BinaryOperator::Union,
            right: Box::new(right),
        })
        .ok_or_else(|| fail(input, ErrorKind::SeparatedList))?;
    Ok((input, expr))
}

// --- Paths ---

/// A filter expression optionally continued by steps, or a plain location
/// path. Primaries go first so `position()` is a call, not a step.
fn path_expr(input: &str) -> IResult<&str, Expression> {
    let Ok((input, primary)) = primary_expr(input) else {
        let path = preceded(multispace0, location_path);
        return map(path, Expression::LocationPath).parse(input);
    };
    let (input, predicates) = many0(predicate).parse(input)?;
    let start = match predicates.is_empty() {
        true => primary,
        false => Expression::Filter {
            primary: Box::new(primary),
            predicates,
        },
    };
    let (input, steps) = relative_steps(input)?;
    if steps.is_empty() {
        return Ok((input, start));
    }
    let path = LocationPath {
        start_point: Some(Box::new(start)),
        is_absolute: false,
        steps,
    };
    Ok((input, Expression::LocationPath(path)))
}

fn location_path(input: &str) -> IResult<&str, LocationPath> {
    let (rest, lead) = opt(alt((tag::<_, _, Error>("//"), tag("/")))).parse(input)?;
    let mut steps = Vec::new();
    let rest = match lead {
        Some("//") => {
            let (rest, first) = step(rest)?;
            steps.extend([Step::descendant_or_self(), first]);
            rest
        }
        // A lone `/` selects the root.
        Some(_) => match preceded(multispace0, step).parse(rest) {
            Ok((after, first)) => {
                steps.push(first);
                after
            }
            Err(_) => rest,
        },
        None => {
            let (rest, first) = step(rest)?;
            steps.push(first);
            rest
        }
    };
    let (rest, more) = relative_steps(rest)?;
    steps.extend(more);
    Ok((
        rest,
        LocationPath {
            start_point: None,
            is_absolute: lead.is_some(),
            steps,
        },
    ))
}

/// Each `/step` adds one step, each `//step` two.
fn relative_steps(input: &str) -> IResult<&str, Vec<Step>> {
    let separator = ws(alt((tag("//"), tag("/"))));
    let (input, pairs) = many0((separator, step)).parse(input)?;
    let steps = pairs
        .into_iter()
        .flat_map(|(sep, step)| {
            let expansion = (sep == "//").then(Step::descendant_or_self);
            expansion.into_iter().chain([step])
        })
        .collect();
    Ok((input, steps))
}

fn step(input: &str) -> IResult<&str, Step> {
    let (input, mut parsed) = alt((abbreviated_step, axis_step)).parse(input)?;
    let (input, predicates) = many0(predicate).parse(input)?;
    parsed.predicates = predicates;
    Ok((input, parsed))
}

/// `..`, `.` and `@name`.
fn abbreviated_step(input: &str) -> IResult<&str, Step> {
    let any = || NodeTest::NodeType(NodeTypeTest::Node);
    alt((
        map(tag(".."), move |_| Step::new(Axis::Parent, any())),
        map(tag("."), move |_| Step::new(Axis::SelfAxis, any())),
        map(preceded(ws(char('@')), node_test), |test| {
            Step::new(Axis::Attribute, test)
        }),
    ))
    .parse(input)
}

fn axis_step(input: &str) -> IResult<&str, Step> {
    let (input, explicit) = opt(axis).parse(input)?;
    let (input, test) = node_test(input)?;
    Ok((input, Step::new(explicit.unwrap_or(Axis::Child), test)))
}

const AXES: [Axis; 13] = [
    Axis::Ancestor,
    Axis::AncestorOrSelf,
    Axis::Attribute,
    Axis::Child,
    Axis::Descendant,
    Axis::DescendantOrSelf,
    Axis::Following,
    Axis::FollowingSibling,
    Axis::Namespace,
    Axis::Parent,
    Axis::Preceding,
    Axis::PrecedingSibling,
    Axis::SelfAxis,
];

/// An axis name followed by `::`.
fn axis(input: &str) -> IResult<&str, Axis> {
    let (rest, name) = terminated(nc_name, ws(tag("::"))).parse(input)?;
    AXES.into_iter()
        .find(|axis| axis.name() == name)
        .map(|axis| (rest, axis))
        .ok_or_else(|| fail(input, ErrorKind::Tag))
}

fn predicate(input: &str) -> IResult<&str, Expression> {
    delimited(ws(char('[')), expression, ws(char(']'))).parse(input)
}

// --- Node tests and names ---

const NODE_TYPES: [&str; 4] = ["comment", "node", "processing-instruction", "text"];

pub fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(char('*'), |_| NodeTest::Wildcard),
        node_type_test,
        map(terminated(nc_name, tag(":*")), |prefix: &str| {
            NodeTest::NamespaceWildcard(prefix.to_string())
        }),
        map(q_name, NodeTest::Name),
    ))
    .parse(input)
}

/// `text()`, `comment()`, `node()` and `processing-instruction('target'?)`.
fn node_type_test(input: &str) -> IResult<&str, NodeTest> {
    let (rest, name) = terminated(nc_name, ws(char('('))).parse(input)?;
    let (rest, test) = match name {
        "text" => (rest, NodeTest::NodeType(NodeTypeTest::Text)),
        "comment" => (rest, NodeTest::NodeType(NodeTypeTest::Comment)),
        "node" => (rest, NodeTest::NodeType(NodeTypeTest::Node)),
        "processing-instruction" => match ws(string_literal).parse(rest) {
            Ok((rest, target)) => (rest, NodeTest::ProcessingInstruction(target)),
            Err(_) => (rest, NodeTest::NodeType(NodeTypeTest::ProcessingInstruction)),
        },
        _ => return Err(fail(input, ErrorKind::Tag)),
    };
    let (rest, _) = char::<_, Error>(')').parse(rest)?;
    Ok((rest, test))
}

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize((take_while1(is_name_start), take_while(is_name_char))).parse(input)
}

fn q_name(input: &str) -> IResult<&str, String> {
    let name = recognize((nc_name, opt((char(':'), nc_name))));
    map(name, str::to_string).parse(input)
}

// --- Primaries ---

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        map(preceded(char('$'), q_name), Expression::Variable),
        map(number, Expression::Number),
        map(string_literal, Expression::Literal),
        function_call,
        delimited(ws(char('(')), expression, ws(char(')'))),
    )))
    .parse(input)
}

/// `Digits ('.' Digits?)? | '.' Digits`. No sign, exponent or named values.
fn number(input: &str) -> IResult<&str, f64> {
    let whole = recognize((digit1, opt((char('.'), digit0))));
    let fraction = recognize((char('.'), digit1));
    map_res(alt((whole, fraction)), str::parse::<f64>).parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    let quoted = |quote: char| {
        delimited(char(quote), take_while(move |c: char| c != quote), char(quote))
    };
    map(alt((quoted('\''), quoted('"'))), str::to_string).parse(input)
}

/// A QName directly followed by `(`. Node type tests share that shape and
/// are left to the step parser.
fn function_call(input: &str) -> IResult<&str, Expression> {
    let (rest, name) = q_name(input)?;
    if NODE_TYPES.contains(&name.as_str()) {
        return Err(fail(input, ErrorKind::Verify));
    }
    let (rest, args) = preceded(
        ws(char('(')),
        terminated(separated_list0(ws(char(',')), expression), ws(char(')'))),
    )
    .parse(rest)?;
    Ok((rest, Expression::FunctionCall { name, args }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step::new(Axis::Child, NodeTest::Name(name.into()))
    }

    fn relative(steps: Vec<Step>) -> Expression {
        Expression::LocationPath(LocationPath {
            start_point: None,
            is_absolute: false,
            steps,
        })
    }

    #[test]
    fn test_parse_simple_path() {
        let result = parse_expression("foo/bar").unwrap();
        assert_eq!(result, relative(vec![child("foo"), child("bar")]));
    }

    #[test]
    fn test_parse_unary_minus() {
        let result = parse_expression("-5").unwrap();
        assert_eq!(
            result,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(Expression::Number(5.0))
            }
        );

        let result = parse_expression("10 - -5").unwrap();
        let Expression::BinaryOp { left, op, right } = result else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Minus);
        assert_eq!(*left, Expression::Number(10.0));
        assert_eq!(
            *right,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(Expression::Number(5.0))
            }
        );

        let nested = parse_expression("--1").unwrap();
        assert!(matches!(
            nested,
            Expression::UnaryOp { expr, .. } if matches!(*expr, Expression::UnaryOp { .. })
        ));
    }

    #[test]
    fn test_parse_all_axes() {
        let cases = [
            ("ancestor::x", Axis::Ancestor),
            ("ancestor-or-self::x", Axis::AncestorOrSelf),
            ("attribute::x", Axis::Attribute),
            ("child::x", Axis::Child),
            ("descendant::x", Axis::Descendant),
            ("descendant-or-self::x", Axis::DescendantOrSelf),
            ("following::x", Axis::Following),
            ("following-sibling::x", Axis::FollowingSibling),
            ("namespace::x", Axis::Namespace),
            ("parent::x", Axis::Parent),
            ("preceding::x", Axis::Preceding),
            ("preceding-sibling::x", Axis::PrecedingSibling),
            ("self::x", Axis::SelfAxis),
        ];
        for (text, expected) in cases {
            let Expression::LocationPath(lp) = parse_expression(text).unwrap() else {
                panic!("Expected location path for {}", text);
            };
            assert_eq!(lp.steps[0].axis, expected, "{}", text);
        }
    }

    #[test]
    fn test_parse_abbreviations() {
        let Expression::LocationPath(lp) = parse_expression("../@id").unwrap() else {
            panic!("Expected location path");
        };
        assert_eq!(lp.steps[0].axis, Axis::Parent);
        assert_eq!(lp.steps[0].node_test, NodeTest::NodeType(NodeTypeTest::Node));
        assert_eq!(lp.steps[1].axis, Axis::Attribute);

        let Expression::LocationPath(lp) = parse_expression(".").unwrap() else {
            panic!("Expected location path");
        };
        assert_eq!(lp.steps, vec![Step::new(
            Axis::SelfAxis,
            NodeTest::NodeType(NodeTypeTest::Node)
        )]);
    }

    #[test]
    fn test_parse_root_only() {
        let result = parse_expression("/").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![],
            })
        );
    }

    #[test]
    fn test_parse_path_starting_with_variable() {
        let result = parse_expression("$myVar/foo/bar").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: Some(Box::new(Expression::Variable("myVar".to_string()))),
                is_absolute: false,
                steps: vec![child("foo"), child("bar")],
            })
        );
    }

    #[test]
    fn test_parse_filter_expression() {
        let result = parse_expression("(//item)[2]/@id").unwrap();
        let Expression::LocationPath(lp) = result else {
            panic!("Expected location path");
        };
        let Some(start) = lp.start_point else {
            panic!("Expected a start point");
        };
        assert!(matches!(
            *start,
            Expression::Filter { ref predicates, .. } if predicates == &vec![Expression::Number(2.0)]
        ));
        assert_eq!(lp.steps.len(), 1);
        assert_eq!(lp.steps[0].axis, Axis::Attribute);
    }

    #[test]
    fn test_parse_predicate() {
        let result = parse_expression("foo[@id = 'a']").unwrap();
        let mut step = child("foo");
        step.predicates.push(Expression::BinaryOp {
            left: Box::new(relative(vec![Step::new(
                Axis::Attribute,
                NodeTest::Name("id".into()),
            )])),
            op: BinaryOperator::Equals,
            right: Box::new(Expression::Literal("a".into())),
        });
        assert_eq!(result, relative(vec![step]));
    }

    #[test]
    fn test_parse_numeric_predicate() {
        let result = parse_expression("foo[1]").unwrap();
        let mut step = child("foo");
        step.predicates.push(Expression::Number(1.0));
        assert_eq!(result, relative(vec![step]));
    }

    #[test]
    fn test_parse_function_in_predicate() {
        let result = parse_expression("para[position()=1]").unwrap();
        let Expression::LocationPath(lp) = result else {
            panic!("Expected LocationPath");
        };
        assert_eq!(lp.steps.len(), 1);
        assert_eq!(lp.steps[0].predicates.len(), 1);
        assert!(lp.steps[0].predicates[0].is_binary_op());
    }

    #[test]
    fn test_parse_node_tests() {
        let Expression::LocationPath(lp) =
            parse_expression("foo/text() | processing-instruction('xml-stylesheet')")
                .map(|e| match e {
                    Expression::BinaryOp { left, .. } => *left,
                    other => other,
                })
                .unwrap()
        else {
            panic!("Expected location path");
        };
        assert_eq!(lp.steps[1].node_test, NodeTest::NodeType(NodeTypeTest::Text));

        let Expression::LocationPath(lp) =
            parse_expression("processing-instruction( 'xml-stylesheet' )").unwrap()
        else {
            panic!("Expected location path");
        };
        assert_eq!(
            lp.steps[0].node_test,
            NodeTest::ProcessingInstruction("xml-stylesheet".into())
        );

        let Expression::LocationPath(lp) = parse_expression("jr:*").unwrap() else {
            panic!("Expected location path");
        };
        assert_eq!(lp.steps[0].node_test, NodeTest::NamespaceWildcard("jr".into()));
    }

    #[test]
    fn test_parse_operator_precedence() {
        let result = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(Expression::Number(1.0)),
                op: BinaryOperator::Plus,
                right: Box::new(Expression::BinaryOp {
                    left: Box::new(Expression::Number(2.0)),
                    op: BinaryOperator::Multiply,
                    right: Box::new(Expression::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_boolean_logic() {
        let path = |name: &str| relative(vec![child(name)]);
        let eq = |a: &str, b: &str| Expression::BinaryOp {
            left: Box::new(path(a)),
            op: BinaryOperator::Equals,
            right: Box::new(path(b)),
        };

        let result = parse_expression("a = b or c = d and e = f").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(eq("a", "b")),
                op: BinaryOperator::Or,
                right: Box::new(Expression::BinaryOp {
                    left: Box::new(eq("c", "d")),
                    op: BinaryOperator::And,
                    right: Box::new(eq("e", "f")),
                }),
            }
        );
    }

    #[test]
    fn test_keywords_need_token_boundary() {
        let result = parse_expression("order or ordinal").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(relative(vec![child("order")])),
                op: BinaryOperator::Or,
                right: Box::new(relative(vec![child("ordinal")])),
            }
        );

        let result = parse_expression("divisor div modulus mod 2").unwrap();
        let Expression::BinaryOp { left, op, .. } = result else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Modulo);
        assert!(matches!(*left, Expression::BinaryOp { op: BinaryOperator::Divide, .. }));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_expression("3.25").unwrap(), Expression::Number(3.25));
        assert_eq!(parse_expression(".5").unwrap(), Expression::Number(0.5));
        assert_eq!(parse_expression("7.").unwrap(), Expression::Number(7.0));
        // Not numbers: names that happen to spell a float.
        assert!(parse_expression("inf").unwrap().is_location_path());
        assert!(parse_expression("NaN").unwrap().is_location_path());
    }

    #[test]
    fn test_parse_descendant_or_self() {
        let result = parse_expression("//foo").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![Step::descendant_or_self(), child("foo")]
            })
        );
    }

    #[test]
    fn test_parse_names_with_dots_and_dashes() {
        let result = parse_expression("/data/group.1/first-name").unwrap();
        let Expression::LocationPath(lp) = result else {
            panic!("Expected location path");
        };
        assert_eq!(lp.steps, vec![child("data"), child("group.1"), child("first-name")]);
    }

    #[test]
    fn test_parse_xml_entities_in_relational_expr() {
        let result = parse_expression("a &lt; b").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(relative(vec![child("a")])),
                op: BinaryOperator::LessThan,
                right: Box::new(relative(vec![child("b")])),
            }
        );

        let result = parse_expression("a &gt;= b").unwrap();
        let Expression::BinaryOp { op, .. } = result else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::GreaterThanOrEqual);
    }

    #[test]
    fn test_parse_prefixed_function_with_spacing() {
        let result = parse_expression("jr:itext( 'label' )").unwrap();
        assert_eq!(
            result,
            Expression::FunctionCall {
                name: "jr:itext".into(),
                args: vec![Expression::Literal("label".into())],
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_expression(""), Err(XPathError::Parse { .. })));
        assert!(matches!(parse_expression("1 +"), Err(XPathError::Parse { .. })));
        assert!(matches!(parse_expression("foo["), Err(XPathError::Parse { .. })));
        assert!(matches!(parse_expression("'unterminated"), Err(XPathError::Parse { .. })));
    }
}
