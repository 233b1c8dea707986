#![allow(dead_code)]

use xforms_xpath::xml::{XmlDocument, XmlNode};
use xforms_xpath::{Evaluator, EvaluatorConfig, TimeZone, TreeNode, XPathResult, XPathResultType};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub type Node<'a> = XmlNode<'a, 'a>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An evaluator anchored to UTC so date results do not depend on the host.
pub fn evaluator<'a>() -> Evaluator<'a, Node<'a>> {
    init_logger();
    Evaluator::with_config(EvaluatorConfig {
        time_zone: TimeZone::Utc,
        ..EvaluatorConfig::default()
    })
}

pub fn eval<'a>(
    doc: &'a XmlDocument<'a>,
    expr: &str,
    result_type: XPathResultType,
) -> XPathResult<'a, Node<'a>> {
    evaluator()
        .evaluate(expr, doc.root_node(), None, result_type)
        .unwrap_or_else(|e| panic!("'{}' failed: {}", expr, e))
}

pub fn string(doc: &XmlDocument<'_>, expr: &str) -> String {
    eval(doc, expr, XPathResultType::String)
        .string_value()
        .map(str::to_string)
        .unwrap_or_default()
}

pub fn number(doc: &XmlDocument<'_>, expr: &str) -> f64 {
    eval(doc, expr, XPathResultType::Number)
        .number_value()
        .unwrap_or(f64::NAN)
}

pub fn boolean(doc: &XmlDocument<'_>, expr: &str) -> bool {
    eval(doc, expr, XPathResultType::Boolean)
        .boolean_value()
        .unwrap_or_default()
}

/// Local names of an ordered snapshot, `@name` for attributes.
pub fn names(doc: &XmlDocument<'_>, expr: &str) -> Vec<String> {
    let result = eval(doc, expr, XPathResultType::OrderedNodeSnapshot);
    let len = result.snapshot_length().unwrap_or_default();
    (0..len)
        .filter_map(|i| result.snapshot_item(i).ok().flatten())
        .map(|node| label(&node))
        .collect()
}

pub fn label(node: &Node<'_>) -> String {
    use xforms_xpath::NodeType;
    let local = node.name().map(|q| q.local_part.to_string()).unwrap_or_default();
    match node.node_type() {
        NodeType::Attribute => format!("@{}", local),
        NodeType::Text => format!("'{}'", node.string_value()),
        _ => local,
    }
}
