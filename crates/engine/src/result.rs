//! DOM `XPathResult` compatible wrapper around an evaluation.

use crate::error::XPathError;
use crate::nodeset::NodeIter;
use crate::tree::{TreeNode, sort_document_order};
use crate::value::Evaluation;
use std::fmt;
use xforms_xpath_iter::{Reiterable, Replay};

/// The ten DOM result type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum XPathResultType {
    #[default]
    Any = 0,
    Number = 1,
    String = 2,
    Boolean = 3,
    UnorderedNodeIterator = 4,
    OrderedNodeIterator = 5,
    UnorderedNodeSnapshot = 6,
    OrderedNodeSnapshot = 7,
    AnyUnorderedNode = 8,
    FirstOrderedNode = 9,
}

impl XPathResultType {
    pub fn from_code(code: u16) -> Result<Self, XPathError> {
        use XPathResultType::*;
        Ok(match code {
            0 => Any,
            1 => Number,
            2 => String,
            3 => Boolean,
            4 => UnorderedNodeIterator,
            5 => OrderedNodeIterator,
            6 => UnorderedNodeSnapshot,
            7 => OrderedNodeSnapshot,
            8 => AnyUnorderedNode,
            9 => FirstOrderedNode,
            other => return Err(XPathError::InvalidResultType(other)),
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn is_node_type(self) -> bool {
        self.code() >= 4
    }

    pub fn name(self) -> &'static str {
        match self {
            XPathResultType::Any => "ANY_TYPE",
            XPathResultType::Number => "NUMBER_TYPE",
            XPathResultType::String => "STRING_TYPE",
            XPathResultType::Boolean => "BOOLEAN_TYPE",
            XPathResultType::UnorderedNodeIterator => "UNORDERED_NODE_ITERATOR_TYPE",
            XPathResultType::OrderedNodeIterator => "ORDERED_NODE_ITERATOR_TYPE",
            XPathResultType::UnorderedNodeSnapshot => "UNORDERED_NODE_SNAPSHOT_TYPE",
            XPathResultType::OrderedNodeSnapshot => "ORDERED_NODE_SNAPSHOT_TYPE",
            XPathResultType::AnyUnorderedNode => "ANY_UNORDERED_NODE_TYPE",
            XPathResultType::FirstOrderedNode => "FIRST_ORDERED_NODE_TYPE",
        }
    }
}

impl fmt::Display for XPathResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

enum Payload<'a, N: TreeNode<'a>> {
    Boolean(bool),
    Number(f64),
    String(String),
    Iterator(Replay<NodeIter<'a, N>>),
    Snapshot(Vec<N>),
    Single(Option<N>),
}

/// The outcome of one evaluation, shaped by the requested result type.
pub struct XPathResult<'a, N: TreeNode<'a>> {
    result_type: XPathResultType,
    payload: Payload<'a, N>,
}

impl<'a, N: TreeNode<'a>> fmt::Debug for XPathResult<'a, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XPathResult")
            .field("result_type", &self.result_type)
            .finish_non_exhaustive()
    }
}

impl<'a, N: TreeNode<'a>> XPathResult<'a, N> {
    /// Converts `value` to `requested`. Scalar types coerce; node types
    /// require a node-set. `Any` picks the natural type of the value.
    pub fn from_evaluation(
        value: Evaluation<'a, N>,
        requested: XPathResultType,
    ) -> Result<Self, XPathError> {
        use XPathResultType::*;
        let result_type = match (requested, &value) {
            (Any, Evaluation::Boolean(_)) => Boolean,
            (Any, Evaluation::Number(_)) => Number,
            (Any, Evaluation::String(_) | Evaluation::Date(_)) => String,
            (Any, Evaluation::Node(_)) => UnorderedNodeIterator,
            (other, _) => other,
        };

        let payload = match result_type {
            Boolean => Payload::Boolean(value.to_boolean()),
            Number => Payload::Number(value.to_number()),
            String => Payload::String(value.to_string()),
            node_type => node_payload(node_type, value)?,
        };
        Ok(Self {
            result_type,
            payload,
        })
    }

    pub fn result_type(&self) -> XPathResultType {
        self.result_type
    }

    fn mismatch(&self, wanted: &str) -> XPathError {
        XPathError::type_mismatch(wanted, self.result_type.name())
    }

    pub fn boolean_value(&self) -> Result<bool, XPathError> {
        match self.payload {
            Payload::Boolean(b) => Ok(b),
            _ => Err(self.mismatch("BOOLEAN_TYPE")),
        }
    }

    pub fn number_value(&self) -> Result<f64, XPathError> {
        match self.payload {
            Payload::Number(n) => Ok(n),
            _ => Err(self.mismatch("NUMBER_TYPE")),
        }
    }

    pub fn string_value(&self) -> Result<&str, XPathError> {
        match &self.payload {
            Payload::String(s) => Ok(s),
            _ => Err(self.mismatch("STRING_TYPE")),
        }
    }

    pub fn single_node_value(&self) -> Result<Option<N>, XPathError> {
        match self.payload {
            Payload::Single(node) => Ok(node),
            _ => Err(self.mismatch("a single node type")),
        }
    }

    pub fn snapshot_length(&self) -> Result<usize, XPathError> {
        match &self.payload {
            Payload::Snapshot(nodes) => Ok(nodes.len()),
            _ => Err(self.mismatch("a snapshot type")),
        }
    }

    pub fn snapshot_item(&self, index: usize) -> Result<Option<N>, XPathError> {
        match &self.payload {
            Payload::Snapshot(nodes) => Ok(nodes.get(index).copied()),
            _ => Err(self.mismatch("a snapshot type")),
        }
    }

    /// The next node of an iterator result, pulled from the evaluation
    /// only now.
    pub fn iterate_next(&mut self) -> Result<Option<N>, XPathError> {
        let result_type = self.result_type;
        match &mut self.payload {
            Payload::Iterator(nodes) => Ok(nodes.next()),
            _ => Err(XPathError::type_mismatch("an iterator type", result_type.name())),
        }
    }

    /// The tree is never mutated during iteration, so this is always false.
    pub fn invalid_iterator_state(&self) -> bool {
        false
    }
}

fn node_payload<'a, N: TreeNode<'a>>(
    result_type: XPathResultType,
    value: Evaluation<'a, N>,
) -> Result<Payload<'a, N>, XPathError> {
    use XPathResultType::*;
    let set = match value {
        Evaluation::Node(set) => set,
        other => {
            return Err(XPathError::type_mismatch(
                result_type.name(),
                other.value_type().to_string(),
            ));
        }
    };
    let ordered = || {
        let mut nodes = set.to_vec();
        sort_document_order(&mut nodes);
        nodes
    };
    Ok(match result_type {
        OrderedNodeIterator => Payload::Iterator(Reiterable::from_items(ordered()).iter()),
        UnorderedNodeSnapshot => Payload::Snapshot(set.to_vec()),
        OrderedNodeSnapshot => Payload::Snapshot(ordered()),
        AnyUnorderedNode => Payload::Single(set.first()),
        FirstOrderedNode => Payload::Single(ordered().first().copied()),
        _ => Payload::Iterator(set.context_nodes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_support::eval;
    use crate::tree::mock::{MockNode, MockTree};
    use rstest::rstest;

    fn doc() -> MockTree {
        let mut b = MockTree::builder();
        b.start_element("root");
        b.leaf("a", "3");
        b.leaf("b", "");
        b.end_element();
        b.finish()
    }

    fn result<'a>(
        tree: &'a MockTree,
        expr: &str,
        requested: XPathResultType,
    ) -> Result<XPathResult<'a, MockNode<'a>>, XPathError> {
        XPathResult::from_evaluation(eval(tree.root(), expr)?, requested)
    }

    #[rstest]
    #[case(0, XPathResultType::Any)]
    #[case(5, XPathResultType::OrderedNodeIterator)]
    #[case(9, XPathResultType::FirstOrderedNode)]
    fn test_codes_round_trip(#[case] code: u16, #[case] expected: XPathResultType) {
        assert_eq!(XPathResultType::from_code(code).unwrap(), expected);
        assert_eq!(expected.code(), code);
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(
            XPathResultType::from_code(10).unwrap_err(),
            XPathError::InvalidResultType(10)
        );
    }

    #[test]
    fn test_any_picks_natural_type() {
        let tree = doc();
        let r = result(&tree, "/root/a = 3", XPathResultType::Any).unwrap();
        assert_eq!(r.result_type(), XPathResultType::Boolean);
        assert!(r.boolean_value().unwrap());
        assert!(r.number_value().is_err());

        let r = result(&tree, "count(/root/*)", XPathResultType::Any).unwrap();
        assert_eq!(r.number_value().unwrap(), 2.0);

        let r = result(&tree, "/root/*", XPathResultType::Any).unwrap();
        assert_eq!(r.result_type(), XPathResultType::UnorderedNodeIterator);
    }

    #[test]
    fn test_scalar_coercion() {
        let tree = doc();
        let r = result(&tree, "/root/a", XPathResultType::Number).unwrap();
        assert_eq!(r.number_value().unwrap(), 3.0);
        let r = result(&tree, "/root/a + 1", XPathResultType::String).unwrap();
        assert_eq!(r.string_value().unwrap(), "4");
        let r = result(&tree, "/root/b", XPathResultType::Boolean).unwrap();
        assert!(!r.boolean_value().unwrap());
    }

    #[test]
    fn test_node_type_requires_node_set() {
        let tree = doc();
        let err = result(&tree, "1", XPathResultType::OrderedNodeSnapshot).unwrap_err();
        assert!(matches!(err, XPathError::TypeMismatch { .. }));
    }

    #[test]
    fn test_iterator_and_snapshot() {
        let tree = doc();
        let mut r = result(&tree, "/root/b | /root/a", XPathResultType::OrderedNodeIterator).unwrap();
        assert!(!r.invalid_iterator_state());
        let a = r.iterate_next().unwrap().unwrap();
        assert_eq!(a.string_value(), "3");
        assert!(r.iterate_next().unwrap().is_some());
        assert_eq!(r.iterate_next().unwrap(), None);
        assert!(r.snapshot_length().is_err());

        let r = result(&tree, "/root/*", XPathResultType::OrderedNodeSnapshot).unwrap();
        assert_eq!(r.snapshot_length().unwrap(), 2);
        assert_eq!(r.snapshot_item(1).unwrap().map(|n| n.string_value()).as_deref(), Some(""));
        assert_eq!(r.snapshot_item(2).unwrap(), None);
    }

    #[test]
    fn test_single_node() {
        let tree = doc();
        let r = result(&tree, "/root/*", XPathResultType::FirstOrderedNode).unwrap();
        assert_eq!(r.single_node_value().unwrap().map(|n| n.string_value()).as_deref(), Some("3"));
        let mut r = result(&tree, "/root/none", XPathResultType::AnyUnorderedNode).unwrap();
        assert_eq!(r.single_node_value().unwrap(), None);
        assert!(r.iterate_next().is_err());
    }
}
