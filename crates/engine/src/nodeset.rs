//! The node-set in scope at one step or sub-expression.

use crate::tree::TreeNode;
use crate::value::string_to_number;
use std::cell::OnceCell;
use std::rc::Rc;
use xforms_xpath_iter::{Reiterable, Replay};

pub type NodeIter<'a, N> = Box<dyn Iterator<Item = N> + 'a>;

/// An ordered, de-duplicated, lazily materialized node sequence together
/// with a 1-based context position inside it.
///
/// Clones and [`at_position`](Self::at_position) views share one replay
/// buffer, so the underlying traversal runs at most once no matter how many
/// times the sequence is inspected.
#[derive(Debug, Clone)]
pub struct LocationPathEvaluation<'a, N: TreeNode<'a>> {
    nodes: Reiterable<NodeIter<'a, N>>,
    position: usize,
    parent: Option<Rc<LocationPathEvaluation<'a, N>>>,
    first_string: OnceCell<String>,
}

impl<'a, N: TreeNode<'a>> LocationPathEvaluation<'a, N> {
    pub fn from_iter<I>(iter: I, parent: Option<Rc<Self>>) -> Self
    where
        I: Iterator<Item = N> + 'a,
    {
        let boxed: NodeIter<'a, N> = Box::new(iter);
        Self {
            nodes: Reiterable::new(boxed),
            position: 1,
            parent,
            first_string: OnceCell::new(),
        }
    }

    /// Builds a set over nodes that are already distinct and ordered.
    pub fn from_nodes(nodes: Vec<N>, parent: Option<Rc<Self>>) -> Self {
        Self {
            nodes: Reiterable::from_items(nodes),
            position: 1,
            parent,
            first_string: OnceCell::new(),
        }
    }

    pub fn single(node: N, parent: Option<Rc<Self>>) -> Self {
        Self::from_nodes(vec![node], parent)
    }

    pub fn empty(parent: Option<Rc<Self>>) -> Self {
        Self::from_nodes(Vec::new(), parent)
    }

    /// A view of the same sequence focused on another position.
    pub fn at_position(&self, position: usize) -> Self {
        Self {
            nodes: self.nodes.clone(),
            position,
            parent: self.parent.clone(),
            first_string: OnceCell::new(),
        }
    }

    pub fn context_position(&self) -> usize {
        self.position
    }

    /// Drains the sequence on first use.
    pub fn context_size(&self) -> usize {
        self.nodes.len()
    }

    pub fn context_node(&self) -> Option<N> {
        self.position.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    pub fn context_nodes(&self) -> Replay<NodeIter<'a, N>> {
        self.nodes.iter()
    }

    pub fn first(&self) -> Option<N> {
        self.nodes.first()
    }

    pub fn get(&self, index: usize) -> Option<N> {
        self.nodes.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True if the set holds more than `n` nodes, pulling at most `n + 1`.
    pub fn has_more_than(&self, n: usize) -> bool {
        self.nodes.has_more_than(n)
    }

    pub fn to_vec(&self) -> Vec<N> {
        self.nodes.to_vec()
    }

    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// The outermost scope of the chain, whose context node is what
    /// `current()` returns.
    pub fn origin(&self) -> &Self {
        let mut scope = self;
        while let Some(parent) = scope.parent.as_deref() {
            scope = parent;
        }
        scope
    }

    /// String value of the first node, or `""` for an empty set.
    pub fn to_xpath_string(&self) -> String {
        self.first_string
            .get_or_init(|| self.first().map(|n| n.string_value()).unwrap_or_default())
            .clone()
    }

    /// True when the first node has non-empty string content.
    pub fn to_boolean(&self) -> bool {
        !self.to_xpath_string().is_empty()
    }

    /// `NaN` for empty content, never zero.
    pub fn to_number(&self) -> f64 {
        let value = self.to_xpath_string();
        if value.is_empty() {
            f64::NAN
        } else {
            string_to_number(&value)
        }
    }
}
