//! Lazy node sequences for each of the thirteen XPath axes.
//!
//! Forward axes yield document order, reverse axes yield proximity order
//! (nearest first). Attribute and namespace nodes are placed through their
//! owner element for the tree-walking axes.

use crate::ast::Axis;
use crate::nodeset::NodeIter;
use crate::tree::{NodeType, TreeNode, tree_position};
use std::iter;

pub fn axis_iter<'a, N: TreeNode<'a>>(axis: Axis, node: N) -> NodeIter<'a, N> {
    match axis {
        Axis::SelfAxis => Box::new(iter::once(node)),
        Axis::Child => node.children(),
        Axis::Attribute => match node.node_type() {
            NodeType::Element => node.attributes(),
            _ => Box::new(iter::empty()),
        },
        Axis::Namespace => match node.node_type() {
            NodeType::Element => node.namespaces(),
            _ => Box::new(iter::empty()),
        },
        Axis::Parent => Box::new(node.parent().into_iter()),
        Axis::Ancestor => Box::new(ancestors(node)),
        Axis::AncestorOrSelf => Box::new(iter::successors(Some(node), |n| n.parent())),
        Axis::Descendant => Box::new(Descendants::new(node)),
        Axis::DescendantOrSelf => Box::new(iter::once(node).chain(Descendants::new(node))),
        Axis::FollowingSibling => following_siblings(node),
        Axis::PrecedingSibling => preceding_siblings(node),
        Axis::Following => following(node),
        Axis::Preceding => preceding(node),
    }
}

fn ancestors<'a, N: TreeNode<'a>>(node: N) -> impl Iterator<Item = N> + 'a {
    iter::successors(node.parent(), |n| n.parent())
}

fn is_tree_child<'a, N: TreeNode<'a>>(node: &N) -> bool {
    !matches!(node.node_type(), NodeType::Attribute | NodeType::Namespace)
}

/// Preorder walk below a node, one child iterator per open level.
pub struct Descendants<'a, N: TreeNode<'a>> {
    stack: Vec<NodeIter<'a, N>>,
}

impl<'a, N: TreeNode<'a>> Descendants<'a, N> {
    pub fn new(node: N) -> Self {
        Self {
            stack: vec![node.children()],
        }
    }
}

impl<'a, N: TreeNode<'a>> Iterator for Descendants<'a, N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(node) => {
                    self.stack.push(node.children());
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

fn following_siblings<'a, N: TreeNode<'a>>(node: N) -> NodeIter<'a, N> {
    let Some(parent) = node.parent().filter(|_| is_tree_child(&node)) else {
        return Box::new(iter::empty());
    };
    Box::new(
        parent
            .children()
            .skip_while(move |sibling| *sibling != node)
            .skip(1)
            .filter(move |sibling| sibling.parent() == Some(parent)),
    )
}

fn preceding_siblings<'a, N: TreeNode<'a>>(node: N) -> NodeIter<'a, N> {
    let Some(parent) = node.parent().filter(|_| is_tree_child(&node)) else {
        return Box::new(iter::empty());
    };
    let mut before: Vec<N> = parent
        .children()
        .take_while(|sibling| *sibling != node)
        .filter(|sibling| sibling.parent() == Some(parent))
        .collect();
    before.reverse();
    Box::new(before.into_iter())
}

fn subtree<'a, N: TreeNode<'a>>(node: N) -> impl Iterator<Item = N> + 'a {
    iter::once(node).chain(Descendants::new(node))
}

/// Everything after the node in document order except its descendants. The
/// children of an attribute's owner follow the attribute.
fn following<'a, N: TreeNode<'a>>(node: N) -> NodeIter<'a, N> {
    let start = tree_position(node);
    let owned: NodeIter<'a, N> = if start != node {
        Box::new(Descendants::new(start))
    } else {
        Box::new(iter::empty())
    };
    let after = iter::successors(Some(start), |n| n.parent())
        .flat_map(|n| following_siblings(n).flat_map(subtree));
    Box::new(owned.chain(after))
}

/// Everything before the node in document order except its ancestors,
/// nearest first.
fn preceding<'a, N: TreeNode<'a>>(node: N) -> NodeIter<'a, N> {
    let start = tree_position(node);
    Box::new(
        iter::successors(Some(start), |n| n.parent())
            .flat_map(|n| preceding_siblings(n))
            .flat_map(|sibling| {
                let mut nodes: Vec<N> = subtree(sibling).collect();
                nodes.reverse();
                nodes.into_iter()
            }),
    )
}
