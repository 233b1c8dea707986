//! The navigation contract the evaluator requires of a host tree.
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

pub mod mock;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A qualified name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

impl fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_part),
            None => f.write_str(self.local_part),
        }
    }
}

/// The XPath 1.0 node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Namespace,
    Text,
    Comment,
    ProcessingInstruction,
}

/// A node in a read-only, hierarchical document.
///
/// The evaluator is written exclusively against this trait. `'a` is the
/// lifetime of the underlying document. `Ord` must be document order for
/// nodes of the tree; attribute and namespace nodes only need to order
/// consistently among the nodes sharing their owner element, since
/// [`document_order`] places them relative to that owner itself.
pub trait TreeNode<'a>:
    fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord + 'a
{
    fn node_type(&self) -> NodeType;

    /// The qualified name. `None` for text, comment and root nodes. For a
    /// processing instruction this is its target, for a namespace node its
    /// prefix (empty for the default namespace).
    fn name(&self) -> Option<QName<'a>>;

    /// The expanded namespace URI of an element or attribute name.
    fn namespace_uri(&self) -> Option<&'a str>;

    /// The XPath 1.0 string value: descendant text for elements and the
    /// root, the value for attributes, the URI for namespace nodes and the
    /// content for everything else.
    fn string_value(&self) -> String;

    /// Attribute nodes of an element, excluding namespace declarations.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// In-scope namespace nodes of an element.
    fn namespaces(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        Box::new(std::iter::empty())
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The tree parent. For attribute and namespace nodes, the owner element.
    fn parent(&self) -> Option<Self>;

    fn root(&self) -> Self {
        let mut node = *self;
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// The first element in document order carrying an `id` or `xml:id`
    /// attribute equal to `id`.
    fn element_by_id(&self, id: &str) -> Option<Self> {
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if node.node_type() == NodeType::Element
                && node.attributes().any(|attr| is_id_attribute(&attr) && attr.string_value() == id)
            {
                return Some(node);
            }
            let mut children: Vec<Self> = node.children().collect();
            children.reverse();
            stack.extend(children);
        }
        None
    }

    /// The URI bound to `prefix` (empty for the default namespace) on the
    /// nearest element at or above this node. The root defers to its
    /// document element.
    fn in_scope_namespace(&self, prefix: &str) -> Option<String> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE.to_string());
        }
        let element = match self.node_type() {
            NodeType::Root => self
                .children()
                .find(|child| child.node_type() == NodeType::Element)?,
            _ => owner_element(*self)?,
        };
        element
            .namespaces()
            .find(|ns| ns.name().is_some_and(|q| q.local_part == prefix))
            .map(|ns| ns.string_value())
    }
}

fn is_id_attribute<'a, N: TreeNode<'a>>(attr: &N) -> bool {
    attr.name()
        .is_some_and(|q| q.local_part == "id" && matches!(q.prefix, None | Some("xml")))
}

/// The node itself if it is an element, otherwise its nearest element ancestor.
pub fn owner_element<'a, N: TreeNode<'a>>(node: N) -> Option<N> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.node_type() == NodeType::Element {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Attribute and namespace nodes stand in for their owner element when
/// positioning within the tree.
pub fn tree_position<'a, N: TreeNode<'a>>(node: N) -> N {
    match node.node_type() {
        NodeType::Attribute | NodeType::Namespace => node.parent().unwrap_or(node),
        _ => node,
    }
}

fn rank(node_type: NodeType) -> u8 {
    match node_type {
        NodeType::Namespace => 1,
        NodeType::Attribute => 2,
        _ => 0,
    }
}

/// Compares two nodes in document order. An element precedes its namespace
/// nodes, which precede its attributes, which precede its children.
pub fn document_order<'a, N: TreeNode<'a>>(a: &N, b: &N) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (owner_a, owner_b) = (tree_position(*a), tree_position(*b));
    owner_a.cmp(&owner_b).then_with(|| {
        rank(a.node_type())
            .cmp(&rank(b.node_type()))
            .then_with(|| a.cmp(b))
    })
}

/// Sorts into document order and removes duplicates.
pub fn sort_document_order<'a, N: TreeNode<'a>>(nodes: &mut Vec<N>) {
    nodes.sort_by(document_order);
    nodes.dedup();
}

#[cfg(test)]
mod tests {
    use super::mock::MockTree;
    use super::*;

    fn sample() -> MockTree {
        let mut b = MockTree::builder();
        b.start_element("root");
        b.namespace("h", "urn:h");
        b.attribute("id", "r");
        b.start_element("a");
        b.attribute("id", "first");
        b.attribute("kind", "x");
        b.text("one");
        b.end_element();
        b.start_element("h:b");
        b.text("two");
        b.end_element();
        b.end_element();
        b.finish()
    }

    #[test]
    fn test_attribute_sorts_after_owner_before_children() {
        let tree = sample();
        let a = tree.find_element("a").unwrap();
        let attrs: Vec<_> = a.attributes().collect();
        let text = a.children().next().unwrap();

        let mut nodes = vec![text, attrs[1], a, attrs[0], text, a];
        sort_document_order(&mut nodes);
        assert_eq!(nodes, vec![a, attrs[0], attrs[1], text]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let tree = sample();
        let mut nodes = tree.all_nodes();
        nodes.reverse();
        sort_document_order(&mut nodes);
        let once = nodes.clone();
        sort_document_order(&mut nodes);
        assert_eq!(nodes, once);
        for pair in nodes.windows(2) {
            assert_eq!(document_order(&pair[0], &pair[1]), Ordering::Less);
        }
    }

    #[test]
    fn test_namespace_nodes_precede_attributes() {
        let tree = sample();
        let root = tree.find_element("root").unwrap();
        let ns = root.namespaces().next().unwrap();
        let id = root.attributes().next().unwrap();
        assert_eq!(document_order(&ns, &id), Ordering::Less);
        assert_eq!(document_order(&root, &ns), Ordering::Less);
    }

    #[test]
    fn test_element_by_id_and_root() {
        let tree = sample();
        let a = tree.find_element("a").unwrap();
        let text = a.children().next().unwrap();
        assert_eq!(text.element_by_id("first"), Some(a));
        assert_eq!(text.element_by_id("missing"), None);
        assert_eq!(text.root().node_type(), NodeType::Root);
    }

    #[test]
    fn test_in_scope_namespace() {
        let tree = sample();
        let b = tree.find_element("b").unwrap();
        assert_eq!(b.in_scope_namespace("h").as_deref(), Some("urn:h"));
        assert_eq!(b.namespace_uri(), Some("urn:h"));
        assert_eq!(b.in_scope_namespace("xml").as_deref(), Some(XML_NAMESPACE));
        assert_eq!(b.in_scope_namespace("nope"), None);
        assert_eq!(tree.root().in_scope_namespace("h").as_deref(), Some("urn:h"));
    }
}
