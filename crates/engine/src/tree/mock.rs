//! An in-memory tree for tests, here and in downstream crates.
//!
//! Node ids are handed out in creation order, which the builder keeps equal
//! to document order.

use super::{NodeType, QName, TreeNode};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
struct MockNodeData {
    node_type: NodeType,
    prefix: Option<String>,
    local: Option<String>,
    namespace_uri: Option<String>,
    value: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attributes: Vec<usize>,
    namespaces: Vec<usize>,
}

impl MockNodeData {
    fn new(node_type: NodeType, parent: Option<usize>) -> Self {
        Self {
            node_type,
            prefix: None,
            local: None,
            namespace_uri: None,
            value: String::new(),
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockTree {
    nodes: Vec<MockNodeData>,
}

#[derive(Debug)]
pub struct MockTreeBuilder {
    nodes: Vec<MockNodeData>,
    open: Vec<usize>,
}

fn split_qname(name: &str) -> (Option<String>, String) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, name.to_string()),
    }
}

impl MockTreeBuilder {
    fn current(&self) -> usize {
        self.open.last().copied().unwrap_or(0)
    }

    fn push(&mut self, data: MockNodeData) -> usize {
        let id = self.nodes.len();
        self.nodes.push(data);
        id
    }

    fn push_child(&mut self, mut data: MockNodeData) -> usize {
        let parent = self.current();
        data.parent = Some(parent);
        let id = self.push(data);
        self.nodes[parent].children.push(id);
        id
    }

    /// Opens an element. A `prefix:local` name resolves its namespace
    /// against the declarations in scope when queried.
    pub fn start_element(&mut self, name: &str) -> usize {
        let (prefix, local) = split_qname(name);
        let mut data = MockNodeData::new(NodeType::Element, None);
        data.prefix = prefix;
        data.local = Some(local);
        let id = self.push_child(data);
        self.open.push(id);
        id
    }

    /// Opens an element with an explicit namespace URI.
    pub fn start_element_ns(&mut self, prefix: Option<&str>, local: &str, uri: &str) -> usize {
        let id = self.start_element(local);
        self.nodes[id].prefix = prefix.map(str::to_string);
        self.nodes[id].namespace_uri = Some(uri.to_string());
        id
    }

    pub fn end_element(&mut self) {
        self.open.pop();
    }

    pub fn attribute(&mut self, name: &str, value: &str) -> usize {
        let owner = self.current();
        let (prefix, local) = split_qname(name);
        let mut data = MockNodeData::new(NodeType::Attribute, Some(owner));
        data.prefix = prefix;
        data.local = Some(local);
        data.value = value.to_string();
        let id = self.push(data);
        self.nodes[owner].attributes.push(id);
        id
    }

    /// Declares `prefix` (empty for the default namespace) on the open element.
    pub fn namespace(&mut self, prefix: &str, uri: &str) -> usize {
        let owner = self.current();
        let mut data = MockNodeData::new(NodeType::Namespace, Some(owner));
        data.local = Some(prefix.to_string());
        data.value = uri.to_string();
        let id = self.push(data);
        self.nodes[owner].namespaces.push(id);
        id
    }

    pub fn text(&mut self, content: &str) -> usize {
        let mut data = MockNodeData::new(NodeType::Text, None);
        data.value = content.to_string();
        self.push_child(data)
    }

    pub fn comment(&mut self, content: &str) -> usize {
        let mut data = MockNodeData::new(NodeType::Comment, None);
        data.value = content.to_string();
        self.push_child(data)
    }

    pub fn processing_instruction(&mut self, target: &str, content: &str) -> usize {
        let mut data = MockNodeData::new(NodeType::ProcessingInstruction, None);
        data.local = Some(target.to_string());
        data.value = content.to_string();
        self.push_child(data)
    }

    /// Convenience for `<name>text</name>`.
    pub fn leaf(&mut self, name: &str, content: &str) -> usize {
        let id = self.start_element(name);
        if !content.is_empty() {
            self.text(content);
        }
        self.end_element();
        id
    }

    pub fn finish(self) -> MockTree {
        MockTree { nodes: self.nodes }
    }
}

impl MockTree {
    pub fn builder() -> MockTreeBuilder {
        MockTreeBuilder {
            nodes: vec![MockNodeData::new(NodeType::Root, None)],
            open: Vec::new(),
        }
    }

    pub fn root(&self) -> MockNode<'_> {
        self.node(0)
    }

    pub fn node(&self, id: usize) -> MockNode<'_> {
        MockNode { id, tree: self }
    }

    /// Every node, in document order.
    pub fn all_nodes(&self) -> Vec<MockNode<'_>> {
        (0..self.nodes.len()).map(|id| self.node(id)).collect()
    }

    /// The first element in document order with the given local name.
    pub fn find_element(&self, local: &str) -> Option<MockNode<'_>> {
        self.nodes
            .iter()
            .position(|n| n.node_type == NodeType::Element && n.local.as_deref() == Some(local))
            .map(|id| self.node(id))
    }

    fn data(&self, id: usize) -> &MockNodeData {
        &self.nodes[id]
    }

    fn lookup(&self, element: usize, prefix: &str) -> Option<&str> {
        let mut current = Some(element);
        while let Some(id) = current {
            let data = self.data(id);
            for &ns in &data.namespaces {
                if self.data(ns).local.as_deref() == Some(prefix) {
                    return Some(self.data(ns).value.as_str());
                }
            }
            current = data.parent;
        }
        None
    }
}

/// A node handle that navigates through its tree.
#[derive(Debug, Clone, Copy)]
pub struct MockNode<'a> {
    pub id: usize,
    pub tree: &'a MockTree,
}

impl PartialEq for MockNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for MockNode<'_> {}

impl PartialOrd for MockNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for MockNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for MockNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<'a> MockNode<'a> {
    fn data(&self) -> &'a MockNodeData {
        self.tree.data(self.id)
    }

    fn ids(&self, ids: &'a [usize]) -> Box<dyn Iterator<Item = Self> + 'a> {
        let tree = self.tree;
        Box::new(ids.iter().map(move |&id| MockNode { id, tree }))
    }
}

impl<'a> TreeNode<'a> for MockNode<'a> {
    fn node_type(&self) -> NodeType {
        self.data().node_type
    }

    fn name(&self) -> Option<QName<'a>> {
        let data = self.data();
        data.local.as_deref().map(|local_part| QName {
            prefix: data.prefix.as_deref(),
            local_part,
        })
    }

    fn namespace_uri(&self) -> Option<&'a str> {
        let data = self.data();
        if let Some(uri) = data.namespace_uri.as_deref() {
            return Some(uri);
        }
        let uri = match (data.node_type, data.prefix.as_deref()) {
            (NodeType::Element, prefix) => self.tree.lookup(self.id, prefix.unwrap_or("")),
            (NodeType::Attribute, Some("xml")) => Some(super::XML_NAMESPACE),
            (NodeType::Attribute, Some(prefix)) => {
                data.parent.and_then(|owner| self.tree.lookup(owner, prefix))
            }
            _ => None,
        };
        uri.filter(|uri| !uri.is_empty())
    }

    fn string_value(&self) -> String {
        match self.node_type() {
            NodeType::Root | NodeType::Element => {
                let mut out = String::new();
                let mut stack = vec![self.id];
                while let Some(id) = stack.pop() {
                    let data = self.tree.data(id);
                    if data.node_type == NodeType::Text {
                        out.push_str(&data.value);
                    }
                    stack.extend(data.children.iter().rev());
                }
                out
            }
            _ => self.data().value.clone(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        self.ids(&self.data().attributes)
    }

    fn namespaces(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        if self.node_type() != NodeType::Element {
            return Box::new(std::iter::empty());
        }
        let tree = self.tree;
        let mut seen: Vec<&'a str> = Vec::new();
        let mut found = Vec::new();
        let mut current = Some(self.id);
        while let Some(id) = current {
            let data = tree.data(id);
            for &ns in &data.namespaces {
                let prefix = tree.data(ns).local.as_deref().unwrap_or("");
                if !seen.contains(&prefix) {
                    seen.push(prefix);
                    found.push(MockNode { id: ns, tree });
                }
            }
            current = data.parent;
        }
        found.sort();
        Box::new(found.into_iter())
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        self.ids(&self.data().children)
    }

    fn parent(&self) -> Option<Self> {
        self.data().parent.map(|id| MockNode {
            id,
            tree: self.tree,
        })
    }
}
