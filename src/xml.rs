//! A [`TreeNode`] over documents parsed by `roxmltree`.

use roxmltree::Node;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use xforms_xpath_engine::tree::XML_NAMESPACE;
use xforms_xpath_engine::{NodeType, QName, TreeNode};

/// Owns a parsed document. Nodes borrow from it.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(text)?;
        Ok(Self { doc })
    }

    pub fn root_node(&self) -> XmlNode<'_, 'input> {
        XmlNode::Tree(self.doc.root())
    }

    /// The outermost element.
    pub fn document_element(&self) -> XmlNode<'_, 'input> {
        XmlNode::Tree(self.doc.root_element())
    }
}

/// A node of the document. roxmltree keeps attributes and namespace
/// declarations as data on their element, so those are addressed by owner
/// and index.
#[derive(Debug, Clone, Copy)]
pub enum XmlNode<'a, 'input> {
    /// Root, element, text, comment or processing instruction.
    Tree(Node<'a, 'input>),
    Attribute { owner: Node<'a, 'input>, index: usize },
    /// One of the namespaces in scope at `owner`.
    Namespace { owner: Node<'a, 'input>, index: usize },
}

impl<'a, 'input> XmlNode<'a, 'input> {
    pub fn new(node: Node<'a, 'input>) -> Self {
        XmlNode::Tree(node)
    }

    pub fn inner(&self) -> Option<Node<'a, 'input>> {
        match self {
            XmlNode::Tree(node) => Some(*node),
            _ => None,
        }
    }

    /// Owner id, kind rank and index. Sorting by this key is document order
    /// among nodes of one document.
    fn key(&self) -> (u32, u8, usize) {
        match self {
            XmlNode::Tree(node) => (node.id().get(), 0, 0),
            XmlNode::Namespace { owner, index } => (owner.id().get(), 1, *index),
            XmlNode::Attribute { owner, index } => (owner.id().get(), 2, *index),
        }
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for XmlNode<'_, '_> {}

impl PartialOrd for XmlNode<'_, '_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for XmlNode<'_, '_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for XmlNode<'_, '_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl<'a> TreeNode<'a> for XmlNode<'a, 'a> {
    fn node_type(&self) -> NodeType {
        match self {
            XmlNode::Tree(node) if node.is_root() => NodeType::Root,
            XmlNode::Tree(node) if node.is_text() => NodeType::Text,
            XmlNode::Tree(node) if node.is_comment() => NodeType::Comment,
            XmlNode::Tree(node) if node.is_pi() => NodeType::ProcessingInstruction,
            XmlNode::Tree(_) => NodeType::Element,
            XmlNode::Attribute { .. } => NodeType::Attribute,
            XmlNode::Namespace { .. } => NodeType::Namespace,
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        match self {
            XmlNode::Tree(node) if node.is_element() => {
                let tag = node.tag_name();
                Some(QName {
                    prefix: tag.namespace().and_then(|uri| node.lookup_prefix(uri)),
                    local_part: tag.name(),
                })
            }
            XmlNode::Tree(node) => node.pi().map(|pi| QName {
                prefix: None,
                local_part: pi.target,
            }),
            XmlNode::Attribute { owner, index } => owner.attributes().nth(*index).map(|attr| {
                let prefix = match attr.namespace() {
                    Some(XML_NAMESPACE) => Some("xml"),
                    Some(uri) => owner.lookup_prefix(uri),
                    None => None,
                };
                QName {
                    prefix,
                    local_part: attr.name(),
                }
            }),
            XmlNode::Namespace { owner, index } => owner.namespaces().nth(*index).map(|ns| QName {
                prefix: None,
                local_part: ns.name().unwrap_or(""),
            }),
        }
    }

    fn namespace_uri(&self) -> Option<&'a str> {
        match self {
            XmlNode::Tree(node) if node.is_element() => node.tag_name().namespace(),
            XmlNode::Attribute { owner, index } => {
                owner.attributes().nth(*index).and_then(|attr| attr.namespace())
            }
            _ => None,
        }
    }

    fn string_value(&self) -> String {
        match self {
            XmlNode::Tree(node) if node.is_element() || node.is_root() => node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect(),
            XmlNode::Tree(node) if node.is_pi() => node
                .pi()
                .and_then(|pi| pi.value)
                .unwrap_or_default()
                .to_string(),
            XmlNode::Tree(node) => node.text().unwrap_or_default().to_string(),
            XmlNode::Attribute { owner, index } => owner
                .attributes()
                .nth(*index)
                .map(|attr| attr.value().to_string())
                .unwrap_or_default(),
            XmlNode::Namespace { owner, index } => owner
                .namespaces()
                .nth(*index)
                .map(|ns| ns.uri().to_string())
                .unwrap_or_default(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Tree(node) if node.is_element() => {
                let owner = *node;
                let count = node.attributes().len();
                Box::new((0..count).map(move |index| XmlNode::Attribute { owner, index }))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    fn namespaces(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Tree(node) if node.is_element() => {
                let owner = *node;
                let count = node.namespaces().count();
                Box::new((0..count).map(move |index| XmlNode::Namespace { owner, index }))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Tree(node) => Box::new(node.children().map(XmlNode::Tree)),
            _ => Box::new(std::iter::empty()),
        }
    }

    fn parent(&self) -> Option<Self> {
        match self {
            XmlNode::Tree(node) => node.parent().map(XmlNode::Tree),
            XmlNode::Attribute { owner, .. } | XmlNode::Namespace { owner, .. } => {
                Some(XmlNode::Tree(*owner))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xforms_xpath_engine::tree::sort_document_order;

    fn child<'a>(node: XmlNode<'a, 'a>, local: &str) -> XmlNode<'a, 'a> {
        node.children()
            .find(|n| n.name().is_some_and(|q| q.local_part == local))
            .unwrap()
    }

    #[test]
    fn test_attributes() {
        let xml = r#"<data><field ref="age" required="true()">42</field></data>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let field = child(doc.document_element(), "field");

        let attrs: Vec<_> = field.attributes().collect();
        let names: Vec<_> = attrs
            .iter()
            .filter_map(|a| a.name().map(|q| q.local_part))
            .collect();
        assert_eq!(names, vec!["ref", "required"]);
        assert!(attrs.iter().all(|a| a.node_type() == NodeType::Attribute));
        assert_eq!(attrs[1].string_value(), "true()");
        assert!(attrs.iter().all(|a| a.parent() == Some(field)));
        assert!(attrs[0].children().next().is_none());
        assert_eq!(field.string_value(), "42");
    }

    #[test]
    fn test_prefixes_and_namespace_nodes() {
        let xml = r#"<h:html xmlns:h="urn:h" xmlns:jr="urn:jr"><h:body jr:lang="en"/></h:html>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let html = doc.document_element();
        let body = child(html, "body");

        let name = body.name().unwrap();
        assert_eq!(name.prefix, Some("h"));
        assert_eq!(body.namespace_uri(), Some("urn:h"));
        let lang = body.attributes().next().unwrap();
        assert_eq!(lang.name().unwrap().to_string(), "jr:lang");
        assert_eq!(lang.namespace_uri(), Some("urn:jr"));

        let h = body
            .namespaces()
            .find(|ns| ns.name().is_some_and(|q| q.local_part == "h"))
            .unwrap();
        assert_eq!(h.node_type(), NodeType::Namespace);
        assert_eq!(h.string_value(), "urn:h");
        assert_eq!(h.parent(), Some(body));
        assert_eq!(body.in_scope_namespace("jr").as_deref(), Some("urn:jr"));
    }

    #[test]
    fn test_document_order() {
        let xml = r#"<root a="1"><x/><!--c--><?pi data?></root>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let root = doc.document_element();
        let attr = root.attributes().next().unwrap();
        let kids: Vec<_> = root.children().collect();
        assert_eq!(kids[1].node_type(), NodeType::Comment);
        assert_eq!(kids[2].name().unwrap().local_part, "pi");
        assert_eq!(kids[2].string_value(), "data");

        let mut nodes = vec![kids[2], attr, kids[0], root, kids[1]];
        sort_document_order(&mut nodes);
        assert_eq!(nodes, vec![root, attr, kids[0], kids[1], kids[2]]);
        assert_eq!(doc.root_node().node_type(), NodeType::Root);
    }
}
