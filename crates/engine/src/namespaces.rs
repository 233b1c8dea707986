//! Prefix to namespace URI resolution.

use crate::tree::XML_NAMESPACE;
use std::collections::HashMap;

pub const FN_NAMESPACE: &str = "http://www.w3.org/2005/xpath-functions";
pub const XFORMS_NAMESPACE: &str = "http://www.w3.org/2002/xforms";
pub const JAVAROSA_NAMESPACE: &str = "http://openrosa.org/javarosa";

/// Prefixes that resolve even when neither the caller nor the document
/// binds them.
pub const STANDARD_PREFIXES: [(&str, &str); 4] = [
    ("fn", FN_NAMESPACE),
    ("xf", XFORMS_NAMESPACE),
    ("jr", JAVAROSA_NAMESPACE),
    ("xml", XML_NAMESPACE),
];

pub fn standard_namespace(prefix: &str) -> Option<&'static str> {
    STANDARD_PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| *uri)
}

/// Maps a prefix to a namespace URI, as DOM's `XPathNSResolver` does.
/// `None` asks for the default namespace.
pub trait NamespaceResolver {
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String>;
}

impl NamespaceResolver for HashMap<String, String> {
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        self.get(prefix.unwrap_or("")).cloned()
    }
}

impl NamespaceResolver for HashMap<&str, &str> {
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        self.get(prefix.unwrap_or("")).map(|uri| uri.to_string())
    }
}

/// Adapts a closure into a resolver.
pub struct FnResolver<F>(pub F);

impl<F> NamespaceResolver for FnResolver<F>
where
    F: Fn(Option<&str>) -> Option<String>,
{
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        (self.0)(prefix)
    }
}

/// Splits `prefix:local` into its parts.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
