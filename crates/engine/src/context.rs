//! Per-call evaluation state and the embedder's capability hooks.

use crate::error::XPathError;
use crate::functions::FunctionLibraryCollection;
use crate::namespaces::{NamespaceResolver, standard_namespace};
use crate::tree::TreeNode;
use crate::value::Evaluation;
use std::collections::HashMap;
use xforms_xpath_datetime::TimeZone;

/// Form-engine services the XForms functions delegate to.
pub trait FormHost<'a, N: TreeNode<'a>> {
    /// The translation for `id` in the active language. `context` is the
    /// node the expression is evaluated against.
    fn itext(&self, _id: &str, _context: N) -> Option<String> {
        None
    }

    /// The root node of a secondary instance.
    fn instance(&self, _id: &str) -> Option<N> {
        None
    }
}

/// Everything one top-level evaluation needs. Immutable once built.
/// `'a` is the lifetime of the document, `'d` that of the borrowed state.
pub struct EvaluationContext<'a, 'd, N: TreeNode<'a>> {
    pub context_node: N,
    pub root_node: N,
    pub namespaces: Option<&'d dyn NamespaceResolver>,
    pub functions: &'d FunctionLibraryCollection<'a, N>,
    pub time_zone: TimeZone,
    pub variables: &'d HashMap<String, Evaluation<'a, N>>,
    pub host: Option<&'d dyn FormHost<'a, N>>,
    /// If true, unknown variables are an error instead of `""`.
    pub strict: bool,
}

impl<'a, 'd, N: TreeNode<'a>> EvaluationContext<'a, 'd, N> {
    pub fn new(
        context_node: N,
        functions: &'d FunctionLibraryCollection<'a, N>,
        variables: &'d HashMap<String, Evaluation<'a, N>>,
    ) -> Self {
        Self {
            context_node,
            root_node: context_node.root(),
            namespaces: None,
            functions,
            time_zone: TimeZone::default(),
            variables,
            host: None,
            strict: false,
        }
    }

    pub fn with_namespaces(mut self, resolver: &'d dyn NamespaceResolver) -> Self {
        self.namespaces = Some(resolver);
        self
    }

    pub fn with_host(mut self, host: &'d dyn FormHost<'a, N>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_time_zone(mut self, time_zone: TimeZone) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Resolves `prefix` through the caller's resolver, then the
    /// declarations in scope at `node`, then the built-in prefixes.
    pub fn resolve_prefix(&self, prefix: &str, node: Option<N>) -> Result<String, XPathError> {
        if let Some(uri) = self
            .namespaces
            .and_then(|resolver| resolver.lookup_namespace_uri(Some(prefix)))
        {
            return Ok(uri);
        }
        if let Some(uri) = node.and_then(|n| n.in_scope_namespace(prefix)) {
            return Ok(uri);
        }
        standard_namespace(prefix)
            .map(str::to_string)
            .ok_or_else(|| XPathError::UnresolvedPrefix {
                prefix: prefix.to_string(),
            })
    }

    /// The namespace unprefixed element name tests match. Only a caller's
    /// resolver can set one; otherwise it is the null namespace.
    pub fn default_element_namespace(&self) -> Option<String> {
        self.namespaces
            .and_then(|resolver| resolver.lookup_namespace_uri(None))
            .filter(|uri| !uri.is_empty())
    }
}
