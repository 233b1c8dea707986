//! Function registration and dispatch.
//!
//! Every function is registered with a namespace, a local name, a
//! [`Signature`] and a body. Bodies receive their arguments unevaluated
//! through a [`FunctionCall`] handle and pull the values they need, which
//! lets `if()` and friends skip branches they do not take.

use crate::ast::Expression;
use crate::context::EvaluationContext;
use crate::engine::{evaluate, expect_node_set};
use crate::error::XPathError;
use crate::namespaces::{FN_NAMESPACE, XFORMS_NAMESPACE, split_qname};
use crate::nodeset::LocationPathEvaluation;
use crate::tree::TreeNode;
use crate::value::Evaluation;
use log::trace;
use std::collections::HashMap;
use std::rc::Rc;

pub mod dates;
pub mod javarosa;
pub mod xforms;
pub mod xpath;

/// What a parameter is coerced to by [`FunctionCall::coerced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Any,
    String,
    Number,
    Boolean,
    NodeSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Required,
    Optional,
    /// Zero or more further arguments. Only valid as the last parameter.
    Variadic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub hint: TypeHint,
    pub arity: Arity,
}

impl Parameter {
    pub fn required(hint: TypeHint) -> Self {
        Self {
            hint,
            arity: Arity::Required,
        }
    }

    pub fn optional(hint: TypeHint) -> Self {
        Self {
            hint,
            arity: Arity::Optional,
        }
    }

    pub fn variadic(hint: TypeHint) -> Self {
        Self {
            hint,
            arity: Arity::Variadic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
}

impl Signature {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self { parameters }
    }

    pub fn min_arity(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.arity == Arity::Required)
            .count()
    }

    /// `None` when the last parameter is variadic.
    pub fn max_arity(&self) -> Option<usize> {
        match self.parameters.last() {
            Some(p) if p.arity == Arity::Variadic => None,
            _ => Some(self.parameters.len()),
        }
    }

    /// The hint for argument `index`, repeating a trailing variadic one.
    pub fn hint(&self, index: usize) -> TypeHint {
        match self.parameters.get(index).or(self.parameters.last()) {
            Some(p) if index < self.parameters.len() || p.arity == Arity::Variadic => p.hint,
            _ => TypeHint::Any,
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_arity() && self.max_arity().is_none_or(|max| count <= max)
    }

    fn describe(&self) -> String {
        let min = self.min_arity();
        match self.max_arity() {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        }
    }
}

/// The arguments and focus of one call, handed to a function body.
pub struct FunctionCall<'c, 'a, 'd, N: TreeNode<'a>> {
    pub name: &'c str,
    pub e_ctx: &'c EvaluationContext<'a, 'd, N>,
    pub scope: &'c Rc<LocationPathEvaluation<'a, N>>,
    pub args: &'c [Expression],
    signature: &'c Signature,
}

impl<'c, 'a, 'd, N: TreeNode<'a>> FunctionCall<'c, 'a, 'd, N> {
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Evaluates argument `index` in the caller's focus.
    pub fn arg(&self, index: usize) -> Result<Evaluation<'a, N>, XPathError> {
        let expr = self.args.get(index).ok_or_else(|| XPathError::Arity {
            function: self.name.to_string(),
            expected: self.signature.describe(),
            actual: self.args.len(),
        })?;
        evaluate(expr, self.e_ctx, self.scope)
    }

    pub fn arg_opt(&self, index: usize) -> Result<Option<Evaluation<'a, N>>, XPathError> {
        if index < self.args.len() {
            self.arg(index).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Argument `index` converted as its parameter's [`TypeHint`] says.
    pub fn coerced(&self, index: usize) -> Result<Evaluation<'a, N>, XPathError> {
        let value = self.arg(index)?;
        Ok(match self.signature.hint(index) {
            TypeHint::Any => value,
            TypeHint::String => Evaluation::String(value.to_string()),
            TypeHint::Number => Evaluation::Number(value.to_number()),
            TypeHint::Boolean => Evaluation::Boolean(value.to_boolean()),
            TypeHint::NodeSet => Evaluation::Node(expect_node_set(value)?),
        })
    }

    pub fn string(&self, index: usize) -> Result<String, XPathError> {
        self.arg(index).map(|v| v.to_string())
    }

    pub fn number(&self, index: usize) -> Result<f64, XPathError> {
        self.arg(index).map(|v| v.to_number())
    }

    pub fn boolean(&self, index: usize) -> Result<bool, XPathError> {
        self.arg(index).map(|v| v.to_boolean())
    }

    pub fn node_set(&self, index: usize) -> Result<LocationPathEvaluation<'a, N>, XPathError> {
        expect_node_set(self.arg(index)?)
    }

    /// Argument `index` as a string, or the context node's string value when
    /// the argument is omitted.
    pub fn string_or_context(&self, index: usize) -> Result<String, XPathError> {
        match self.arg_opt(index)? {
            Some(value) => Ok(value.to_string()),
            None => self.context_node().map(|n| n.string_value()),
        }
    }

    /// The first node of node-set argument `index`, or the context node when
    /// the argument is omitted.
    pub fn node_or_context(&self, index: usize) -> Result<Option<N>, XPathError> {
        if index < self.args.len() {
            Ok(self.node_set(index)?.first())
        } else {
            self.context_node().map(Some)
        }
    }

    pub fn context_node(&self) -> Result<N, XPathError> {
        self.scope.context_node().ok_or(XPathError::NoContextNode)
    }

    pub fn invalid(&self, message: impl Into<String>) -> XPathError {
        XPathError::function(self.name, message)
    }
}

pub type FunctionBody<'a, N> =
    fn(&FunctionCall<'_, 'a, '_, N>) -> Result<Evaluation<'a, N>, XPathError>;

pub struct FunctionImplementation<'a, N: TreeNode<'a>> {
    pub namespace: String,
    pub local_name: String,
    pub signature: Signature,
    pub body: FunctionBody<'a, N>,
}

impl<'a, N: TreeNode<'a>> Clone for FunctionImplementation<'a, N> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            local_name: self.local_name.clone(),
            signature: self.signature.clone(),
            body: self.body,
        }
    }
}

impl<'a, N: TreeNode<'a>> FunctionImplementation<'a, N> {
    pub fn new(
        namespace: impl Into<String>,
        local_name: impl Into<String>,
        signature: Signature,
        body: FunctionBody<'a, N>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
            signature,
            body,
        }
    }

    /// Checks the argument count, then runs the body.
    pub fn call(
        &self,
        name: &str,
        args: &[Expression],
        e_ctx: &EvaluationContext<'a, '_, N>,
        scope: &Rc<LocationPathEvaluation<'a, N>>,
    ) -> Result<Evaluation<'a, N>, XPathError> {
        if !self.signature.accepts(args.len()) {
            return Err(XPathError::Arity {
                function: name.to_string(),
                expected: self.signature.describe(),
                actual: args.len(),
            });
        }
        let call = FunctionCall {
            name,
            e_ctx,
            scope,
            args,
            signature: &self.signature,
        };
        (self.body)(&call)
    }
}

/// The functions of one namespace.
pub struct FunctionLibrary<'a, N: TreeNode<'a>> {
    pub namespace: String,
    functions: HashMap<String, FunctionImplementation<'a, N>>,
}

impl<'a, N: TreeNode<'a>> FunctionLibrary<'a, N> {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            functions: HashMap::new(),
        }
    }

    /// Registers `body` under `local_name`, replacing any earlier entry.
    pub fn register(&mut self, local_name: &str, signature: Signature, body: FunctionBody<'a, N>) {
        let implementation =
            FunctionImplementation::new(self.namespace.clone(), local_name, signature, body);
        self.functions.insert(local_name.to_string(), implementation);
    }

    pub fn get(&self, local_name: &str) -> Option<&FunctionImplementation<'a, N>> {
        self.functions.get(local_name)
    }

    pub fn contains(&self, local_name: &str) -> bool {
        self.functions.contains_key(local_name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// All libraries known to an evaluator, plus the order unprefixed names are
/// looked up in.
pub struct FunctionLibraryCollection<'a, N: TreeNode<'a>> {
    libraries: HashMap<String, FunctionLibrary<'a, N>>,
    defaults: Vec<String>,
}

impl<'a, N: TreeNode<'a>> Default for FunctionLibraryCollection<'a, N> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a, N: TreeNode<'a>> FunctionLibraryCollection<'a, N> {
    pub fn empty() -> Self {
        Self {
            libraries: HashMap::new(),
            defaults: Vec::new(),
        }
    }

    /// The XPath core, XForms and JavaRosa libraries. Unprefixed names try
    /// XForms first, so its `concat`, `round` and `position` win.
    pub fn standard() -> Self {
        let mut collection = Self::empty();
        collection.add_library(xpath::library());
        collection.add_library(xforms::library());
        collection.add_library(javarosa::library());
        collection.set_default_order(&[XFORMS_NAMESPACE, FN_NAMESPACE]);
        collection
    }

    /// Adds or replaces the library for its namespace.
    pub fn add_library(&mut self, library: FunctionLibrary<'a, N>) {
        self.libraries.insert(library.namespace.clone(), library);
    }

    pub fn set_default_order(&mut self, namespaces: &[&str]) {
        self.defaults = namespaces.iter().map(|ns| ns.to_string()).collect();
    }

    /// Registers one function, creating its namespace's library on demand.
    pub fn register(&mut self, implementation: FunctionImplementation<'a, N>) {
        self.libraries
            .entry(implementation.namespace.clone())
            .or_insert_with(|| FunctionLibrary::new(implementation.namespace.clone()))
            .functions
            .insert(implementation.local_name.clone(), implementation);
    }

    pub fn library(&self, namespace: &str) -> Option<&FunctionLibrary<'a, N>> {
        self.libraries.get(namespace)
    }

    /// Finds the implementation `name` refers to. A prefix is resolved
    /// against `node`'s in-scope declarations and the caller's resolver.
    pub fn get_implementation(
        &self,
        name: &str,
        e_ctx: &EvaluationContext<'a, '_, N>,
        node: Option<N>,
    ) -> Result<&FunctionImplementation<'a, N>, XPathError> {
        let unknown = || XPathError::UnknownFunction {
            name: name.to_string(),
        };
        match split_qname(name) {
            (Some(prefix), local) => {
                let namespace = e_ctx.resolve_prefix(prefix, node)?;
                self.libraries
                    .get(&namespace)
                    .and_then(|library| library.get(local))
                    .ok_or_else(unknown)
            }
            (None, local) => self
                .defaults
                .iter()
                .filter_map(|namespace| self.libraries.get(namespace))
                .find_map(|library| library.get(local))
                .ok_or_else(unknown),
        }
    }

    pub fn call(
        &self,
        name: &str,
        args: &[Expression],
        e_ctx: &EvaluationContext<'a, '_, N>,
        scope: &Rc<LocationPathEvaluation<'a, N>>,
    ) -> Result<Evaluation<'a, N>, XPathError> {
        let implementation = self.get_implementation(name, e_ctx, scope.context_node())?;
        trace!(
            "Dispatching {}() to {{{}}}{}",
            name, implementation.namespace, implementation.local_name
        );
        implementation.call(name, args, e_ctx, scope)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::eval;
    use super::*;
    use crate::namespaces::JAVAROSA_NAMESPACE;
    use crate::tree::mock::{MockNode, MockTree};

    fn doc() -> MockTree {
        let mut b = MockTree::builder();
        b.start_element("root");
        b.namespace("f", FN_NAMESPACE);
        b.leaf("a", "x");
        b.end_element();
        b.finish()
    }

    fn shout<'a>(call: &FunctionCall<'_, 'a, '_, MockNode<'a>>) -> Result<Evaluation<'a, MockNode<'a>>, XPathError> {
        Ok(Evaluation::String(call.coerced(0)?.to_string().to_uppercase()))
    }

    #[test]
    fn test_signature_arity() {
        let sig = Signature::new(vec![
            Parameter::required(TypeHint::String),
            Parameter::optional(TypeHint::Number),
        ]);
        assert_eq!((sig.min_arity(), sig.max_arity()), (1, Some(2)));
        assert_eq!(sig.describe(), "1 to 2");
        assert!(!sig.accepts(0) && sig.accepts(2) && !sig.accepts(3));

        let variadic = Signature::new(vec![
            Parameter::required(TypeHint::String),
            Parameter::required(TypeHint::String),
            Parameter::variadic(TypeHint::String),
        ]);
        assert_eq!(variadic.describe(), "at least 2");
        assert_eq!(variadic.hint(7), TypeHint::String);
        assert!(variadic.accepts(9));
    }

    #[test]
    fn test_arity_checked_before_body() {
        let tree = doc();
        let err = eval(tree.root(), "substring('abc')").unwrap_err();
        assert_eq!(
            err,
            XPathError::Arity {
                function: "substring".into(),
                expected: "2 to 3".into(),
                actual: 1
            }
        );
        let err = eval(tree.root(), "true(1)").unwrap_err();
        assert!(matches!(err, XPathError::Arity { ref expected, .. } if expected == "0"));
    }

    #[test]
    fn test_unknown_functions() {
        let tree = doc();
        let err = eval(tree.root(), "frobnicate()").unwrap_err();
        assert_eq!(err, XPathError::UnknownFunction { name: "frobnicate".into() });
        let err = eval(tree.root(), "jr:count(/root)").unwrap_err();
        assert_eq!(err, XPathError::UnknownFunction { name: "jr:count".into() });
        let err = eval(tree.root(), "zz:count(/root)").unwrap_err();
        assert!(matches!(err, XPathError::UnresolvedPrefix { .. }));
    }

    #[test]
    fn test_default_order_prefers_xforms() {
        let tree = doc();
        let root = tree.find_element("root").unwrap();
        // The XForms concat accepts a single argument, the core one needs two.
        assert_eq!(eval(root, "concat(a)").unwrap().to_string(), "x");
        assert!(matches!(
            eval(root, "fn:concat('a')").unwrap_err(),
            XPathError::Arity { .. }
        ));
        // A document-declared prefix reaches the same library.
        assert_eq!(eval(root, "f:concat('a', 'b')").unwrap().to_string(), "ab");
    }

    #[test]
    fn test_user_registration() {
        let tree = doc();
        let root = tree.find_element("root").unwrap();
        let mut functions = FunctionLibraryCollection::standard();
        functions.register(FunctionImplementation::new(
            JAVAROSA_NAMESPACE,
            "shout",
            Signature::new(vec![Parameter::required(TypeHint::String)]),
            shout,
        ));
        let variables = HashMap::new();
        let e_ctx = EvaluationContext::new(root, &functions, &variables);
        let scope = Rc::new(LocationPathEvaluation::single(root, None));
        let expr = crate::parser::parse_expression("jr:shout(a)").unwrap();
        assert_eq!(evaluate(&expr, &e_ctx, &scope).unwrap().to_string(), "X");
        assert!(functions.library(JAVAROSA_NAMESPACE).unwrap().contains("itext"));
    }
}
