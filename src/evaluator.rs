use crate::config::EvaluatorConfig;
use log::{debug, trace};
use lru::LruCache;
use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;
use xforms_xpath_engine::{
    EvaluationContext, Evaluation, Expression, FormHost, FunctionImplementation,
    FunctionLibrary, FunctionLibraryCollection, LocationPathEvaluation, NamespaceResolver,
    TreeNode, XPathError, XPathResult, XPathResultType, parse_expression,
};

/// Evaluates expression text against nodes of one document type.
///
/// Owns the function libraries, the variable bindings and a bounded cache
/// of parsed expressions. Nothing is shared between evaluators.
pub struct Evaluator<'a, N: TreeNode<'a>> {
    config: EvaluatorConfig,
    functions: FunctionLibraryCollection<'a, N>,
    variables: HashMap<String, Evaluation<'a, N>>,
    cache: RefCell<LruCache<String, Rc<Expression>>>,
}

impl<'a, N: TreeNode<'a>> Default for Evaluator<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, N: TreeNode<'a>> Evaluator<'a, N> {
    pub fn new() -> Self {
        Self::with_config(EvaluatorConfig::default())
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            functions: FunctionLibraryCollection::standard(),
            variables: HashMap::new(),
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Binds `$name` for every later evaluation.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Evaluation<'a, N>) {
        self.variables.insert(name.into(), value);
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Evaluation<'a, N>> {
        self.variables.remove(name)
    }

    pub fn functions(&self) -> &FunctionLibraryCollection<'a, N> {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionLibraryCollection<'a, N> {
        &mut self.functions
    }

    /// Adds one function, replacing any with the same expanded name.
    pub fn register(&mut self, implementation: FunctionImplementation<'a, N>) {
        self.functions.register(implementation);
    }

    pub fn add_library(&mut self, library: FunctionLibrary<'a, N>) {
        self.functions.add_library(library);
    }

    /// Parses `expression`, reusing an earlier parse of the same text.
    pub fn parse(&self, expression: &str) -> Result<Rc<Expression>, XPathError> {
        let mut cache = self.cache.borrow_mut();
        if let Some(parsed) = cache.get(expression) {
            trace!("Expression cache hit for '{}'", expression);
            return Ok(Rc::clone(parsed));
        }
        debug!("Parsing '{}' (cache miss)", expression);
        let parsed = Rc::new(parse_expression(expression)?);
        cache.put(expression.to_string(), Rc::clone(&parsed));
        Ok(parsed)
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn cached_expressions(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Evaluates `expression` with `context` as the context node and shapes
    /// the value as `result_type` asks.
    pub fn evaluate(
        &self,
        expression: &str,
        context: N,
        resolver: Option<&dyn NamespaceResolver>,
        result_type: XPathResultType,
    ) -> Result<XPathResult<'a, N>, XPathError> {
        self.run(expression, context, resolver, result_type, None)
    }

    /// As [`evaluate`](Self::evaluate), with form-engine services for
    /// `jr:itext()` and `instance()`.
    pub fn evaluate_with_host(
        &self,
        expression: &str,
        context: N,
        resolver: Option<&dyn NamespaceResolver>,
        result_type: XPathResultType,
        host: &dyn FormHost<'a, N>,
    ) -> Result<XPathResult<'a, N>, XPathError> {
        self.run(expression, context, resolver, result_type, Some(host))
    }

    /// The raw evaluation, before any result-type shaping.
    pub fn evaluate_value(
        &self,
        expression: &str,
        context: N,
        resolver: Option<&dyn NamespaceResolver>,
    ) -> Result<Evaluation<'a, N>, XPathError> {
        self.value(expression, context, resolver, None)
    }

    fn run(
        &self,
        expression: &str,
        context: N,
        resolver: Option<&dyn NamespaceResolver>,
        result_type: XPathResultType,
        host: Option<&dyn FormHost<'a, N>>,
    ) -> Result<XPathResult<'a, N>, XPathError> {
        debug!("Evaluating '{}' as {}", expression, result_type);
        let value = self.value(expression, context, resolver, host)?;
        XPathResult::from_evaluation(value, result_type)
    }

    fn value(
        &self,
        expression: &str,
        context: N,
        resolver: Option<&dyn NamespaceResolver>,
        host: Option<&dyn FormHost<'a, N>>,
    ) -> Result<Evaluation<'a, N>, XPathError> {
        let parsed = self.parse(expression)?;
        let mut e_ctx = EvaluationContext::new(context, &self.functions, &self.variables)
            .with_time_zone(self.config.time_zone)
            .with_strict(self.config.strict);
        if let Some(resolver) = resolver {
            e_ctx = e_ctx.with_namespaces(resolver);
        }
        if let Some(host) = host {
            e_ctx = e_ctx.with_host(host);
        }
        let scope = Rc::new(LocationPathEvaluation::single(context, None));
        xforms_xpath_engine::evaluate(&parsed, &e_ctx, &scope)
    }
}

/// One-shot evaluation with the default configuration.
pub fn evaluate<'a, N: TreeNode<'a>>(
    expression: &str,
    context: N,
    resolver: Option<&dyn NamespaceResolver>,
    result_type: XPathResultType,
) -> Result<XPathResult<'a, N>, XPathError> {
    Evaluator::new().evaluate(expression, context, resolver, result_type)
}
