//! Walks a parsed expression against a generic `TreeNode`.

use crate::ast::{Axis, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator};
use crate::axes::axis_iter;
use crate::context::EvaluationContext;
use crate::error::XPathError;
use crate::namespaces::split_qname;
use crate::nodeset::LocationPathEvaluation;
use crate::operators;
use crate::tree::{NodeType, TreeNode, sort_document_order};
use crate::value::Evaluation;
use std::rc::Rc;

/// Evaluates an expression with `scope` as the focus: its context node,
/// position and size are what `.`, `position()` and `last()` see.
pub fn evaluate<'a, N: TreeNode<'a>>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
    scope: &Rc<LocationPathEvaluation<'a, N>>,
) -> Result<Evaluation<'a, N>, XPathError> {
    match expr {
        Expression::Literal(s) => Ok(Evaluation::String(s.clone())),
        Expression::Number(n) => Ok(Evaluation::Number(*n)),
        Expression::LocationPath(path) => {
            evaluate_location_path(path, e_ctx, scope).map(Evaluation::Node)
        }
        Expression::Variable(name) => match e_ctx.variables.get(name) {
            Some(value) => Ok(value.clone()),
            None if e_ctx.strict => Err(XPathError::UnknownVariable(name.clone())),
            None => Ok(Evaluation::String(String::new())),
        },
        Expression::FunctionCall { name, args } => e_ctx.functions.call(name, args, e_ctx, scope),
        Expression::Filter {
            primary,
            predicates,
        } => {
            let set = expect_node_set(evaluate(primary, e_ctx, scope)?)?;
            let nodes = apply_predicates(set.context_nodes(), predicates, scope, e_ctx)?;
            Ok(Evaluation::Node(LocationPathEvaluation::from_nodes(
                nodes,
                Some(Rc::clone(scope)),
            )))
        }
        Expression::BinaryOp { left, op, right } => {
            operators::evaluate_binary(*op, left, right, e_ctx, scope)
        }
        Expression::UnaryOp { op, expr } => {
            let value = evaluate(expr, e_ctx, scope)?;
            match op {
                UnaryOperator::Minus => Ok(Evaluation::Number(-value.to_number())),
            }
        }
    }
}

pub(crate) fn expect_node_set<'a, N: TreeNode<'a>>(
    value: Evaluation<'a, N>,
) -> Result<LocationPathEvaluation<'a, N>, XPathError> {
    match value {
        Evaluation::Node(set) => Ok(set),
        other => Err(XPathError::type_mismatch(
            "node-set",
            other.value_type().to_string(),
        )),
    }
}

fn evaluate_location_path<'a, N: TreeNode<'a>>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_, N>,
    scope: &Rc<LocationPathEvaluation<'a, N>>,
) -> Result<LocationPathEvaluation<'a, N>, XPathError> {
    let mut current = if let Some(start) = &path.start_point {
        Rc::new(expect_node_set(evaluate(start, e_ctx, scope)?)?)
    } else {
        let focus = scope.context_node().ok_or(XPathError::NoContextNode)?;
        let start = if path.is_absolute { focus.root() } else { focus };
        Rc::new(LocationPathEvaluation::single(start, Some(Rc::clone(scope))))
    };

    for step in &path.steps {
        current = Rc::new(current.step(step, e_ctx)?);
    }
    Ok(Rc::try_unwrap(current).unwrap_or_else(|shared| (*shared).clone()))
}

impl<'a, N: TreeNode<'a>> LocationPathEvaluation<'a, N> {
    /// Applies one step to every node of this set.
    ///
    /// A single context node on a forward axis without predicates stays
    /// lazy: nodes are pulled from the axis only as the result is consumed.
    /// Otherwise each context node's candidates are filtered by the
    /// predicates in turn and the union is put back into document order.
    pub fn step(
        self: &Rc<Self>,
        step: &Step,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<LocationPathEvaluation<'a, N>, XPathError> {
        // An empty input still resolves prefixes from the evaluation context.
        let anchor = self.first().unwrap_or(e_ctx.context_node);
        let matcher = NodeMatcher::new(&step.node_test, step.axis, e_ctx, Some(anchor))?;
        let parent = Some(Rc::clone(self));
        let multiple = self.has_more_than(1);

        if step.predicates.is_empty() && !multiple && !step.axis.is_reverse() {
            let Some(node) = self.first() else {
                return Ok(LocationPathEvaluation::empty(parent));
            };
            let nodes = axis_iter(step.axis, node).filter(move |n| matcher.matches(n));
            return Ok(LocationPathEvaluation::from_iter(nodes, parent));
        }

        let mut results = Vec::new();
        for node in self.context_nodes() {
            let candidates = axis_iter(step.axis, node).filter(|n| matcher.matches(n));
            results.extend(apply_predicates(candidates, &step.predicates, self, e_ctx)?);
        }
        if multiple || step.axis.is_reverse() {
            sort_document_order(&mut results);
        }
        Ok(LocationPathEvaluation::from_nodes(results, parent))
    }
}

/// Narrows `candidates` by each predicate in turn, renumbering positions
/// from 1 within each intermediate result.
fn apply_predicates<'a, N, I>(
    candidates: I,
    predicates: &[Expression],
    parent: &Rc<LocationPathEvaluation<'a, N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: TreeNode<'a>,
    I: Iterator<Item = N>,
{
    let (mut current, rest) = match predicates.split_first() {
        Some((first, rest)) => match first.as_number_literal() {
            Some(position) => (select_position(candidates, position), rest),
            None => (candidates.collect(), predicates),
        },
        None => return Ok(candidates.collect()),
    };

    for predicate in rest {
        if current.is_empty() {
            break;
        }
        let set = LocationPathEvaluation::from_nodes(current, Some(Rc::clone(parent)));
        let size = set.context_size();
        let mut kept = Vec::with_capacity(size);
        for position in 1..=size {
            let focus = Rc::new(set.at_position(position));
            let Some(node) = focus.context_node() else {
                break;
            };
            let keep = match evaluate(predicate, e_ctx, &focus)? {
                Evaluation::Number(n) => n == position as f64,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        current = kept;
    }
    Ok(current)
}

/// `[n]` with a literal `n`: takes the node at that position and stops.
fn select_position<N, I: Iterator<Item = N>>(mut candidates: I, position: f64) -> Vec<N> {
    if position < 1.0 || position.fract() != 0.0 || !position.is_finite() {
        return Vec::new();
    }
    candidates.nth(position as usize - 1).into_iter().collect()
}

/// A node test with its prefixes already resolved.
#[derive(Debug, Clone)]
pub(crate) enum NodeMatcher {
    /// `*` or `node()`-like tests on the axis' principal node type.
    Principal(NodeType),
    Name {
        principal: NodeType,
        namespace: Option<String>,
        local: String,
    },
    Namespace {
        principal: NodeType,
        namespace: String,
    },
    Kind(Option<NodeType>),
    ProcessingInstruction(String),
}

impl NodeMatcher {
    pub(crate) fn new<'a, N: TreeNode<'a>>(
        test: &NodeTest,
        axis: Axis,
        e_ctx: &EvaluationContext<'a, '_, N>,
        context: Option<N>,
    ) -> Result<Self, XPathError> {
        let principal = match axis {
            Axis::Attribute => NodeType::Attribute,
            Axis::Namespace => NodeType::Namespace,
            _ => NodeType::Element,
        };
        Ok(match test {
            NodeTest::Wildcard => NodeMatcher::Principal(principal),
            NodeTest::Name(name) => {
                let (prefix, local) = split_qname(name);
                let namespace = match (prefix, principal) {
                    (Some(prefix), NodeType::Element | NodeType::Attribute) => {
                        Some(e_ctx.resolve_prefix(prefix, context)?)
                    }
                    (None, NodeType::Element) => e_ctx.default_element_namespace(),
                    _ => None,
                };
                NodeMatcher::Name {
                    principal,
                    namespace,
                    local: local.to_string(),
                }
            }
            NodeTest::NamespaceWildcard(prefix) => NodeMatcher::Namespace {
                principal,
                namespace: e_ctx.resolve_prefix(prefix, context)?,
            },
            NodeTest::NodeType(kind) => NodeMatcher::Kind(match kind {
                NodeTypeTest::Node => None,
                NodeTypeTest::Text => Some(NodeType::Text),
                NodeTypeTest::Comment => Some(NodeType::Comment),
                NodeTypeTest::ProcessingInstruction => Some(NodeType::ProcessingInstruction),
            }),
            NodeTest::ProcessingInstruction(target) => {
                NodeMatcher::ProcessingInstruction(target.clone())
            }
        })
    }

    pub(crate) fn matches<'a, N: TreeNode<'a>>(&self, node: &N) -> bool {
        match self {
            NodeMatcher::Principal(principal) => node.node_type() == *principal,
            NodeMatcher::Name {
                principal,
                namespace,
                local,
            } => {
                node.node_type() == *principal
                    && node.name().is_some_and(|q| q.local_part == local)
                    && (*principal == NodeType::Namespace
                        || node.namespace_uri() == namespace.as_deref())
            }
            NodeMatcher::Namespace {
                principal,
                namespace,
            } => {
                node.node_type() == *principal
                    && node.namespace_uri() == Some(namespace.as_str())
            }
            NodeMatcher::Kind(None) => true,
            NodeMatcher::Kind(Some(kind)) => node.node_type() == *kind,
            NodeMatcher::ProcessingInstruction(target) => {
                node.node_type() == NodeType::ProcessingInstruction
                    && node.name().is_some_and(|q| q.local_part == target)
            }
        }
    }
}
