//! The closed set of syntax nodes the evaluator walks.

/// The top-level expression that can be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    LocationPath(LocationPath),
    Variable(String),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    /// A primary expression narrowed by predicates, e.g. `(//item)[2]`.
    Filter {
        primary: Box<Expression>,
        predicates: Vec<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
}

impl Expression {
    pub fn is_location_path(&self) -> bool {
        matches!(self, Expression::LocationPath(_))
    }

    pub fn is_binary_op(&self) -> bool {
        matches!(self, Expression::BinaryOp { .. })
    }

    /// The value of a bare numeric literal, used for the `[n]` shortcut.
    pub fn as_number_literal(&self) -> Option<f64> {
        match self {
            Expression::Number(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,
    // Equality
    Equals,
    NotEquals,
    // Relational
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Additive
    Plus,
    Minus,
    // Multiplicative
    Multiply,
    Divide,
    Modulo,
    // Set
    Union,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::Equals => "=",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "div",
            BinaryOperator::Modulo => "mod",
            BinaryOperator::Union => "|",
        }
    }
}

/// A location path such as `/child::foo`, `descendant::bar[1]` or `$var/item`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// Starting expression for paths like `$var/foo` or `instance('x')/foo`.
    /// If `None`, the path starts from the context node or root.
    pub start_point: Option<Box<Expression>>,
    /// True if the path starts from the document root (e.g., `/foo`).
    /// Meaningless if `start_point` is `Some`.
    pub is_absolute: bool,
    pub steps: Vec<Step>,
}

/// A single step, like `child::foo[position() > 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expression>,
}

impl Step {
    pub fn new(axis: Axis, node_test: NodeTest) -> Self {
        Self {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    /// `descendant-or-self::node()`, the expansion of `//`.
    pub fn descendant_or_self() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::NodeType(NodeTypeTest::Node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    /// Reverse axes number their proximity positions from the context node
    /// backwards through the document.
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Namespace => "namespace",
            Axis::Parent => "parent",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::SelfAxis => "self",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A qualified name test (e.g., `foo`, `xf:bind`).
    Name(String),
    /// Any name in the namespace bound to the prefix (`jr:*`).
    NamespaceWildcard(String),
    /// `*`
    Wildcard,
    NodeType(NodeTypeTest),
    /// `processing-instruction('target')`
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeTest {
    Text,
    Node,
    Comment,
    ProcessingInstruction,
}
