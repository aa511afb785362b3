//! Abstract syntax tree of a compiled path expression.

use objpath_types::QName;
use std::fmt;
use std::sync::Arc;

/// The top-level expression that can be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    LocationPath(LocationPath),
    Variable(QName),
    FunctionCall {
        name: QName,
        args: Vec<Expression>,
    },
    /// A primary expression narrowed by predicates, e.g. `$items[2]`.
    Filter {
        base: Box<Expression>,
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

/// Functions whose zero-argument form reads the context node.
const CONTEXT_FUNCTIONS: &[&str] = &[
    "local-name",
    "name",
    "namespace-uri",
    "string",
    "string-length",
    "normalize-space",
    "number",
];

impl Expression {
    /// Checks if the expression is a `LocationPath` variant.
    pub fn is_location_path(&self) -> bool {
        matches!(self, Expression::LocationPath(_))
    }

    /// Checks if the expression is a `BinaryOp` variant.
    pub fn is_binary_op(&self) -> bool {
        matches!(self, Expression::BinaryOp { .. })
    }

    /// True if the value of the expression depends on the context node, position or size.
    pub fn is_context_dependent(&self) -> bool {
        match self {
            Expression::Literal(_) | Expression::Number(_) | Expression::Variable(_) => false,
            Expression::LocationPath(path) => match &path.start_point {
                Some(start) => {
                    start.is_context_dependent()
                        || path.steps.iter().any(|s| s.has_context_dependent_predicates())
                }
                None => true,
            },
            Expression::FunctionCall { name, args } => {
                if name.prefix().is_none() {
                    match name.name() {
                        "position" | "last" | "lang" => return true,
                        n if args.is_empty() && CONTEXT_FUNCTIONS.contains(&n) => return true,
                        _ => {}
                    }
                }
                args.iter().any(Expression::is_context_dependent)
            }
            Expression::Filter { base, .. } => base.is_context_dependent(),
            Expression::BinaryOp { left, right, .. } => {
                left.is_context_dependent() || right.is_context_dependent()
            }
            Expression::UnaryOp { expr, .. } => expr.is_context_dependent(),
        }
    }
}

/// A unary operator used in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
}

/// A binary operator used in an expression.
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

/// Represents a full location path, like `/child::foo`, `descendant::bar[1]`, or `$var/item`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// An optional starting expression, for paths like `$var/foo` or `func()/foo`.
    /// If `None`, the path starts from the context node or root.
    pub start_point: Option<Box<Expression>>,
    /// True if the path starts from the root (e.g., `/foo`).
    /// Meaningless if `start_point` is `Some`.
    pub is_absolute: bool,
    pub steps: Vec<Arc<Step>>,
}

impl LocationPath {
    /// A path that can be resolved, and created, one named child or attribute at a time.
    ///
    /// Every step must use the `child` or `attribute` axis with a non-wildcard name,
    /// and carry at most one predicate, which must not depend on the context.
    pub fn is_simple_path(&self) -> bool {
        self.start_point.is_none()
            && self.steps.iter().all(|step| {
                matches!(step.axis, Axis::Child | Axis::Attribute)
                    && matches!(&step.node_test, NodeTest::Name(q) if !q.is_wildcard())
                    && step.predicates.len() <= 1
                    && !step.has_context_dependent_predicates()
            })
    }
}

/// Represents a single step in a location path, like `child::foo[position() > 1]`.
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

    pub fn with_predicates(mut self, predicates: Vec<Expression>) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn has_context_dependent_predicates(&self) -> bool {
        self.predicates.iter().any(Expression::is_context_dependent)
    }
}

/// The axis of movement from the context node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    Namespace,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Attribute => "attribute",
            Axis::Namespace => "namespace",
            Axis::Parent => "parent",
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::SelfAxis => "self",
            Axis::FollowingSibling => "following-sibling",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::Following => "following",
            Axis::Preceding => "preceding",
        }
    }

    /// Reverse axes number their candidates from the context node outwards.
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A test to apply to nodes on a given axis to see if they should be included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A qualified name test (e.g., `foo`, `xsl:if`, `*`, `ns:*`).
    Name(QName),
    /// A node type test (e.g., `text()`, `node()`).
    NodeType(NodeTypeTest),
    /// `processing-instruction('target')`.
    ProcessingInstruction(String),
}

impl NodeTest {
    pub fn name(name: &str) -> Self {
        NodeTest::Name(QName::parse(name))
    }

    pub fn node() -> Self {
        NodeTest::NodeType(NodeTypeTest::Node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeTest {
    Text,
    Node,
    Comment,
    ProcessingInstruction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_expression;

    fn path(text: &str) -> LocationPath {
        match parse_expression(text).unwrap() {
            Expression::LocationPath(lp) => lp,
            other => panic!("expected a location path, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_paths() {
        assert!(path("/a/b").is_simple_path());
        assert!(path("a/@b").is_simple_path());
        assert!(path("a[2]/b[$i + 1]").is_simple_path());
        assert!(path("/").is_simple_path());
    }

    #[test]
    fn test_non_simple_paths() {
        assert!(!path("a/*").is_simple_path());
        assert!(!path("//a").is_simple_path());
        assert!(!path("a[position() = 2]").is_simple_path());
        assert!(!path("a[b = 1]").is_simple_path());
        assert!(!path("a[1][2]").is_simple_path());
        assert!(!path("$v/a").is_simple_path());
        assert!(!path("../a").is_simple_path());
    }

    #[test]
    fn test_context_dependence() {
        assert!(!parse_expression("concat('a', $b)").unwrap().is_context_dependent());
        assert!(parse_expression("string()").unwrap().is_context_dependent());
        assert!(!parse_expression("string('x')").unwrap().is_context_dependent());
        assert!(parse_expression("last() - 1").unwrap().is_context_dependent());
    }
}
