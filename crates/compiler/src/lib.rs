//! Compiler for objpath expressions: text in, immutable AST out.

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{
    Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator,
};
pub use error::SyntaxError;
pub use parser::parse_expression;
