use objpath_compiler::SyntaxError;
use objpath_types::BeanError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("No pointer factory can handle a value of kind '{kind}'")]
    UnresolvableValue { kind: String },

    #[error("No value for path: {path}")]
    NotFound { path: String },

    #[error("Cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    #[error("Undefined function: {name}")]
    FunctionNotFound { name: String },

    #[error("Invalid path for creation: '{path}'. Only simple child and attribute paths without context-dependent predicates can be created")]
    InvalidMutationPath { path: String },

    #[error("{message}")]
    UnsupportedMutation { kind: &'static str, message: String },

    #[error("Pointer invariant violated: {0}")]
    StructuralInvariant(String),

    #[error("Cannot compare pointers that do not belong to the same tree: '{left}' and '{right}'")]
    IncomparablePointers { left: String, right: String },

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Function '{function}' error: {message}")]
    Function { function: String, message: String },

    #[error("{type_name}: {message}")]
    Bean { type_name: String, message: String },

    #[error("Cannot create a relative context for a non-existent node: {0}")]
    NonExistentContext(String),
}

impl PathError {
    pub(crate) fn function(function: &str, message: impl Into<String>) -> Self {
        PathError::Function {
            function: function.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn bean(type_name: &str, err: BeanError) -> Self {
        PathError::Bean {
            type_name: type_name.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn unsupported(kind: &'static str, message: impl Into<String>) -> Self {
        PathError::UnsupportedMutation {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PathError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, PathError>;
