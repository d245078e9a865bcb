//! Evaluation errors.
//!
//! These never escape an evaluator as failures: any error while evaluating an
//! expression makes the result "not determinable". They carry JavaScript-style
//! messages so native functions can report what went wrong in logs.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("TypeError: {0}")]
    Type(String),
    #[error("RangeError: {0}")]
    Range(String),
    #[error("SyntaxError: {0}")]
    Syntax(String),
    #[error("{0} is not supported")]
    Unsupported(String),
    /// A property the evaluator does not model, such as a builtin method
    /// it does not implement.
    #[error("property '{0}' is not known")]
    UnknownProperty(String),
    #[error("maximum evaluation depth exceeded")]
    DepthLimit,
    /// Error raised by host-provided native code.
    #[error("{0}")]
    Thrown(String),
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        EvalError::Unsupported(what.into())
    }
}
