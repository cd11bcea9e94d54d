//! Error types for qwave core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Type arity mismatch for '{kind}': expected {expected} dimension(s), got {actual}")]
    TypeArity {
        kind: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Invalid graph operation: {0}")]
    InvalidOperation(String),

    #[error("Operation '{0}' is already registered")]
    DuplicateOperation(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
