//! Parser error types

use qwave_core::{Diagnostic, DiagnosticKind, Span, Stage};
use thiserror::Error;

/// Parser error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Character that starts no token
    #[error("Unexpected character '{ch}' at {span}")]
    UnexpectedCharacter { ch: char, span: Span },

    /// String literal without closing quote
    #[error("Unterminated string literal at {span}")]
    UnterminatedString { span: Span },

    /// Malformed numeric literal
    #[error("Invalid number '{text}' at {span}")]
    InvalidNumber { text: String, span: Span },

    /// Token not allowed by the grammar
    #[error("Expected {expected}, found {found} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    /// Unknown element kind, wrong type arity or a zero dimension
    #[error("Invalid type at {span}: {message}")]
    InvalidType { message: String, span: Span },

    /// Declaration after the first statement
    #[error("Declaration of '{name}' at {span} follows a statement")]
    LateDeclaration { name: String, span: Span },

    /// Name declared or assigned more than once
    #[error("Duplicate name '{name}' at {span}")]
    DuplicateName { name: String, span: Span },

    /// Assignment whose target is a declared input
    #[error("Cannot assign to input '{name}' at {span}")]
    AssignToInput { name: String, span: Span },

    /// Operation not in the registry or not callable from source
    #[error("Unknown operation '{name}' at {span}")]
    UnknownOperation { name: String, span: Span },

    /// Named parameter the operation does not accept
    #[error("Unknown parameter '{parameter}' for '{operation}' at {span}")]
    UnknownParameter {
        operation: String,
        parameter: String,
        span: Span,
    },

    /// Same parameter given twice
    #[error("Parameter '{parameter}' given twice at {span}")]
    DuplicateParameter { parameter: String, span: Span },

    /// Wrong number of positional operands
    #[error("'{operation}' takes {expected} operand(s), got {actual} at {span}")]
    Arity {
        operation: String,
        expected: String,
        actual: usize,
        span: Span,
    },

    /// Argument of the wrong shape or value
    #[error("Invalid argument for '{operation}' at {span}: {message}")]
    InvalidArgument {
        operation: String,
        message: String,
        span: Span,
    },

    /// Bare call of an operation without side effects
    #[error("Result of '{operation}' at {span} is discarded; only side-effecting operations may be called without assignment")]
    DiscardedResult { operation: String, span: Span },

    /// Identifier that names no input, output or assignment target
    #[error("Undeclared identifier '{name}' at {span}")]
    UndeclaredIdentifier { name: String, span: Span },

    /// Coherence blocks nested past the supported depth
    #[error("Blocks nested deeper than {limit} levels at {span}")]
    NestingTooDeep { limit: usize, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedCharacter { span, .. }
            | ParseError::UnterminatedString { span }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::InvalidType { span, .. }
            | ParseError::LateDeclaration { span, .. }
            | ParseError::DuplicateName { span, .. }
            | ParseError::AssignToInput { span, .. }
            | ParseError::UnknownOperation { span, .. }
            | ParseError::UnknownParameter { span, .. }
            | ParseError::DuplicateParameter { span, .. }
            | ParseError::Arity { span, .. }
            | ParseError::InvalidArgument { span, .. }
            | ParseError::DiscardedResult { span, .. }
            | ParseError::UndeclaredIdentifier { span, .. }
            | ParseError::NestingTooDeep { span, .. } => *span,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            ParseError::UndeclaredIdentifier { .. } => DiagnosticKind::ReferenceError,
            _ => DiagnosticKind::SyntaxError,
        }
    }

    /// Convert into a parse-stage diagnostic carrying the source position
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(Stage::Parse, self.kind(), self.to_string()).with_span(self.span())
    }
}

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, ParseError>;
