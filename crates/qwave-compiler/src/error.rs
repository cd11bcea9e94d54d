//! Compiler error types

use qwave_core::{CoreError, Diagnostic, DiagnosticKind, NodeId, Span, Stage};
use thiserror::Error;

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Identifier used before the statement that produces it
    #[error("Unresolved reference '{name}'")]
    UnresolvedReference { name: String, span: Span },

    /// Declared output that no statement assigns
    #[error("Output '{name}' is never assigned")]
    DanglingOutput { name: String, span: Span },

    /// Operation the registry does not know
    #[error("Unknown operation '{name}'")]
    UnknownOperation { name: String, span: Span },

    /// Operand or output types that do not fit
    #[error("Type error: {message}")]
    TypeMismatch { message: String, span: Span },

    /// Error-correction requirements that weaken along a fault-tolerant chain
    #[error("Constraint conflict on {node}: {message}")]
    ConstraintConflict { node: NodeId, message: String },

    /// A pass left the graph in a state the pipeline does not accept
    #[error("Pass '{pass}' violated a graph invariant{}: {message}", .node.map(|n| format!(" at {n}")).unwrap_or_default())]
    InvariantViolation {
        pass: String,
        node: Option<NodeId>,
        message: String,
    },

    /// Requirement names a code family the error-correction pass cannot build
    #[error("Unsupported code family '{code}' on {node}")]
    UnsupportedCode { node: NodeId, code: String },

    /// No topological order exists
    #[error("Cyclic dependency through {}", .nodes.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", "))]
    CyclicDependency { nodes: Vec<NodeId> },

    /// Schedule that does not respect the graph it was made for
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Pass name not in the pipeline
    #[error("Unknown pass '{0}'")]
    UnknownPass(String),

    /// Option value out of range
    #[error("Invalid option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    /// Graph edit rejected by the IR
    #[error("Graph error: {0}")]
    Graph(#[from] CoreError),
}

impl CompileError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            CompileError::UnresolvedReference { .. } | CompileError::DanglingOutput { .. } => {
                DiagnosticKind::ReferenceError
            }
            CompileError::UnknownOperation { .. } => DiagnosticKind::SyntaxError,
            CompileError::TypeMismatch { .. } => DiagnosticKind::TypeError,
            CompileError::ConstraintConflict { .. } => DiagnosticKind::ConstraintConflict,
            CompileError::InvariantViolation { .. }
            | CompileError::InvalidSchedule(_)
            | CompileError::Graph(_) => DiagnosticKind::InvariantViolation,
            CompileError::UnsupportedCode { .. } => DiagnosticKind::UnsupportedCode,
            CompileError::CyclicDependency { .. } => DiagnosticKind::CyclicDependency,
            CompileError::UnknownPass(_) => DiagnosticKind::UnknownPass,
            CompileError::InvalidOption { .. } => DiagnosticKind::InvalidOption,
        }
    }

    /// Node the error is about, if any
    pub fn node(&self) -> Option<NodeId> {
        match self {
            CompileError::ConstraintConflict { node, .. }
            | CompileError::UnsupportedCode { node, .. } => Some(*node),
            CompileError::InvariantViolation { node, .. } => *node,
            CompileError::CyclicDependency { nodes } => nodes.first().copied(),
            _ => None,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::UnresolvedReference { span, .. }
            | CompileError::DanglingOutput { span, .. }
            | CompileError::UnknownOperation { span, .. }
            | CompileError::TypeMismatch { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Convert into an error-level diagnostic of `stage`
    pub fn to_diagnostic(&self, stage: Stage) -> Diagnostic {
        let mut diagnostic = Diagnostic::error(stage, self.kind(), self.to_string());
        if let Some(node) = self.node() {
            diagnostic = diagnostic.with_node(node);
        }
        if let Some(span) = self.span() {
            diagnostic = diagnostic.with_span(span);
        }
        diagnostic
    }
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_violation_names_pass_and_node() {
        let err = CompileError::InvariantViolation {
            pass: "thermal".to_string(),
            node: Some(NodeId(4)),
            message: "graph has a cycle".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Pass 'thermal' violated a graph invariant at n4: graph has a cycle"
        );

        let diagnostic = err.to_diagnostic(Stage::Optimize);
        assert_eq!(diagnostic.kind, DiagnosticKind::InvariantViolation);
        assert_eq!(diagnostic.node, Some(NodeId(4)));
        assert!(diagnostic.is_error());
    }

    #[test]
    fn test_reference_errors() {
        let err = CompileError::DanglingOutput {
            name: "y".to_string(),
            span: Span::default(),
        };
        assert_eq!(err.kind(), DiagnosticKind::ReferenceError);
        assert!(err.to_diagnostic(Stage::Build).span.is_some());
    }
}
