//! Diagnostics
//!
//! Every stage of the pipeline reports problems as [`Diagnostic`] values pushed
//! into a shared, ordered [`Diagnostics`] sink. Nothing is ever removed from the
//! sink: a compilation result always carries the full history of the attempt.
//! A stage signals that it cannot continue by returning [`StageFailed`] after
//! pushing at least one error.

use crate::ir::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Location in source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset from the start of the source
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, in characters)
    pub column: usize,
}

impl Span {
    pub fn new(offset: usize, len: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            len,
            line,
            column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// Pipeline stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configure,
    Parse,
    Build,
    Annotate,
    Optimize,
    Schedule,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configure => "configure",
            Stage::Parse => "parse",
            Stage::Build => "build",
            Stage::Annotate => "annotate",
            Stage::Optimize => "optimize",
            Stage::Schedule => "schedule",
            Stage::Emit => "emit",
        };
        f.write_str(name)
    }
}

/// Diagnostic taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Malformed source, recoverable only by reparsing
    SyntaxError,
    /// Undeclared, unresolved or dangling identifiers
    ReferenceError,
    /// Operand or output type mismatch
    TypeError,
    /// An output that does not depend on any input
    UnusedOutput,
    /// A bound value that nothing consumes
    UnusedValue,
    /// Error-correction requirements that contradict each other
    ConstraintConflict,
    /// An optimization pass corrupted the graph
    InvariantViolation,
    /// A requirement names a code family the error-correction pass does not know
    UnsupportedCode,
    /// The pass list names a pass that does not exist
    UnknownPass,
    /// A compile option is out of range
    InvalidOption,
    /// A node's accumulated consumption is above its budget
    BudgetExceeded,
    /// No topological order exists
    CyclicDependency,
}

impl DiagnosticKind {
    /// Severity a diagnostic of this kind carries unless stated otherwise
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticKind::UnusedOutput
            | DiagnosticKind::UnusedValue
            | DiagnosticKind::BudgetExceeded => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single reported problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with the kind's default severity
    pub fn new(stage: Stage, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: kind.default_severity(),
            stage,
            kind,
            node: None,
            span: None,
            message: message.into(),
        }
    }

    /// Create an error-level diagnostic
    pub fn error(stage: Stage, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(stage, kind, message).with_severity(Severity::Error)
    }

    /// Create a warning-level diagnostic
    pub fn warning(stage: Stage, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(stage, kind, message).with_severity(Severity::Warning)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        write!(f, "{}[{}] ({})", severity, self.kind, self.stage)?;
        if let Some(span) = &self.span {
            write!(f, " at {span}")?;
        }
        if let Some(node) = &self.node {
            write!(f, " on {node}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// A stage pushed at least one error and the pipeline must stop
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{stage} stage failed with {errors} error(s)")]
pub struct StageFailed {
    pub stage: Stage,
    pub errors: usize,
}

/// Ordered, append-only collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            log::debug!("{}", diagnostic);
        } else {
            log::trace!("{}", diagnostic);
        }
        self.items.push(diagnostic);
    }

    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, diagnostics: I) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    /// Diagnostics of the given kind, in report order
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Fail if `stage` has reported any error
    pub fn check(&self, stage: Stage) -> Result<(), StageFailed> {
        let errors = self
            .items
            .iter()
            .filter(|d| d.stage == stage && d.is_error())
            .count();
        if errors > 0 {
            Err(StageFailed { stage, errors })
        } else {
            Ok(())
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
