//! qwave Core - Core types and definitions for the qwave compiler
//!
//! This crate provides the fundamental types shared by every compiler stage:
//! - Source literals and value types
//! - Spans, diagnostics and stage failures
//! - AST (Abstract Syntax Tree) definitions
//! - IR (Intermediate Representation) graph, attributes and parallel hints
//! - The operation registry
//! - Error types

pub mod ast;
pub mod diagnostic;
pub mod error;
pub mod ir;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use ast::Program;
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Severity, Span, Stage, StageFailed};
pub use error::{CoreError, Result};
pub use ir::{Budget, ErrorCorrection, IrGraph, IrNode, NodeId, NodeKind, OpKind};
pub use registry::{OpSpec, OperationRegistry, ParamRole, ParamSpec};
pub use types::{ElementKind, Literal, ValueType};
