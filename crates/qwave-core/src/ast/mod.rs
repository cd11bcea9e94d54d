//! Abstract Syntax Tree (AST) definitions for qwave
//!
//! A [`Program`] owns its declarations and statements. The tree is immutable
//! once parsed; the IR builder consumes it and it is discarded afterwards.

pub mod program;
pub mod statement;

pub use program::{Declaration, Direction, Program};
pub use statement::{
    Argument, ArgumentValue, Assignment, AstNode, Block, OperationCall, Statement,
};
