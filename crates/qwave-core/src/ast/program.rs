//! Program root and declarations

use super::statement::{AstNode, Statement};
use crate::diagnostic::Span;
use crate::types::ValueType;
use serde::{Deserialize, Serialize};

/// Whether a declaration introduces an input or an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// A typed input or output declaration (`input a: wave[4];`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub direction: Direction,
    pub name: String,
    pub ty: ValueType,
    #[serde(default)]
    pub span: Span,
}

impl Declaration {
    pub fn input(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            direction: Direction::Input,
            name: name.into(),
            ty,
            span: Span::default(),
        }
    }

    pub fn output(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            direction: Direction::Output,
            name: name.into(),
            ty,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// A parsed qwave program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Input and output declarations, in source order
    pub declarations: Vec<Declaration>,

    /// Statements, in source order
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(declarations: Vec<Declaration>, statements: Vec<Statement>) -> Self {
        Self {
            declarations,
            statements,
        }
    }

    /// Input declarations in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|d| d.direction == Direction::Input)
    }

    /// Output declarations in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|d| d.direction == Direction::Output)
    }

    /// Find a declaration by name
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Visit every AST node depth-first in source order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(AstNode<'a>)) {
        for declaration in &self.declarations {
            visit(AstNode::Declaration(declaration));
        }
        for statement in &self.statements {
            statement.walk(visit);
        }
    }

    /// Number of operation calls in the program, including nested ones
    pub fn call_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |node| {
            if matches!(node, AstNode::OperationCall(_)) {
                count += 1;
            }
        });
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Argument, Assignment, OperationCall};

    fn sample() -> Program {
        Program::new(
            vec![
                Declaration::input("a", ValueType::wave(4)),
                Declaration::output("y", ValueType::wave(4)),
                Declaration::input("b", ValueType::wave(4)),
            ],
            vec![Statement::Assignment(Assignment::new(
                "y",
                OperationCall::new("interfere")
                    .with_argument(Argument::identifier("a"))
                    .with_argument(Argument::identifier("b")),
            ))],
        )
    }

    #[test]
    fn test_inputs_outputs_keep_order() {
        let program = sample();
        let inputs: Vec<&str> = program.inputs().map(|d| d.name.as_str()).collect();
        let outputs: Vec<&str> = program.outputs().map(|d| d.name.as_str()).collect();

        assert_eq!(inputs, vec!["a", "b"]);
        assert_eq!(outputs, vec!["y"]);
        assert_eq!(program.declaration("b").unwrap().ty, ValueType::wave(4));
    }

    #[test]
    fn test_walk_visits_all_nodes() {
        let program = sample();
        let mut seen = Vec::new();
        program.walk(&mut |node| seen.push(node.label()));

        assert_eq!(
            seen,
            vec![
                "declaration",
                "declaration",
                "declaration",
                "assignment",
                "operation_call"
            ]
        );
        assert_eq!(program.call_count(), 1);
    }
}
