//! Statements, operation calls and arguments

use super::program::Declaration;
use crate::diagnostic::Span;
use crate::types::Literal;
use serde::{Deserialize, Serialize};

/// Value passed to an operation parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgumentValue {
    /// Literal constant
    Literal(Literal),
    /// Reference to an input, output or previously assigned value
    Identifier(String),
}

/// A single call argument, positional or named (`phase: 0.5`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Parameter name; `None` for positional operands
    pub name: Option<String>,
    pub value: ArgumentValue,
    #[serde(default)]
    pub span: Span,
}

impl Argument {
    /// Positional identifier operand
    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            name: None,
            value: ArgumentValue::Identifier(name.into()),
            span: Span::default(),
        }
    }

    /// Positional literal operand
    pub fn literal(value: Literal) -> Self {
        Self {
            name: None,
            value: ArgumentValue::Literal(value),
            span: Span::default(),
        }
    }

    /// Named argument
    pub fn named(name: impl Into<String>, value: ArgumentValue) -> Self {
        Self {
            name: Some(name.into()),
            value,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_positional(&self) -> bool {
        self.name.is_none()
    }

    /// Referenced identifier, if any
    pub fn identifier_name(&self) -> Option<&str> {
        match &self.value {
            ArgumentValue::Identifier(name) => Some(name),
            ArgumentValue::Literal(_) => None,
        }
    }

    pub fn literal_value(&self) -> Option<&Literal> {
        match &self.value {
            ArgumentValue::Literal(lit) => Some(lit),
            ArgumentValue::Identifier(_) => None,
        }
    }
}

/// Call of a named operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationCall {
    pub operation: String,
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub span: Span,
}

impl OperationCall {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            arguments: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Positional arguments in order
    pub fn positional(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| a.is_positional())
    }

    /// Named arguments in order
    pub fn named(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| !a.is_positional())
    }

    /// Look up a named argument
    pub fn parameter(&self, name: &str) -> Option<&Argument> {
        self.arguments
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
    }

    pub fn positional_count(&self) -> usize {
        self.positional().count()
    }
}

/// `target = operation(...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: String,
    pub call: OperationCall,
    #[serde(default)]
    pub span: Span,
}

impl Assignment {
    pub fn new(target: impl Into<String>, call: OperationCall) -> Self {
        Self {
            target: target.into(),
            call,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// A labelled group of statements (`maintain_coherence(...) { ... }`)
///
/// Parameters are attribute defaults for every call inside the block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub label: String,
    #[serde(default)]
    pub parameters: Vec<Argument>,
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub span: Span,
}

impl Block {
    pub fn new(label: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            label: label.into(),
            parameters: Vec::new(),
            statements,
            span: Span::default(),
        }
    }

    pub fn with_parameter(mut self, parameter: Argument) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// A statement in program order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Assignment(Assignment),
    /// Bare call of a side-effecting operation; binds nothing
    Call(OperationCall),
    Block(Block),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Assignment(a) => a.span,
            Statement::Call(c) => c.span,
            Statement::Block(b) => b.span,
        }
    }

    pub(crate) fn walk<'a>(&'a self, visit: &mut impl FnMut(AstNode<'a>)) {
        match self {
            Statement::Assignment(assignment) => {
                visit(AstNode::Assignment(assignment));
                visit(AstNode::OperationCall(&assignment.call));
            }
            Statement::Call(call) => visit(AstNode::OperationCall(call)),
            Statement::Block(block) => {
                visit(AstNode::Block(block));
                for statement in &block.statements {
                    statement.walk(visit);
                }
            }
        }
    }
}

/// Borrowed view over every kind of AST node
#[derive(Debug, Clone, Copy)]
pub enum AstNode<'a> {
    Declaration(&'a Declaration),
    Assignment(&'a Assignment),
    OperationCall(&'a OperationCall),
    Block(&'a Block),
}

impl AstNode<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            AstNode::Declaration(_) => "declaration",
            AstNode::Assignment(_) => "assignment",
            AstNode::OperationCall(_) => "operation_call",
            AstNode::Block(_) => "block",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            AstNode::Declaration(d) => d.span,
            AstNode::Assignment(a) => a.span,
            AstNode::OperationCall(c) => c.span,
            AstNode::Block(b) => b.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_argument_views() {
        let call = OperationCall::new("phase_shift")
            .with_argument(Argument::identifier("a"))
            .with_argument(Argument::named(
                "phase",
                ArgumentValue::Literal(Literal::Number(0.5)),
            ))
            .with_argument(Argument::named(
                "code",
                ArgumentValue::Literal(Literal::Text("surface".into())),
            ));

        assert_eq!(call.positional_count(), 1);
        assert_eq!(call.named().count(), 2);
        assert_eq!(
            call.parameter("phase").and_then(|a| a.literal_value()),
            Some(&Literal::Number(0.5))
        );
        assert!(call.parameter("coherence").is_none());
        assert_eq!(call.arguments[0].identifier_name(), Some("a"));
    }

    #[test]
    fn test_nested_block_walk_order() {
        let inner = Statement::Assignment(Assignment::new(
            "x",
            OperationCall::new("split").with_argument(Argument::identifier("a")),
        ));
        let block = Statement::Block(Block::new("maintain_coherence", vec![inner]));

        let mut labels = Vec::new();
        block.walk(&mut |node| labels.push(node.label()));
        assert_eq!(labels, vec!["block", "assignment", "operation_call"]);
    }
}
