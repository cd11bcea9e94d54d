//! qwave Parser - Source text to AST parser for the qwave compiler
//!
//! Parsing runs in three steps: the lexer produces tokens, the parser builds
//! a [`Program`] and the validator checks names and operations against an
//! [`OperationRegistry`]. Problems are reported as parse-stage diagnostics;
//! no program is returned if any step reports an error.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod validation;

pub use error::{ParseError, Result};
pub use lexer::Lexer;
pub use parser::Parser;
pub use validation::Validator;

use qwave_core::ast::Program;
use qwave_core::{Diagnostics, OperationRegistry, Stage, StageFailed};

/// Parser for complete programs
pub struct ProgramParser<'r> {
    registry: &'r OperationRegistry,
}

impl<'r> ProgramParser<'r> {
    pub fn new(registry: &'r OperationRegistry) -> Self {
        Self { registry }
    }

    /// Parse and validate `source`, pushing every problem to `diagnostics`
    pub fn parse(
        &self,
        source: &str,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<Program, StageFailed> {
        match self.parse_errors(source) {
            Ok(program) => {
                log::debug!(
                    "Parsed program: {} declarations, {} statements",
                    program.declarations.len(),
                    program.statements.len()
                );
                Ok(program)
            }
            Err(errors) => {
                let failed = StageFailed {
                    stage: Stage::Parse,
                    errors: errors.len(),
                };
                diagnostics.extend(errors.iter().map(ParseError::to_diagnostic));
                Err(failed)
            }
        }
    }

    /// Parse and validate `source`, returning the raw errors on failure
    pub fn parse_errors(&self, source: &str) -> std::result::Result<Program, Vec<ParseError>> {
        let tokens = Lexer::new(source).tokenize().map_err(|e| vec![e])?;
        let program = Parser::new(tokens).parse_program()?;
        let errors = Validator::new(self.registry).validate(&program);
        if errors.is_empty() {
            Ok(program)
        } else {
            Err(errors)
        }
    }
}

/// Parse `source` against the built-in operations
pub fn parse(
    source: &str,
    diagnostics: &mut Diagnostics,
) -> std::result::Result<Program, StageFailed> {
    ProgramParser::new(&OperationRegistry::default()).parse(source, diagnostics)
}
