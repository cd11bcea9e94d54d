//! Recursive-descent parser
//!
//! Turns the token stream into a [`Program`]. This stage only checks the
//! grammar and declaration types; names and operations are checked by
//! [`crate::validation`].
//!
//! A malformed statement is reported and skipped up to the next `;` so one
//! pass reports every independent syntax error.

use crate::error::{ParseError, Result};
use crate::token::{Token, TokenKind};
use qwave_core::ast::{
    Argument, ArgumentValue, Assignment, Block, Declaration, Direction, OperationCall, Program,
    Statement,
};
use qwave_core::{ElementKind, Literal, Span, ValueType};

/// Label of the coherence block statement
pub const COHERENCE_BLOCK: &str = "maintain_coherence";

/// Deepest nesting of coherence blocks accepted
pub const MAX_BLOCK_DEPTH: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    depth: usize,
}

impl Parser {
    /// `tokens` must end with `Eof`, as produced by the lexer
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Parse a whole program, or every syntax error found
    pub fn parse_program(mut self) -> std::result::Result<Program, Vec<ParseError>> {
        let mut declarations = Vec::new();
        let mut statements = Vec::new();

        while !self.at_eof() {
            let result = if self.at_declaration() {
                match self.parse_declaration() {
                    Ok(declaration) if statements.is_empty() => {
                        declarations.push(declaration);
                        Ok(())
                    }
                    Ok(declaration) => {
                        self.errors.push(ParseError::LateDeclaration {
                            name: declaration.name,
                            span: declaration.span,
                        });
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            } else {
                self.parse_statement().map(|s| statements.push(s))
            };
            if let Err(err) = result {
                self.recover(err);
                // A stray '}' only closes blocks
                if matches!(self.peek(), TokenKind::RBrace) {
                    self.pos += 1;
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Program::new(declarations, statements))
        } else {
            Err(self.errors)
        }
    }

    // ----- declarations -----

    fn at_declaration(&self) -> bool {
        matches!(self.peek(), TokenKind::Ident(word) if word == "input" || word == "output")
            && matches!(self.peek_at(1), TokenKind::Ident(_))
    }

    fn parse_declaration(&mut self) -> Result<Declaration> {
        let (keyword, start) = self.expect_ident("'input' or 'output'")?;
        let direction = if keyword == "input" {
            Direction::Input
        } else {
            Direction::Output
        };
        let (name, _) = self.expect_ident("declaration name")?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let end = self.expect(TokenKind::Semi)?;

        Ok(Declaration {
            direction,
            name,
            ty,
            span: join(start, end),
        })
    }

    fn parse_type(&mut self) -> Result<ValueType> {
        let (kind_name, start) = self.expect_ident("type")?;
        let element = ElementKind::from_name(&kind_name).ok_or_else(|| ParseError::InvalidType {
            message: format!("unknown element kind '{kind_name}'"),
            span: start,
        })?;

        let mut shape = Vec::new();
        let mut end = start;
        if self.eat(&TokenKind::LBracket).is_some() {
            loop {
                shape.push(self.parse_dimension()?);
                if self.eat(&TokenKind::Comma).is_none() {
                    break;
                }
            }
            end = self.expect(TokenKind::RBracket)?;
        }

        ValueType::new(element, shape).map_err(|e| ParseError::InvalidType {
            message: e.to_string(),
            span: join(start, end),
        })
    }

    fn parse_dimension(&mut self) -> Result<u64> {
        let token = self.next();
        match token.kind {
            TokenKind::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => {
                Ok(n as u64)
            }
            TokenKind::Number(n) => Err(ParseError::InvalidType {
                message: format!("dimension {n} is not a whole number"),
                span: token.span,
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: "dimension".to_string(),
                found: other.describe(),
                span: token.span,
            }),
        }
    }

    // ----- statements -----

    fn parse_statement(&mut self) -> Result<Statement> {
        match (self.peek(), self.peek_at(1)) {
            (TokenKind::Ident(word), _) if word == COHERENCE_BLOCK => {
                self.parse_block().map(Statement::Block)
            }
            (TokenKind::Ident(_), TokenKind::Eq) => {
                let (target, start) = self.expect_ident("assignment target")?;
                self.expect(TokenKind::Eq)?;
                let call = self.parse_call()?;
                let end = self.expect(TokenKind::Semi)?;
                Ok(Statement::Assignment(Assignment {
                    target,
                    call,
                    span: join(start, end),
                }))
            }
            (TokenKind::Ident(_), TokenKind::LParen) => {
                let call = self.parse_call()?;
                self.expect(TokenKind::Semi)?;
                Ok(Statement::Call(call))
            }
            (other, _) => Err(ParseError::UnexpectedToken {
                expected: "declaration or statement".to_string(),
                found: other.describe(),
                span: self.current_span(),
            }),
        }
    }

    fn parse_block(&mut self) -> Result<Block> {
        let (label, start) = self.expect_ident(COHERENCE_BLOCK)?;
        let parameters = if self.eat(&TokenKind::LParen).is_some() {
            let (arguments, _) = self.parse_arguments()?;
            arguments
        } else {
            Vec::new()
        };
        self.expect(TokenKind::LBrace)?;

        self.depth += 1;
        let statements = self.parse_block_body();
        self.depth -= 1;
        let end = self.expect(TokenKind::RBrace)?;

        Ok(Block {
            label,
            parameters,
            statements,
            span: join(start, end),
        })
    }

    fn parse_block_body(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
            if self.at_declaration() {
                let span = self.current_span();
                let name = match self.peek_at(1) {
                    TokenKind::Ident(name) => name.clone(),
                    _ => String::new(),
                };
                self.recover(ParseError::LateDeclaration { name, span });
                continue;
            }
            if self.depth >= MAX_BLOCK_DEPTH
                && matches!(self.peek(), TokenKind::Ident(word) if word == COHERENCE_BLOCK)
            {
                self.errors.push(ParseError::NestingTooDeep {
                    limit: MAX_BLOCK_DEPTH,
                    span: self.current_span(),
                });
                self.skip_block();
                continue;
            }
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => self.recover(err),
            }
        }
        statements
    }

    /// Skip a block and everything nested in it, up to its closing '}'
    fn skip_block(&mut self) {
        let mut open = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::LBrace => open += 1,
                TokenKind::RBrace => {
                    self.pos += 1;
                    open = open.saturating_sub(1);
                    if open == 0 {
                        break;
                    }
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn parse_call(&mut self) -> Result<OperationCall> {
        let (operation, start) = self.expect_ident("operation name")?;
        self.expect(TokenKind::LParen)?;
        let (arguments, end) = self.parse_arguments()?;
        Ok(OperationCall {
            operation,
            arguments,
            span: join(start, end),
        })
    }

    /// Arguments after `(` up to and including `)`; returns the `)` span
    fn parse_arguments(&mut self) -> Result<(Vec<Argument>, Span)> {
        let mut arguments = Vec::new();
        loop {
            if let Some(end) = self.eat(&TokenKind::RParen) {
                return Ok((arguments, end));
            }
            arguments.push(self.parse_argument()?);
            if self.eat(&TokenKind::Comma).is_none() {
                let end = self.expect(TokenKind::RParen)?;
                return Ok((arguments, end));
            }
        }
    }

    fn parse_argument(&mut self) -> Result<Argument> {
        if let (TokenKind::Ident(_), TokenKind::Colon) = (self.peek(), self.peek_at(1)) {
            let (name, start) = self.expect_ident("parameter name")?;
            self.expect(TokenKind::Colon)?;
            let (value, end) = self.parse_value()?;
            return Ok(Argument::named(name, value).with_span(join(start, end)));
        }
        let (value, span) = self.parse_value()?;
        Ok(Argument {
            name: None,
            value,
            span,
        })
    }

    fn parse_value(&mut self) -> Result<(ArgumentValue, Span)> {
        let token = self.next();
        match token.kind {
            TokenKind::Number(n) => Ok((ArgumentValue::Literal(Literal::Number(n)), token.span)),
            TokenKind::Str(s) => Ok((ArgumentValue::Literal(Literal::Text(s)), token.span)),
            TokenKind::Ident(name) => Ok((ArgumentValue::Identifier(name), token.span)),
            TokenKind::Minus => {
                let number = self.next();
                match number.kind {
                    TokenKind::Number(n) => Ok((
                        ArgumentValue::Literal(Literal::Number(-n)),
                        join(token.span, number.span),
                    )),
                    other => Err(ParseError::UnexpectedToken {
                        expected: "number after '-'".to_string(),
                        found: other.describe(),
                        span: number.span,
                    }),
                }
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "argument value".to_string(),
                found: other.describe(),
                span: token.span,
            }),
        }
    }

    // ----- token helpers -----

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        let index = (self.pos + ahead).min(self.tokens.len().saturating_sub(1));
        self.tokens
            .get(index)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    /// Consume and return the current token; stays on `Eof`
    fn next(&mut self) -> Token {
        let token = Token::new(self.peek().clone(), self.current_span());
        if !self.at_eof() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> Option<Span> {
        if self.peek() == kind {
            Some(self.next().span)
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Span> {
        self.eat(&kind).ok_or_else(|| ParseError::UnexpectedToken {
            expected: format!("'{kind}'"),
            found: self.peek().describe(),
            span: self.current_span(),
        })
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span)> {
        if let TokenKind::Ident(name) = self.peek() {
            let name = name.clone();
            let span = self.next().span;
            Ok((name, span))
        } else {
            Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: self.peek().describe(),
                span: self.current_span(),
            })
        }
    }

    /// Record `err` and skip past the next `;`, stopping early at `}`
    fn recover(&mut self, err: ParseError) {
        log::debug!("Syntax error: {}", err);
        self.errors.push(err);
        loop {
            match self.peek() {
                TokenKind::Eof | TokenKind::RBrace => break,
                TokenKind::Semi => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
    }
}

/// Span covering `start` through `end`
fn join(start: Span, end: Span) -> Span {
    let stop = (end.offset + end.len).max(start.offset + start.len);
    Span::new(start.offset, stop - start.offset, start.line, start.column)
}
