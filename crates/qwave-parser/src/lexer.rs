//! Lexer
//!
//! Hand-written byte scanner producing [`Token`]s. Numbers are plain
//! decimals with an optional exponent (`3`, `0.25`, `1e-3`, `2.5E+4`); a
//! leading minus is a separate token. Strings are double-quoted with `\"`
//! and `\\` escapes. `//` starts a line comment.

use crate::error::{ParseError, Result};
use crate::token::{Token, TokenKind};
use qwave_core::Span;

pub struct Lexer<'src> {
    src: &'src str,
    bytes: &'src [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire source; the last token is always `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        log::trace!("Lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let start = (self.pos, self.line, self.col);
        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, self.span_from(start)));
        };

        if ch == '"' {
            return self.lex_string(start);
        }
        if ch.is_ascii_digit() {
            return self.lex_number(start);
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                self.advance();
            }
            let name = &self.src[start.0..self.pos];
            return Ok(Token::new(
                TokenKind::Ident(name.to_string()),
                self.span_from(start),
            ));
        }

        let kind = match ch {
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semi,
            ',' => TokenKind::Comma,
            '=' => TokenKind::Eq,
            '-' => TokenKind::Minus,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            _ => {
                return Err(ParseError::UnexpectedCharacter {
                    ch,
                    span: Span::new(start.0, ch.len_utf8(), start.1, start.2),
                })
            }
        };
        self.advance();
        Ok(Token::new(kind, self.span_from(start)))
    }

    // ----- helpers -----

    fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn span_from(&self, start: (usize, usize, usize)) -> Span {
        Span::new(start.0, self.pos - start.0, start.1, start.2)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek_byte(0), Some(b) if b.is_ascii_whitespace()) {
                self.advance();
            }
            if self.peek_byte(0) == Some(b'/') && self.peek_byte(1) == Some(b'/') {
                while matches!(self.peek_byte(0), Some(b) if b != b'\n') {
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn lex_string(&mut self, start: (usize, usize, usize)) -> Result<Token> {
        self.advance();
        let mut value = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(ParseError::UnterminatedString {
                    span: self.span_from(start),
                });
            };
            match ch {
                '"' => {
                    self.advance();
                    break;
                }
                '\n' => {
                    return Err(ParseError::UnterminatedString {
                        span: self.span_from(start),
                    })
                }
                '\\' if matches!(self.peek_byte(1), Some(b'"' | b'\\')) => {
                    self.advance();
                    value.push(self.bytes[self.pos] as char);
                    self.advance();
                }
                _ => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::Str(value), self.span_from(start)))
    }

    fn lex_number(&mut self, start: (usize, usize, usize)) -> Result<Token> {
        self.eat_digits();
        if self.peek_byte(0) == Some(b'.') && matches!(self.peek_byte(1), Some(b) if b.is_ascii_digit()) {
            self.advance();
            self.eat_digits();
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            self.advance();
            if matches!(self.peek_byte(0), Some(b'+' | b'-')) {
                self.advance();
            }
            if !matches!(self.peek_byte(0), Some(b) if b.is_ascii_digit()) {
                return Err(ParseError::InvalidNumber {
                    text: self.src[start.0..self.pos].to_string(),
                    span: self.span_from(start),
                });
            }
            self.eat_digits();
        }
        // `12abc` is one malformed literal, not a number followed by a name
        if matches!(self.peek_byte(0), Some(b) if b.is_ascii_alphabetic() || b == b'_') {
            while matches!(self.peek_byte(0), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
                self.advance();
            }
            return Err(ParseError::InvalidNumber {
                text: self.src[start.0..self.pos].to_string(),
                span: self.span_from(start),
            });
        }

        let text = &self.src[start.0..self.pos];
        let value: f64 = text.parse().map_err(|_| ParseError::InvalidNumber {
            text: text.to_string(),
            span: self.span_from(start),
        })?;
        if !value.is_finite() {
            return Err(ParseError::InvalidNumber {
                text: text.to_string(),
                span: self.span_from(start),
            });
        }
        Ok(Token::new(TokenKind::Number(value), self.span_from(start)))
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek_byte(0), Some(b) if b.is_ascii_digit()) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_declaration_tokens() {
        assert_eq!(
            kinds("input a: wave[8];"),
            vec![
                TokenKind::Ident("input".into()),
                TokenKind::Ident("a".into()),
                TokenKind::Colon,
                TokenKind::Ident("wave".into()),
                TokenKind::LBracket,
                TokenKind::Number(8.0),
                TokenKind::RBracket,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("0.25")[0], TokenKind::Number(0.25));
        assert_eq!(kinds("1e-3")[0], TokenKind::Number(0.001));
        assert_eq!(kinds("2.5E+4")[0], TokenKind::Number(25000.0));
        assert_eq!(
            kinds("-3"),
            vec![TokenKind::Minus, TokenKind::Number(3.0), TokenKind::Eof]
        );
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(matches!(
            Lexer::new("1e").tokenize(),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            Lexer::new("12abc").tokenize(),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_strings_and_comments() {
        assert_eq!(
            kinds("// header\ncode: \"surface\" // trailing"),
            vec![
                TokenKind::Ident("code".into()),
                TokenKind::Colon,
                TokenKind::Str("surface".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds(r#""a\"b""#)[0], TokenKind::Str("a\"b".into()));
        assert!(matches!(
            Lexer::new("\"open").tokenize(),
            Err(ParseError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
        assert_eq!(tokens[1].span.offset, 4);
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("a + b").tokenize().unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedCharacter {
                ch: '+',
                span: Span::new(2, 1, 1, 3)
            }
        );
    }
}
