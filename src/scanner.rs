//! Lexical analyzer

use std::rc::Rc;

use crate::ctx::Context;
use crate::diag::{Diagnostics, Position, StaticError, StaticErrorKind};
use crate::interner::Symbol;
use crate::token::{Literal, Token, TokenKind};

/// Scans `source` to completion.
///
/// Lexical errors are reported to `diags` and scanning carries on past them, so the returned
/// sequence holds every valid token and always ends with exactly one `Eof` token.
pub fn scan(source: &str, ctx: Rc<Context>, diags: &mut Diagnostics) -> Vec<Token> {
    let mut scanner = Scanner::new(source, ctx);
    let mut tokens = vec![];
    loop {
        match scanner.get_token() {
            Ok(token) => {
                let at_end = token.is(TokenKind::Eof);
                tokens.push(token);
                if at_end {
                    break;
                }
            }
            Err(e) => diags.report(e),
        }
    }
    log::debug!("scanned {} tokens", tokens.len());
    tokens
}

/// Turns source text into tokens, one at a time.
#[derive(Debug)]
pub struct Scanner<'s> {
    source: &'s str,
    // Byte offsets into `source`.
    start: usize,
    current: usize,
    line: Position,
    ctx: Rc<Context>,
}

impl<'s> Scanner<'s> {
    /// Creates a new scanner operating on `source`.
    pub fn new(source: &'s str, ctx: Rc<Context>) -> Scanner<'s> {
        Scanner {
            source,
            start: 0,
            current: 0,
            line: 1,
            ctx,
        }
    }

    /// Scans the next token.  Returns `Eof` forever once the input is exhausted.
    pub fn get_token(&mut self) -> Result<Token, StaticError> {
        loop {
            self.start = self.current;
            let ch = match self.advance() {
                None => return Ok(self.make_token(TokenKind::Eof, None)),
                Some(ch) => ch,
            };
            let kind = match ch {
                '\n' => {
                    self.line += 1;
                    continue;
                }
                ' ' | '\t' | '\r' => continue,
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                '{' => TokenKind::LeftBrace,
                '}' => TokenKind::RightBrace,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '-' => TokenKind::Minus,
                '+' => TokenKind::Plus,
                ';' => TokenKind::Semicolon,
                '*' => TokenKind::Star,
                '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
                '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
                '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
                '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
                '/' => {
                    if self.peek() == Some('/') {
                        self.skip_comment();
                        continue;
                    }
                    TokenKind::Slash
                }
                '"' => return self.scan_string(),
                '0'..='9' => return Ok(self.scan_number()),
                'a'..='z' | 'A'..='Z' | '_' => return Ok(self.scan_identifier()),
                _ => {
                    return Err(StaticError::at_line(
                        self.line,
                        StaticErrorKind::UnexpectedChar(ch),
                    ))
                }
            };
            return Ok(self.make_token(kind, None));
        }
    }

    fn scan_string(&mut self) -> Result<Token, StaticError> {
        while let Some(ch) = self.peek() {
            if ch == '"' {
                break;
            }
            if ch == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.advance().is_none() {
            return Err(StaticError::at_line(
                self.line,
                StaticErrorKind::UnterminatedString,
            ));
        }

        let value = &self.source[self.start + 1..self.current - 1];
        Ok(self.make_token(TokenKind::String, Some(Literal::Str(value.to_owned()))))
    }

    fn scan_number(&mut self) -> Token {
        self.skip_digits();
        if self.peek() == Some('.') && self.peek_next().map_or(false, |ch| ch.is_ascii_digit()) {
            self.advance();
            self.skip_digits();
        }

        // Only digits and one inner dot were consumed, which always parses.
        let n = self.lexeme().parse::<f64>().unwrap_or_default();
        self.make_token(TokenKind::Number, Some(Literal::Number(n)))
    }

    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .map_or(false, |ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            self.advance();
        }

        let sym = self.ctx.symbol(self.lexeme());
        let kind = self.ctx.keyword(&sym).unwrap_or(TokenKind::Identifier);
        Token::new(kind, sym, None, self.line)
    }

    fn skip_digits(&mut self) {
        while self.peek().map_or(false, |ch| ch.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().map_or(false, |ch| ch != '\n') {
            self.advance();
        }
    }

    fn either(&mut self, second: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(second) {
            self.advance();
            matched
        } else {
            single
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.current += ch.len_utf8();
        Some(ch)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.source[self.current..].chars().nth(1)
    }

    fn lexeme(&self) -> &'s str {
        &self.source[self.start..self.current]
    }

    fn make_token(&self, kind: TokenKind, literal: Option<Literal>) -> Token {
        let lexeme = match kind {
            // Literal text never names a binding; interning it would grow the session forever.
            TokenKind::String | TokenKind::Number => Symbol::detached(self.lexeme()),
            _ => self.ctx.symbol(self.lexeme()),
        };
        Token::new(kind, lexeme, literal, self.line)
    }
}
