//! Static (lexical and syntax) diagnostics.

use std::fmt;

use thiserror::Error;

use crate::token::{Token, TokenKind};

/// Line number (starting at one).
pub type Position = u32;

/// Where on its line a static error was detected.
#[derive(Debug, PartialEq, Clone)]
pub enum ErrorLocation {
    /// Only the line is known (scanner errors).
    Line,
    AtEnd,
    At(String),
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLocation::Line => Ok(()),
            ErrorLocation::AtEnd => write!(f, " at end"),
            ErrorLocation::At(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Error)]
pub enum StaticErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("expect '{expected}' {context}")]
    ExpectedToken {
        expected: TokenKind,
        context: &'static str,
    },
    #[error("expect {0} name")]
    ExpectedName(&'static str),
    #[error("expect expression")]
    ExpectedExpression,
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("can't have more than 255 parameters")]
    TooManyParameters,
    #[error("can't have more than 255 arguments")]
    TooManyArguments,
}

/// Lexical or syntax error.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("line {line}, error{location}: {kind}")]
pub struct StaticError {
    pub line: Position,
    pub location: ErrorLocation,
    pub kind: StaticErrorKind,
}

impl StaticError {
    pub fn at_line(line: Position, kind: StaticErrorKind) -> StaticError {
        StaticError {
            line,
            location: ErrorLocation::Line,
            kind,
        }
    }

    pub fn at_token(token: &Token, kind: StaticErrorKind) -> StaticError {
        let location = if token.is(TokenKind::Eof) {
            ErrorLocation::AtEnd
        } else {
            ErrorLocation::At(token.lexeme.name().to_owned())
        };
        StaticError {
            line: token.line,
            location,
            kind,
        }
    }
}

/// Accumulates static errors across scanning and parsing so that one pass reports all of them.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<StaticError>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn report(&mut self, error: StaticError) {
        log::debug!("static error: {}", error);
        self.errors.push(error);
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[StaticError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<StaticError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Context;

    #[test]
    fn scanner_errors_only_carry_line() {
        let e = StaticError::at_line(3, StaticErrorKind::UnexpectedChar('@'));
        assert_eq!(e.to_string(), "line 3, error: unexpected character '@'");
    }

    #[test]
    fn parser_errors_name_the_lexeme() {
        let ctx = Context::new();
        let token = Token::new(TokenKind::Identifier, ctx.symbol("foo"), None, 7);
        let e = StaticError::at_token(
            &token,
            StaticErrorKind::ExpectedToken {
                expected: TokenKind::Semicolon,
                context: "after expression",
            },
        );
        assert_eq!(
            e.to_string(),
            "line 7, error at 'foo': expect ';' after expression"
        );
    }

    #[test]
    fn errors_at_eof_say_at_end() {
        let ctx = Context::new();
        let token = Token::new(TokenKind::Eof, ctx.symbol(""), None, 2);
        let e = StaticError::at_token(&token, StaticErrorKind::ExpectedExpression);
        assert_eq!(e.to_string(), "line 2, error at end: expect expression");
    }

    #[test]
    fn diagnostics_raise_error_flag() {
        let mut diags = Diagnostics::new();
        assert!(!diags.had_error());
        diags.report(StaticError::at_line(1, StaticErrorKind::UnterminatedString));
        assert!(diags.had_error());
        assert_eq!(diags.errors().len(), 1);
    }
}
