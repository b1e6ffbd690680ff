//! Recursive-descent parser.
//!
//! Precedence, lowest first: assignment, `or`, `and`, equality, comparison, term, factor, unary,
//! call, primary.  Binary levels fold to the left; assignment nests to the right.

use std::rc::Rc;

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::diag::{Diagnostics, StaticError, StaticErrorKind};
use crate::token::{Literal, Token, TokenKind};

/// Soft limit on parameters and call arguments.  Exceeding it is reported but does not stop
/// the parse.
pub const MAX_ARGS: usize = 255;

type ParseResult<T> = Result<T, StaticError>;

/// Parses a complete token sequence (as produced by `scan`) into declarations.
///
/// Syntax errors go to `diags`; the parser resynchronizes at the next statement boundary and
/// keeps going, so the returned list holds every declaration that parsed cleanly.
pub fn parse(tokens: &[Token], diags: &mut Diagnostics) -> Vec<Stmt> {
    if tokens.is_empty() {
        return vec![];
    }
    Parser::new(tokens, diags).parse_program()
}

#[derive(Debug)]
pub struct Parser<'t, 'd> {
    tokens: &'t [Token],
    current: usize,
    diags: &'d mut Diagnostics,
}

impl<'t, 'd> Parser<'t, 'd> {
    /// `tokens` must not be empty and should end with an `Eof` token.
    pub fn new(tokens: &'t [Token], diags: &'d mut Diagnostics) -> Parser<'t, 'd> {
        Parser {
            tokens,
            current: 0,
            diags,
        }
    }

    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut prg = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                prg.push(stmt);
            }
        }
        log::debug!(
            "parsed {} top-level statements, {} errors so far",
            prg.len(),
            self.diags.errors().len()
        );
        prg
    }

    /// Parses one declaration, recovering from a syntax error by skipping to the next statement
    /// boundary.
    fn declaration(&mut self) -> Option<Stmt> {
        let res = if self.matches(&[TokenKind::Fun]) {
            self.fun_decl()
        } else if self.matches(&[TokenKind::Var]) {
            self.var_decl()
        } else {
            self.statement()
        };
        match res {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                self.diags.report(e);
                self.synchronize();
                None
            }
        }
    }

    /// Parses a function declaration.
    /// Previous token is `fun`.
    fn fun_decl(&mut self) -> ParseResult<Stmt> {
        let name = self.consume_name("function")?;
        self.consume(TokenKind::LeftParen, "after function name")?;
        let mut params = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.error_at_current(StaticErrorKind::TooManyParameters);
                }
                params.push(self.consume_name("parameter")?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "after parameters")?;
        self.consume(TokenKind::LeftBrace, "before function body")?;
        let body = self.block()?;
        Ok(Stmt::Function(Rc::new(FunctionDecl { name, params, body })))
    }

    /// Parses a variable declaration.
    /// Previous token is `var`.
    fn var_decl(&mut self) -> ParseResult<Stmt> {
        let name = self.consume_name("variable")?;
        let init = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "after variable declaration")?;
        Ok(Stmt::Var(name, init))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.matches(&[TokenKind::For]) {
            return self.for_stmt();
        }
        if self.matches(&[TokenKind::If]) {
            return self.if_stmt();
        }
        if self.matches(&[TokenKind::Return]) {
            return self.return_stmt();
        }
        if self.matches(&[TokenKind::While]) {
            return self.while_stmt();
        }
        if self.matches(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expr_stmt()
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "after 'for'")?;
        let init = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var]) {
            Some(self.var_decl()?)
        } else {
            Some(self.expr_stmt()?)
        };

        let cond = if self.check(TokenKind::Semicolon) {
            Expr::Literal(Literal::Bool(true))
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "after loop condition")?;

        let incr = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "after for clauses")?;

        let mut body = self.statement()?;
        if let Some(incr) = incr {
            body = Stmt::Block(vec![body, Stmt::Expression(incr)]);
        }
        let mut lowered = Stmt::While(cond, Box::new(body));
        if let Some(init) = init {
            lowered = Stmt::Block(vec![init, lowered]);
        }
        Ok(lowered)
    }

    fn if_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "after 'if'")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RightParen, "after if condition")?;
        let then_branch = Box::new(self.statement()?);
        // A dangling else binds to the innermost if.
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(cond, then_branch, else_branch))
    }

    fn return_stmt(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "after return value")?;
        Ok(Stmt::Return(keyword, value))
    }

    fn while_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "after 'while'")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RightParen, "after condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(cond, body))
    }

    /// Parses the declarations of a block.
    /// Previous token is `{`.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "after block")?;
        Ok(stmts)
    }

    fn expr_stmt(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "after expression")?;
        Ok(Stmt::Expression(expr))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let lhs = self.or()?;
        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let rhs = self.assignment()?;
            if let Expr::Variable(name) = lhs {
                return Ok(Expr::Assign(name, Box::new(rhs)));
            }
            // Not fatal: the left-hand side is still a well-formed expression.
            self.diags.report(StaticError::at_token(
                &equals,
                StaticErrorKind::InvalidAssignmentTarget,
            ));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.matches(&[TokenKind::Or]) {
            let op = self.previous().clone();
            expr = Expr::Logical(Box::new(expr), op, Box::new(self.and()?));
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            let op = self.previous().clone();
            expr = Expr::Logical(Box::new(expr), op, Box::new(self.equality()?));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while self.matches(&[TokenKind::EqualEqual, TokenKind::BangEqual]) {
            let op = self.previous().clone();
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.comparison()?));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.term()?));
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while self.matches(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = self.previous().clone();
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.factor()?));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while self.matches(&[TokenKind::Star, TokenKind::Slash]) {
            let op = self.previous().clone();
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.unary()?));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            return Ok(Expr::Unary(op, Box::new(self.unary()?)));
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        while self.matches(&[TokenKind::LeftParen]) {
            let mut args = vec![];
            if !self.check(TokenKind::RightParen) {
                loop {
                    if args.len() >= MAX_ARGS {
                        self.error_at_current(StaticErrorKind::TooManyArguments);
                    }
                    args.push(self.expression()?);
                    if !self.matches(&[TokenKind::Comma]) {
                        break;
                    }
                }
            }
            let paren = self.consume(TokenKind::RightParen, "after arguments")?;
            expr = Expr::Call(Box::new(expr), paren, args);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek();
        let expr = match token.kind {
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::Nil => Expr::Literal(Literal::Nil),
            TokenKind::Number | TokenKind::String => {
                Expr::Literal(token.literal.clone().unwrap_or(Literal::Nil))
            }
            TokenKind::Identifier => Expr::Variable(token.clone()),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "after expression")?;
                return Ok(Expr::Grouping(Box::new(inner)));
            }
            _ => {
                return Err(StaticError::at_token(
                    token,
                    StaticErrorKind::ExpectedExpression,
                ))
            }
        };
        self.advance();
        Ok(expr)
    }

    /// Discards tokens until something that looks like the start of the next statement.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().is(TokenKind::Semicolon) || self.peek().kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    fn error_at_current(&mut self, kind: StaticErrorKind) {
        let e = StaticError::at_token(self.peek(), kind);
        self.diags.report(e);
    }

    fn consume(&mut self, expected: TokenKind, context: &'static str) -> ParseResult<Token> {
        if self.check(expected) {
            return Ok(self.advance().clone());
        }
        Err(StaticError::at_token(
            self.peek(),
            StaticErrorKind::ExpectedToken { expected, context },
        ))
    }

    fn consume_name(&mut self, what: &'static str) -> ParseResult<Token> {
        if self.check(TokenKind::Identifier) {
            return Ok(self.advance().clone());
        }
        Err(StaticError::at_token(
            self.peek(),
            StaticErrorKind::ExpectedName(what),
        ))
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|&kind| self.check(kind)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().is(kind)
    }

    fn advance(&mut self) -> &'t Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.peek().is(TokenKind::Eof)
    }

    fn peek(&self) -> &'t Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &'t Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
}
