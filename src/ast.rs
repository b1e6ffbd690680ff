//! Syntax tree produced by the parser and walked by the evaluator.
//!
//! Trees are built once and never mutated.  The only sharing is `Stmt::Function`, whose
//! declaration is reference-counted so that function values can outlive the statement list
//! they were declared in.

use std::rc::Rc;

use crate::token::{Literal, Token};

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Expression(Expr),
    /// Name and optional initializer.  No initializer binds nil.
    Var(Token, Option<Expr>),
    Block(Vec<Stmt>),
    /// Condition, then branch, optional else branch.
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    Function(Rc<FunctionDecl>),
    /// `return` keyword and optional value.
    Return(Token, Option<Expr>),
}

#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Literal(Literal),
    Grouping(Box<Expr>),
    /// Operator and operand.
    Unary(Token, Box<Expr>),
    Binary(Box<Expr>, Token, Box<Expr>),
    /// Short-circuiting `and` / `or`.
    Logical(Box<Expr>, Token, Box<Expr>),
    Variable(Token),
    Assign(Token, Box<Expr>),
    /// Callee, closing parenthesis (for error reporting) and arguments.
    Call(Box<Expr>, Token, Vec<Expr>),
}
