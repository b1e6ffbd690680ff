//! A tree-walking interpreter for a small Lox-like scripting language.
//!
//! Source text goes through a scanner, a recursive-descent parser and an evaluator walking the
//! resulting syntax tree.  Scripts have numbers, strings, booleans, nil, lexically scoped
//! variables, control flow and first-class functions with closures.  Host facilities such as
//! printing and reading input are exposed as native functions.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Limitations
//!
//! - `class`, `this` and `super` are reserved but not implemented.
//! - Closures referencing the scope that holds them form reference cycles and are never freed.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod interpreter;

pub mod ast;
pub mod callable;
pub mod ctx;
pub mod diag;
pub mod env;
pub mod eval;
pub mod interner;
pub mod native;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;

pub use crate::ast::{Expr, FunctionDecl, Stmt};
pub use crate::callable::{Callable, NativeFn};
pub use crate::ctx::Context;
pub use crate::diag::{Diagnostics, ErrorLocation, Position, StaticError, StaticErrorKind};
pub use crate::eval::{Evaluator, Flow, RuntimeError, RuntimeErrorKind};
pub use crate::interpreter::{Interpreter, InterpreterError};
pub use crate::parser::parse;
pub use crate::scanner::scan;
pub use crate::token::{Literal, Token, TokenKind};
pub use crate::value::Value;
