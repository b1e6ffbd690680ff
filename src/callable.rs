use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::env::Env;
use crate::eval::{Evaluator, Flow, RuntimeError, RuntimeErrorKind};
use crate::token::Token;
use crate::value::Value;

/// Host-provided operation backing a native function.  Arity has been checked by the caller.
pub type NativeFn = fn(&mut Evaluator<'_>, &[Value]) -> Result<Value, RuntimeErrorKind>;

/// Anything invocable from script code.
pub enum Callable {
    Native {
        name: &'static str,
        arity: usize,
        op: NativeFn,
    },
    User {
        decl: Rc<FunctionDecl>,
        /// Scope active where the function was declared.
        closure: Rc<Env>,
    },
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Native { name, .. } => name,
            Callable::User { decl, .. } => decl.name.lexeme.name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Callable::Native { arity, .. } => *arity,
            Callable::User { decl, .. } => decl.params.len(),
        }
    }

    /// Invokes the callable.  `args.len()` must equal `self.arity()`.
    ///
    /// `paren` is the call site's closing parenthesis; native failures are attributed to it.
    pub fn call(
        &self,
        evaluator: &mut Evaluator<'_>,
        paren: &Token,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match self {
            Callable::Native { op, .. } => {
                op(evaluator, &args).map_err(|kind| RuntimeError::new(paren.clone(), kind))
            }
            Callable::User { decl, closure } => {
                // Parameters live in a fresh scope nested in the closure, not in the caller's.
                let env = Env::with_enclosing(closure.clone());
                for (param, arg) in decl.params.iter().zip(args) {
                    env.define(param.lexeme.clone(), arg);
                }
                match evaluator.execute_block(&decl.body, env)? {
                    Flow::Return(v) => Ok(v),
                    Flow::Normal => Ok(Value::Nil),
                }
            }
        }
    }
}

// Not derived: the closure may hold this very function, which would recurse forever.
impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("native", &matches!(self, Callable::Native { .. }))
            .finish()
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native { name, .. } => write!(f, "<native fn {}>", name),
            Callable::User { decl, .. } => write!(f, "<fn {}>", decl.name.lexeme),
        }
    }
}
